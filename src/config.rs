use crate::error::Result;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// URL template for a Google Sheets CSV export. Must keep the `{sheet_id}`
/// and `{gid}` placeholders.
const GOOGLE_URL: &str =
    "https://docs.google.com/spreadsheets/d/{sheet_id}/export?format=csv&gid={gid}";

const DEFAULT_SHEET_ID: &str = "1hGPX_s_fUbEmjDtBbrWrlgwDFMC_Ek-63s1JCHnaIvA";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub url_template: String,
    pub sheet_id: String,
    pub papers_gid: String,
    pub affiliations_gid: String,
    pub authors_gid: String,
    /// Second author tab merged into the master list. `null` disables it.
    pub extra_authors_gid: Option<String>,
    pub acknowledgements_gid: String,
    pub allowed_styles: Vec<String>,
    /// Output filename template; `{key}` is replaced by the paper key.
    pub output_template: String,
    pub thresholds: Thresholds,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Thresholds {
    /// A uniquely best score at or above this auto-matches.
    pub high_confidence: f64,
    /// Anything scoring below this is treated as no match.
    pub min_score: f64,
    /// Runner-up within this margin of the best makes the match ambiguous.
    pub ambiguity_margin: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            url_template: GOOGLE_URL.to_string(),
            sheet_id: DEFAULT_SHEET_ID.to_string(),
            papers_gid: "0".to_string(),
            affiliations_gid: "1318892288".to_string(),
            authors_gid: "831615847".to_string(),
            extra_authors_gid: Some("223170284".to_string()),
            acknowledgements_gid: "671986807".to_string(),
            allowed_styles: vec!["AJ".to_string(), "AANDA".to_string()],
            output_template: "{key}_coauthors.tex".to_string(),
            thresholds: Thresholds::default(),
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            high_confidence: 0.85,
            min_score: 0.60,
            ambiguity_margin: 0.05,
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Config> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn sheet_url(&self, gid: &str) -> String {
        self.url_template
            .replace("{sheet_id}", &self.sheet_id)
            .replace("{gid}", gid)
    }

    pub fn output_path(&self, paper_key: &str) -> PathBuf {
        PathBuf::from(self.output_template.replace("{key}", paper_key))
    }
}

/// Where sheet data comes from: the remote spreadsheet, or a directory of
/// CSV files named after the tabs (papers.csv, affiliations.csv, ...).
#[derive(Debug, Clone)]
pub enum SheetSource {
    Remote,
    LocalDir(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_builds_export_urls() {
        let config = Config::default();
        let url = config.sheet_url("42");
        assert!(url.starts_with("https://docs.google.com/spreadsheets/d/"));
        assert!(url.contains(&config.sheet_id));
        assert!(url.ends_with("gid=42"));
    }

    #[test]
    fn output_path_substitutes_paper_key() {
        let config = Config::default();
        assert_eq!(
            config.output_path("NIRPS-2024"),
            PathBuf::from("NIRPS-2024_coauthors.tex")
        );
    }

    #[test]
    fn partial_config_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"sheet_id": "abc123", "thresholds": {{"min_score": 0.7}}}}"#
        )
        .unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.sheet_id, "abc123");
        assert_eq!(config.thresholds.min_score, 0.7);
        assert_eq!(config.thresholds.high_confidence, 0.85);
        assert_eq!(config.papers_gid, "0");
    }

    #[test]
    fn unknown_config_key_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"sheetid": "typo"}}"#).unwrap();
        assert!(Config::from_file(file.path()).is_err());
    }
}
