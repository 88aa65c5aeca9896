use crate::config::{Config, SheetSource};
use crate::error::{AppError, Result};
use csv::ReaderBuilder;
use log::{info, warn};

/// One spreadsheet tab as a plain text grid with a header row.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn from_csv(name: &str, raw: &str) -> Result<Sheet> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(raw.as_bytes());
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let mut rows = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            if record.len() != headers.len() {
                warn!(
                    "{}: skipping row {} with {} fields (expected {})",
                    name,
                    i + 2,
                    record.len(),
                    headers.len()
                );
                continue;
            }
            let cells: Vec<String> = record.iter().map(clean_cell).collect();
            // A blank or '0' first cell marks sheet padding, not data.
            match cells.first().map(String::as_str) {
                None | Some("") | Some("0") => continue,
                _ => {}
            }
            rows.push(cells);
        }
        let mut sheet = Sheet {
            name: name.to_string(),
            headers,
            rows,
        };
        sheet.drop_comment_columns();
        sheet.sanitize_orcid();
        Ok(sheet)
    }

    /// Index of a required column, as a clear error when absent.
    pub fn column(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| AppError::MissingColumn {
                table: self.name.clone(),
                column: name.to_string(),
            })
    }

    /// The tab must carry exactly the given columns, in any order.
    pub fn check_columns(&self, required: &[&str]) -> Result<()> {
        for column in required {
            self.column(column)?;
        }
        for header in &self.headers {
            if !required.contains(&header.as_str()) {
                return Err(AppError::UnexpectedColumn {
                    table: self.name.clone(),
                    column: header.clone(),
                });
            }
        }
        Ok(())
    }

    fn drop_comment_columns(&mut self) {
        let keep: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !h.to_uppercase().contains("COMMENT"))
            .map(|(i, _)| i)
            .collect();
        if keep.len() == self.headers.len() {
            return;
        }
        self.headers = keep.iter().map(|&i| self.headers[i].clone()).collect();
        for row in &mut self.rows {
            *row = keep.iter().map(|&i| row[i].clone()).collect();
        }
    }

    /// ORCIDs shorter than the canonical 16 characters are noise.
    fn sanitize_orcid(&mut self) {
        if let Some(idx) = self.headers.iter().position(|h| h == "ORCID") {
            for row in &mut self.rows {
                if row[idx].len() < 16 {
                    row[idx].clear();
                }
            }
        }
    }
}

fn clean_cell(cell: &str) -> String {
    cell.trim().trim_matches(',').trim().to_string()
}

/// Fetches one tab. A fetch failure is fatal for the run.
pub fn fetch_sheet(config: &Config, source: &SheetSource, name: &str, gid: &str) -> Result<Sheet> {
    let raw = match source {
        SheetSource::Remote => {
            let url = config.sheet_url(gid);
            info!("Fetching sheet '{}'", name);
            let response = reqwest::blocking::get(&url).map_err(|e| AppError::Fetch {
                name: name.to_string(),
                source: e,
            })?;
            if !response.status().is_success() {
                return Err(AppError::FetchStatus {
                    name: name.to_string(),
                    status: response.status(),
                });
            }
            response.text().map_err(|e| AppError::Fetch {
                name: name.to_string(),
                source: e,
            })?
        }
        SheetSource::LocalDir(dir) => {
            let path = dir.join(format!("{}.csv", name));
            if !path.is_file() {
                return Err(AppError::SheetFileNotFound(path));
            }
            info!("Reading sheet '{}' from {}", name, path.display());
            std::fs::read_to_string(&path)?
        }
    };
    Sheet::from_csv(name, &raw)
}

/// Like `fetch_sheet`, but a missing file in a local directory means the tab
/// simply is not provided.
pub fn fetch_optional_sheet(
    config: &Config,
    source: &SheetSource,
    name: &str,
    gid: &str,
) -> Result<Option<Sheet>> {
    if let SheetSource::LocalDir(dir) = source {
        if !dir.join(format!("{}.csv", name)).is_file() {
            return Ok(None);
        }
    }
    fetch_sheet(config, source, name, gid).map(Some)
}
