use crate::config::{Config, SheetSource};
use crate::error::{AppError, Result};
use crate::normalize::normalize;
use crate::sheet::{self, Sheet};
use log::warn;
use std::collections::HashSet;

pub const PAPER_COLUMNS: [&str; 4] = ["paper key", "STYLE", "ACKNOWLEDGEMENTS", "author list"];
pub const AFFILIATION_COLUMNS: [&str; 2] = ["SHORTNAME", "AFFILIATION"];
pub const AUTHOR_COLUMNS: [&str; 8] = [
    "AUTHOR",
    "Last Name",
    "First Name",
    "ORCID",
    "EMAIL",
    "SHORTNAME",
    "AFFILIATIONS",
    "ACKNOWLEDGEMENTS",
];
pub const ACKNOWLEDGEMENT_COLUMNS: [&str; 2] = ["ACKNOWLEDGEMENTS", "ACKNOWLEDGEMENTS_TEXT"];

#[derive(Debug, Clone)]
pub struct Affiliation {
    pub short: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct Author {
    pub display: String,
    pub last: String,
    pub first: String,
    pub orcid: String,
    pub email: String,
    pub short: String,
    /// Affiliation short codes, order preserved from the sheet.
    pub affiliations: Vec<String>,
    pub acknowledgements: Vec<String>,
    /// Matching key derived from the display name.
    pub normalized: String,
}

impl Author {
    /// Placeholder record for a name typed in at the resolver prompt; carries
    /// no sheet data beyond a split of the display name.
    pub fn from_display_name(display: &str) -> Author {
        let (first, last) = match display.rsplit_once(' ') {
            Some((first, last)) => (first.to_string(), last.to_string()),
            None => (String::new(), display.to_string()),
        };
        Author {
            display: display.to_string(),
            last,
            first,
            orcid: String::new(),
            email: String::new(),
            short: String::new(),
            affiliations: Vec::new(),
            acknowledgements: Vec::new(),
            normalized: normalize(display),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Paper {
    pub key: String,
    pub style: String,
    pub acknowledgements: Vec<String>,
    /// Short names in author order; order is significant for the output.
    pub author_list: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Acknowledgement {
    pub key: String,
    pub text: String,
}

/// All sheet data for one run, fetched once and immutable afterwards.
#[derive(Debug, Clone)]
pub struct Registry {
    pub papers: Vec<Paper>,
    pub affiliations: Vec<Affiliation>,
    pub authors: Vec<Author>,
    pub acknowledgements: Vec<Acknowledgement>,
}

impl Registry {
    pub fn load(config: &Config, source: &SheetSource) -> Result<Registry> {
        let papers_sheet = sheet::fetch_sheet(config, source, "papers", &config.papers_gid)?;
        papers_sheet.check_columns(&PAPER_COLUMNS)?;
        let papers = papers_from_sheet(&papers_sheet)?;

        let affiliations_sheet =
            sheet::fetch_sheet(config, source, "affiliations", &config.affiliations_gid)?;
        affiliations_sheet.check_columns(&AFFILIATION_COLUMNS)?;
        let affiliations = affiliations_from_sheet(&affiliations_sheet)?;

        let authors_sheet = sheet::fetch_sheet(config, source, "authors", &config.authors_gid)?;
        authors_sheet.check_columns(&AUTHOR_COLUMNS)?;
        let mut authors = authors_from_sheet(&authors_sheet)?;

        if let Some(gid) = &config.extra_authors_gid {
            if let Some(extra_sheet) =
                sheet::fetch_optional_sheet(config, source, "extra_authors", gid)?
            {
                extra_sheet.check_columns(&AUTHOR_COLUMNS)?;
                authors.extend(authors_from_sheet(&extra_sheet)?);
            }
        }
        check_unique_shortnames(&authors)?;

        let acknowledgements_sheet = sheet::fetch_sheet(
            config,
            source,
            "acknowledgements",
            &config.acknowledgements_gid,
        )?;
        acknowledgements_sheet.check_columns(&ACKNOWLEDGEMENT_COLUMNS)?;
        let acknowledgements = acknowledgements_from_sheet(&acknowledgements_sheet)?;

        Ok(Registry {
            papers,
            affiliations,
            authors,
            acknowledgements,
        })
    }

    /// Loads only the merged author list, for the cross-matching command.
    pub fn load_authors(config: &Config, source: &SheetSource) -> Result<Vec<Author>> {
        let authors_sheet = sheet::fetch_sheet(config, source, "authors", &config.authors_gid)?;
        authors_sheet.check_columns(&AUTHOR_COLUMNS)?;
        let mut authors = authors_from_sheet(&authors_sheet)?;
        if let Some(gid) = &config.extra_authors_gid {
            if let Some(extra_sheet) =
                sheet::fetch_optional_sheet(config, source, "extra_authors", gid)?
            {
                extra_sheet.check_columns(&AUTHOR_COLUMNS)?;
                authors.extend(authors_from_sheet(&extra_sheet)?);
            }
        }
        check_unique_shortnames(&authors)?;
        Ok(authors)
    }

    pub fn paper(&self, key: &str) -> Result<&Paper> {
        self.papers
            .iter()
            .find(|p| p.key == key)
            .ok_or_else(|| AppError::PaperNotFound(key.to_string()))
    }

    pub fn acknowledgement(&self, key: &str) -> Result<&Acknowledgement> {
        self.acknowledgements
            .iter()
            .find(|a| a.key == key)
            .ok_or_else(|| AppError::UnknownAcknowledgement(key.to_string()))
    }
}

/// Comma-separated sheet cell into trimmed entries; empty entries and the
/// '0' placeholder mean "none".
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "0")
        .map(String::from)
        .collect()
}

fn papers_from_sheet(sheet: &Sheet) -> Result<Vec<Paper>> {
    let key = sheet.column("paper key")?;
    let style = sheet.column("STYLE")?;
    let acks = sheet.column("ACKNOWLEDGEMENTS")?;
    let authors = sheet.column("author list")?;
    let mut papers = Vec::new();
    for row in &sheet.rows {
        if row[key].is_empty() || row[style].is_empty() {
            warn!("papers: skipping row with empty key or style: {:?}", row);
            continue;
        }
        papers.push(Paper {
            key: row[key].clone(),
            style: row[style].clone(),
            acknowledgements: split_list(&row[acks]),
            author_list: split_list(&row[authors]),
        });
    }
    Ok(papers)
}

fn affiliations_from_sheet(sheet: &Sheet) -> Result<Vec<Affiliation>> {
    let short = sheet.column("SHORTNAME")?;
    let text = sheet.column("AFFILIATION")?;
    let mut affiliations = Vec::new();
    for row in &sheet.rows {
        if row[short].is_empty() || row[text].is_empty() {
            warn!("affiliations: skipping incomplete row: {:?}", row);
            continue;
        }
        affiliations.push(Affiliation {
            short: row[short].clone(),
            text: row[text].clone(),
        });
    }
    Ok(affiliations)
}

fn authors_from_sheet(sheet: &Sheet) -> Result<Vec<Author>> {
    let display = sheet.column("AUTHOR")?;
    let last = sheet.column("Last Name")?;
    let first = sheet.column("First Name")?;
    let orcid = sheet.column("ORCID")?;
    let email = sheet.column("EMAIL")?;
    let short = sheet.column("SHORTNAME")?;
    let affiliations = sheet.column("AFFILIATIONS")?;
    let acknowledgements = sheet.column("ACKNOWLEDGEMENTS")?;
    let mut authors = Vec::new();
    for row in &sheet.rows {
        if row[display].is_empty() || row[short].is_empty() {
            warn!(
                "{}: skipping row with empty AUTHOR or SHORTNAME: {:?}",
                sheet.name, row
            );
            continue;
        }
        authors.push(Author {
            display: row[display].clone(),
            last: row[last].clone(),
            first: row[first].clone(),
            orcid: row[orcid].clone(),
            email: row[email].clone(),
            short: row[short].clone(),
            affiliations: split_list(&row[affiliations]),
            acknowledgements: split_list(&row[acknowledgements]),
            normalized: normalize(&row[display]),
        });
    }
    Ok(authors)
}

fn acknowledgements_from_sheet(sheet: &Sheet) -> Result<Vec<Acknowledgement>> {
    let key = sheet.column("ACKNOWLEDGEMENTS")?;
    let text = sheet.column("ACKNOWLEDGEMENTS_TEXT")?;
    let mut acknowledgements = Vec::new();
    for row in &sheet.rows {
        if row[key].is_empty() || row[text].is_empty() {
            warn!("acknowledgements: skipping incomplete row: {:?}", row);
            continue;
        }
        acknowledgements.push(Acknowledgement {
            key: row[key].clone(),
            text: row[text].clone(),
        });
    }
    Ok(acknowledgements)
}

fn check_unique_shortnames(authors: &[Author]) -> Result<()> {
    let mut seen = HashSet::new();
    for author in authors {
        if !seen.insert(author.short.as_str()) {
            return Err(AppError::DuplicateAuthor(author.short.clone()));
        }
    }
    Ok(())
}
