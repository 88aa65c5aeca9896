use crate::error::{AppError, Result};
use crate::model::{Affiliation, Author, Paper, Registry};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

/// Accented characters mapped to their LaTeX escapes.
const LATEX_ACCENTS: [(&str, &str); 46] = [
    ("é", "\\'e"),
    ("è", "\\`e"),
    ("ê", "\\^e"),
    ("à", "\\`a"),
    ("â", "\\^a"),
    ("ç", "\\c{c}"),
    ("ù", "\\`u"),
    ("û", "\\^u"),
    ("ô", "\\^o"),
    ("î", "\\^i"),
    ("ï", "\\\"i"),
    ("ë", "\\\"e"),
    ("ü", "\\\"u"),
    ("ö", "\\\"o"),
    ("ä", "\\\"a"),
    ("ÿ", "\\\"y"),
    ("É", "\\'E"),
    ("È", "\\`E"),
    ("Ê", "\\^E"),
    ("À", "\\`A"),
    ("Â", "\\^A"),
    ("Ç", "\\c{C}"),
    ("Ù", "\\`U"),
    ("Û", "\\^U"),
    ("Ô", "\\^O"),
    ("Î", "\\^I"),
    ("Ï", "\\\"I"),
    ("Ë", "\\\"E"),
    ("Ü", "\\\"U"),
    ("Ö", "\\\"O"),
    ("Ä", "\\\"A"),
    ("Ÿ", "\\\"Y"),
    ("á", "\\'a"),
    ("í", "\\'i"),
    ("ó", "\\'o"),
    ("ú", "\\'u"),
    ("ñ", "\\~n"),
    ("Á", "\\'A"),
    ("Í", "\\'I"),
    ("Ó", "\\'O"),
    ("Ú", "\\'U"),
    ("Ñ", "\\~N"),
    ("ã", "\\~a"),
    ("õ", "\\~o"),
    ("Ã", "\\~A"),
    ("Õ", "\\~O"),
];

lazy_static! {
    static ref URL_REGEX: Regex = Regex::new(r"https?://\S+").unwrap();
}

pub fn latexify_accents(text: &str) -> String {
    let mut out = text.to_string();
    for (letter, escape) in LATEX_ACCENTS {
        out = out.replace(letter, escape);
    }
    out
}

pub fn safe_latex(text: &str) -> String {
    text.replace(" & ", " \\& ")
}

pub fn collapse_spaces(text: &str) -> String {
    let mut out = text.to_string();
    while out.contains("  ") {
        out = out.replace("  ", " ");
    }
    out
}

/// Bare URLs in acknowledgement text become `\href{link}{text}` with the
/// scheme and `doi.org/` dropped from the display text.
pub fn linkify_urls(text: &str) -> String {
    URL_REGEX
        .replace_all(text, |caps: &regex::Captures| {
            let full = caps.get(0).map_or("", |m| m.as_str());
            let link = full.trim_end_matches('.');
            let trailing = &full[link.len()..];
            let mut display = link.split("://").last().unwrap_or(link);
            display = display.strip_prefix("doi.org/").unwrap_or(display);
            format!("\\href{{{}}}{{{}}}{}", link, display, trailing)
        })
        .into_owned()
}

/// Paper style, parsed against the configured allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaperStyle {
    Aj,
    Aanda,
}

impl PaperStyle {
    pub fn parse(style: &str, allowed: &[String]) -> Result<PaperStyle> {
        let upper = style.to_uppercase();
        let permitted = allowed.iter().any(|s| s.to_uppercase() == upper);
        match upper.as_str() {
            "AJ" if permitted => Ok(PaperStyle::Aj),
            "AANDA" if permitted => Ok(PaperStyle::Aanda),
            _ => Err(AppError::UnknownStyle {
                style: style.to_string(),
                allowed: allowed.join(", "),
            }),
        }
    }
}

/// One affiliation slot of a resolved author.
#[derive(Debug, Clone, PartialEq)]
pub enum AffiliationRef {
    /// Index into the run's affiliation table.
    Known(usize),
    /// Short code that never resolved; kept visible in the output.
    Unresolved(String),
}

#[derive(Debug, Clone)]
pub struct ResolvedAuthor {
    pub author: Author,
    pub affiliations: Vec<AffiliationRef>,
}

/// One slot of the paper's ordered author sequence.
#[derive(Debug, Clone)]
pub enum AuthorEntry {
    Resolved(ResolvedAuthor),
    /// Name from the paper's author list the operator skipped.
    Unresolved(String),
}

impl AuthorEntry {
    fn display(&self) -> String {
        match self {
            AuthorEntry::Resolved(resolved) => resolved.author.display.clone(),
            AuthorEntry::Unresolved(name) => unresolved_marker(name),
        }
    }
}

fn unresolved_marker(name: &str) -> String {
    format!("?? {} ??", name)
}

/// Assigns numeric affiliation tags in first-appearance order across the
/// whole author list; the same affiliation always gets the same tag.
#[derive(Debug, Default)]
pub struct AffiliationIndexer {
    order: Vec<usize>,
    assigned: HashMap<usize, usize>,
}

impl AffiliationIndexer {
    pub fn tag(&mut self, affiliation_index: usize) -> usize {
        if let Some(&tag) = self.assigned.get(&affiliation_index) {
            return tag;
        }
        self.order.push(affiliation_index);
        let tag = self.order.len();
        self.assigned.insert(affiliation_index, tag);
        tag
    }

    /// Affiliation table indices in tag order (tag = position + 1).
    pub fn ordered(&self) -> &[usize] {
        &self.order
    }
}

/// Unique initials for the resolved authors, in author order. Widens the
/// last-name prefix until no two authors collide; ten rounds without success
/// is an error.
pub fn make_initials(authors: &[&Author]) -> Result<Vec<String>> {
    let firsts: Vec<&str> = authors.iter().map(|a| a.first.as_str()).collect();
    let lasts: Vec<String> = authors
        .iter()
        .map(|a| strip_name_prefix(&a.last).to_string())
        .collect();
    let mut widths = vec![1usize; authors.len()];
    for _ in 0..10 {
        let initials: Vec<String> = firsts
            .iter()
            .zip(lasts.iter())
            .zip(widths.iter())
            .map(|((first, last), &width)| {
                format!("{}{}", first_initials(first), last_prefix(last, width))
            })
            .collect();
        let mut duplicate = vec![false; initials.len()];
        for i in 0..initials.len() {
            for j in (i + 1)..initials.len() {
                if initials[i] == initials[j] {
                    duplicate[i] = true;
                    duplicate[j] = true;
                }
            }
        }
        if !duplicate.contains(&true) {
            return Ok(initials);
        }
        for (width, &is_duplicate) in widths.iter_mut().zip(duplicate.iter()) {
            if is_duplicate {
                *width += 1;
            }
        }
    }
    let colliding: Vec<&str> = authors.iter().map(|a| a.display.as_str()).collect();
    Err(AppError::InitialsOverflow(colliding.join(" + ")))
}

fn strip_name_prefix(last: &str) -> &str {
    let mut name = last;
    loop {
        let lower = name.to_lowercase();
        if lower.starts_with("de ") || lower.starts_with("da ") {
            name = &name[3..];
        } else {
            return name;
        }
    }
}

fn first_initials(first: &str) -> String {
    if let Some((a, b)) = first.split_once(' ') {
        format!("{}{}", take_chars(a, 1), take_chars(b, 1))
    } else if let Some((a, b)) = first.split_once('-') {
        format!("{}-{}", take_chars(a, 1), take_chars(b, 1))
    } else {
        take_chars(first, 1)
    }
}

fn last_prefix(last: &str, width: usize) -> String {
    if let Some((a, b)) = last.split_once(' ') {
        format!("{}{}", take_chars(a, width), take_chars(b, width))
    } else if let Some((a, b)) = last.split_once('-') {
        format!("{}-{}", take_chars(a, width), take_chars(b, width))
    } else {
        take_chars(last, width)
    }
}

fn take_chars(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}

pub struct RenderedPaper {
    /// The full LaTeX document body written to the output file.
    pub document: String,
    /// Comma-separated author list for the arXiv submission form.
    pub arxiv_line: String,
    /// Comma-separated co-author emails (placeholders for missing ones).
    pub emails_line: String,
    pub unresolved_authors: usize,
}

/// Renders the ordered author sequence plus acknowledgements for one paper.
pub fn render_paper(
    paper: &Paper,
    style: PaperStyle,
    entries: &[AuthorEntry],
    affiliations: &[Affiliation],
    registry: &Registry,
) -> Result<RenderedPaper> {
    let resolved: Vec<&ResolvedAuthor> = entries
        .iter()
        .filter_map(|e| match e {
            AuthorEntry::Resolved(r) => Some(r),
            AuthorEntry::Unresolved(_) => None,
        })
        .collect();
    let authors: Vec<&Author> = resolved.iter().map(|r| &r.author).collect();
    let initials = make_initials(&authors)?;

    let body = match style {
        PaperStyle::Aj => render_aj(entries, affiliations),
        PaperStyle::Aanda => render_aanda(entries, affiliations),
    };
    let acknowledgements = acknowledgements_block(paper, &resolved, &initials, registry)?;

    let mut document = format!("{}\n\n{}", body, acknowledgements);
    document = collapse_spaces(&safe_latex(&latexify_accents(&document)));

    let arxiv_line = latexify_accents(
        &entries
            .iter()
            .map(|e| e.display())
            .collect::<Vec<_>>()
            .join(", "),
    );
    let emails_line = resolved
        .iter()
        .map(|r| {
            if r.author.email.is_empty() || r.author.email == "0" {
                format!("[{}]", r.author.display)
            } else {
                r.author.email.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    let unresolved_authors = entries.len() - resolved.len();

    Ok(RenderedPaper {
        document,
        arxiv_line,
        emails_line,
        unresolved_authors,
    })
}

/// AJ style: one `\author` + `\affiliation` block per author.
fn render_aj(entries: &[AuthorEntry], affiliations: &[Affiliation]) -> String {
    let mut out = String::new();
    for entry in entries {
        match entry {
            AuthorEntry::Resolved(resolved) => {
                let orcid = if resolved.author.orcid.len() > 4 {
                    format!("[{}]", resolved.author.orcid)
                } else {
                    String::new()
                };
                out.push_str(&format!(
                    "\\author{}{{{}}}\n",
                    orcid, resolved.author.display
                ));
                for affiliation in &resolved.affiliations {
                    match affiliation {
                        AffiliationRef::Known(index) => {
                            out.push_str(&format!(
                                "\\affiliation{{{}}}\n",
                                affiliations[*index].text
                            ));
                        }
                        AffiliationRef::Unresolved(short) => {
                            out.push_str(&format!(
                                "\\affiliation{{{}}}\n",
                                unresolved_marker(short)
                            ));
                        }
                    }
                }
            }
            AuthorEntry::Unresolved(name) => {
                out.push_str(&format!("%% UNRESOLVED co-author\n\\author{{{}}}\n",
                    unresolved_marker(name)));
            }
        }
        out.push('\n');
    }
    out
}

/// AANDA style: single `\author` block with `\inst` superscripts and an
/// `\institute` list numbered in first-appearance order.
fn render_aanda(entries: &[AuthorEntry], affiliations: &[Affiliation]) -> String {
    let mut indexer = AffiliationIndexer::default();
    for entry in entries {
        if let AuthorEntry::Resolved(resolved) = entry {
            for affiliation in &resolved.affiliations {
                if let AffiliationRef::Known(index) = affiliation {
                    indexer.tag(*index);
                }
            }
        }
    }

    let mut out = String::from("\\author{\n");
    let mut first_resolved_seen = false;
    for (position, entry) in entries.iter().enumerate() {
        let line = match entry {
            AuthorEntry::Resolved(resolved) => {
                let mut tags: Vec<String> = resolved
                    .affiliations
                    .iter()
                    .map(|affiliation| match affiliation {
                        AffiliationRef::Known(index) => indexer.tag(*index).to_string(),
                        AffiliationRef::Unresolved(_) => "?".to_string(),
                    })
                    .collect();
                if !first_resolved_seen {
                    // First author carries the corresponding-email marker.
                    first_resolved_seen = true;
                    tags.push("*".to_string());
                }
                let mut line = format!("{}\\inst{{{}}}", resolved.author.display, tags.join(","));
                if resolved.author.orcid.len() > 4 {
                    line.push_str(&format!("\\orcidlink{{{}}}", resolved.author.orcid));
                }
                line
            }
            AuthorEntry::Unresolved(name) => {
                format!("{}\\inst{{?}}", unresolved_marker(name))
            }
        };
        out.push_str(&line);
        if position != entries.len() - 1 {
            out.push_str(",\n");
        } else {
            out.push('\n');
        }
    }
    out.push_str("}\n\n");

    out.push_str("\\institute{\n");
    for (position, &affiliation_index) in indexer.ordered().iter().enumerate() {
        out.push_str(&format!(
            "\\inst{{{}}}{}\\\\\n",
            position + 1,
            affiliations[affiliation_index].text
        ));
    }
    let first_email = entries.iter().find_map(|e| match e {
        AuthorEntry::Resolved(r) if !r.author.email.is_empty() && r.author.email != "0" => {
            Some(r.author.email.clone())
        }
        _ => None,
    });
    if let Some(email) = first_email {
        out.push_str(&format!("\\inst{{*}}\\email{{{}}}\n", email));
    }
    out.push_str("}\n");
    out
}

/// Paper-level acknowledgement texts followed by per-author acknowledgements
/// grouped by key, with `{INITIALS}` replaced by the contributors' initials.
fn acknowledgements_block(
    paper: &Paper,
    resolved: &[&ResolvedAuthor],
    initials: &[String],
    registry: &Registry,
) -> Result<String> {
    let mut out = String::new();
    for key in &paper.acknowledgements {
        let acknowledgement = registry.acknowledgement(key)?;
        if acknowledgement.text.contains("{INITIALS}") {
            return Err(AppError::PaperAcknowledgementInitials(key.clone()));
        }
        out.push_str(&linkify_urls(&acknowledgement.text));
        out.push_str("\\\\\n");
    }

    let mut unique_keys: Vec<&str> = Vec::new();
    for author in resolved {
        for key in &author.author.acknowledgements {
            if !unique_keys.contains(&key.as_str()) {
                unique_keys.push(key);
            }
        }
    }
    for (position, key) in unique_keys.iter().enumerate() {
        let acknowledgement = registry.acknowledgement(key)?;
        let who: Vec<&str> = resolved
            .iter()
            .zip(initials.iter())
            .filter(|(author, _)| author.author.acknowledgements.iter().any(|k| k == key))
            .map(|(_, initials)| initials.as_str())
            .collect();
        let who_text = join_with_ampersand(&who);
        let text = linkify_urls(&acknowledgement.text).replace("{INITIALS}", &who_text);
        out.push_str(&text);
        if position != unique_keys.len() - 1 {
            out.push_str("\\\\\n");
        }
    }
    Ok(out)
}

fn join_with_ampersand(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [single] => format!("{} ", single),
        _ => format!(
            "{} \\& {} ",
            items[..items.len() - 1].join(", "),
            items[items.len() - 1]
        ),
    }
}
