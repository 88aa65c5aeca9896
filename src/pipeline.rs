use crate::config::{Config, SheetSource};
use crate::error::{AppError, Result};
use crate::matcher::Matcher;
use crate::model::{Affiliation, Author, Paper, Registry};
use crate::render::{
    self, AffiliationRef, AuthorEntry, PaperStyle, RenderedPaper, ResolvedAuthor,
};
use crate::resolve::{Resolution, ResolutionProvider, Resolver};
use dialoguer::theme::ColorfulTheme;
use dialoguer::Select;
use log::{info, warn};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

const RULE_WIDTH: usize = 80;

#[derive(Debug, Default)]
pub struct GenerateOptions {
    /// Paper key; prompts interactively when absent.
    pub paper: Option<String>,
    pub output: Option<PathBuf>,
}

/// Full fetch -> match -> resolve -> format run for one paper.
pub fn run(
    config: &Config,
    source: &SheetSource,
    options: &GenerateOptions,
    provider: &mut dyn ResolutionProvider,
) -> Result<()> {
    let registry = Registry::load(config, source)?;

    // Every paper's style must be allowed, not only the selected one.
    for paper in &registry.papers {
        PaperStyle::parse(&paper.style, &config.allowed_styles)?;
    }

    let paper_key = match &options.paper {
        Some(key) => key.clone(),
        None => select_paper(&registry)?,
    };
    let paper = registry.paper(&paper_key)?.clone();
    let style = PaperStyle::parse(&paper.style, &config.allowed_styles)?;

    let (entries, affiliations) = resolve_paper_authors(config, &registry, &paper, provider)?;

    // Per-author acknowledgement keys must all exist before rendering.
    for entry in &entries {
        if let AuthorEntry::Resolved(resolved) = entry {
            for key in &resolved.author.acknowledgements {
                registry.acknowledgement(key)?;
            }
        }
    }

    let rendered = render::render_paper(&paper, style, &entries, &affiliations, &registry)?;
    let output_path = options
        .output
        .clone()
        .unwrap_or_else(|| config.output_path(&paper.key));
    fs::write(&output_path, &rendered.document)?;
    info!("Wrote author list to {}", output_path.display());

    report(&paper.key, &rendered);
    Ok(())
}

fn select_paper(registry: &Registry) -> Result<String> {
    let keys: Vec<&str> = registry.papers.iter().map(|p| p.key.as_str()).collect();
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select the paper to generate the author list for")
        .items(&keys)
        .default(0)
        .interact()?;
    Ok(keys[selection].to_string())
}

/// Resolves the paper's ordered author references and, per resolved author,
/// its affiliation references. Returns the entries plus the working
/// affiliation table (the sheet's list, extended by any values typed in at
/// the prompt).
fn resolve_paper_authors(
    config: &Config,
    registry: &Registry,
    paper: &Paper,
    provider: &mut dyn ResolutionProvider,
) -> Result<(Vec<AuthorEntry>, Vec<Affiliation>)> {
    enum Slot {
        Author(Author),
        Skipped(String),
    }

    // Paper author lists reference authors by short name.
    let mut author_resolver = Resolver::with_keys(
        Matcher::new(config.thresholds),
        registry
            .authors
            .iter()
            .map(|a| (format!("{} ({})", a.display, a.short), a.short.clone()))
            .collect(),
    );

    let mut seen_shorts: HashSet<String> = HashSet::new();
    let mut slots: Vec<Slot> = Vec::new();
    for name in &paper.author_list {
        match author_resolver.resolve(name, provider)? {
            Resolution::Matched { index, .. } => {
                let author = registry.authors[index].clone();
                if !seen_shorts.insert(author.short.clone()) {
                    return Err(AppError::DuplicatePaperAuthor(author.short));
                }
                slots.push(Slot::Author(author));
            }
            Resolution::New(value) => {
                slots.push(Slot::Author(Author::from_display_name(&value)));
            }
            Resolution::Unresolved => {
                warn!(
                    "Paper '{}': co-author '{}' left unresolved; it will be flagged in the output",
                    paper.key, name
                );
                slots.push(Slot::Skipped(name.clone()));
            }
        }
    }

    // Affiliation references are short codes against the affiliation sheet.
    let mut affiliations: Vec<Affiliation> = registry.affiliations.clone();
    let mut affiliation_resolver = Resolver::with_keys(
        Matcher::new(config.thresholds),
        affiliations
            .iter()
            .map(|a| (format!("{} ({})", a.text, a.short), a.short.clone()))
            .collect(),
    );

    let mut entries: Vec<AuthorEntry> = Vec::new();
    for slot in slots {
        let author = match slot {
            Slot::Skipped(name) => {
                entries.push(AuthorEntry::Unresolved(name));
                continue;
            }
            Slot::Author(author) => author,
        };
        let mut refs: Vec<AffiliationRef> = Vec::new();
        for short in &author.affiliations {
            match affiliation_resolver.resolve(short, provider)? {
                Resolution::Matched { index, .. } => refs.push(AffiliationRef::Known(index)),
                Resolution::New(value) => {
                    // A value typed in at the prompt becomes a new affiliation
                    // for this run; later identical codes reuse it through the
                    // alias registry.
                    let index = match affiliations.iter().position(|a| a.text == value) {
                        Some(existing) => existing,
                        None => {
                            affiliations.push(Affiliation {
                                short: short.clone(),
                                text: value,
                            });
                            affiliations.len() - 1
                        }
                    };
                    refs.push(AffiliationRef::Known(index));
                }
                Resolution::Unresolved => {
                    warn!(
                        "Author '{}': affiliation '{}' left unresolved",
                        author.display, short
                    );
                    refs.push(AffiliationRef::Unresolved(short.clone()));
                }
            }
        }
        entries.push(AuthorEntry::Resolved(ResolvedAuthor {
            author,
            affiliations: refs,
        }));
    }
    Ok((entries, affiliations))
}

fn report(paper_key: &str, rendered: &RenderedPaper) {
    let rule = "~".repeat(RULE_WIDTH);
    println!("{}", rule);
    println!("{}", rendered.document);
    println!("{}", rule);
    println!("\tCo-author list for arXiv submission");
    println!("{}", rule);
    println!("{}", rendered.arxiv_line);
    println!("{}", rule);
    println!("\tCo-author emails");
    println!("{}", rule);
    println!("{}", rendered.emails_line);
    if rendered.unresolved_authors > 0 {
        warn!(
            "{}: {} co-author(s) left unresolved; search the output for '??'",
            paper_key, rendered.unresolved_authors
        );
    }
}
