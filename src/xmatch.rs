use crate::config::{Config, SheetSource};
use crate::error::Result;
use crate::matcher::{Scorer, TokenSortScorer};
use crate::model::{Author, Registry};
use crate::normalize::normalize;
use colored::Colorize;
use std::io::{BufRead, Write};

const NO_MATCH: &str = "NO MATCH";

#[derive(Debug)]
pub struct XmatchOptions {
    /// Scores below this are reported as NO MATCH.
    pub min_score: f64,
    /// Order the report and the merged line by matched author last name.
    pub sort: bool,
}

struct NameMatch {
    input: String,
    matched_author: String,
    matched_last: String,
    shortname: String,
    score: f64,
}

/// Matches a pasted external co-author list against the master author sheet
/// and prints a per-name report. Inspection only: no prompting, no document.
pub fn run(
    config: &Config,
    source: &SheetSource,
    options: &XmatchOptions,
    input: &mut dyn BufRead,
    out: &mut dyn Write,
) -> Result<()> {
    let all_authors = Registry::load_authors(config, source)?;
    let authors: Vec<&Author> = all_authors.iter().collect();

    writeln!(
        out,
        "Enter the co-authors to match, comma separated, over any number of lines \
         (empty line to finish):"
    )?;
    let names = read_names(input)?;
    let mut matches = match_names(&names, &authors, options.min_score);
    if options.sort {
        matches.sort_by(|a, b| a.matched_last.cmp(&b.matched_last));
    }

    for m in &matches {
        let matched = if m.shortname == NO_MATCH {
            format!("? {} ?", m.matched_author)
        } else {
            m.matched_author.clone()
        };
        let line = format!(
            "{:30} --> {:35} | {:16} (score: {:.1}%)",
            m.input,
            matched,
            m.shortname,
            m.score * 100.0
        );
        if m.shortname == NO_MATCH {
            writeln!(out, "{}", line.red())?;
        } else {
            writeln!(out, "{}", line.green())?;
        }
    }

    writeln!(out)?;
    if matches.iter().all(|m| m.shortname != NO_MATCH) {
        let merged: Vec<&str> = matches.iter().map(|m| m.shortname.as_str()).collect();
        writeln!(out, "Merged short names: {}", merged.join(","))?;
    } else {
        writeln!(
            out,
            "Some authors were not matched with a score above {:.0}%.",
            options.min_score * 100.0
        )?;
        writeln!(out, "Please check the output and adjust the input if necessary.")?;
    }
    Ok(())
}

/// Reads comma-separated names until a blank line (or EOF); entries shorter
/// than two characters are dropped.
fn read_names(input: &mut dyn BufRead) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            break;
        }
        lines.push(line);
    }
    let joined = lines.join(" ");
    Ok(joined
        .split(',')
        .map(str::trim)
        .filter(|name| name.chars().count() > 1)
        .map(String::from)
        .collect())
}

fn match_names(names: &[String], authors: &[&Author], min_score: f64) -> Vec<NameMatch> {
    let scorer = TokenSortScorer;
    names
        .iter()
        .map(|name| {
            let key = normalize(name);
            let best = authors
                .iter()
                .map(|author| (author, scorer.score(&key, &author.normalized)))
                .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
            match best {
                Some((author, score)) => NameMatch {
                    input: name.clone(),
                    matched_author: author.display.clone(),
                    matched_last: author.last.clone(),
                    shortname: if score >= min_score {
                        author.short.clone()
                    } else {
                        NO_MATCH.to_string()
                    },
                    score,
                },
                None => NameMatch {
                    input: name.clone(),
                    matched_author: String::new(),
                    matched_last: String::new(),
                    shortname: NO_MATCH.to_string(),
                    score: 0.0,
                },
            }
        })
        .collect()
}
