use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::path::PathBuf;

mod config;
mod error;
mod matcher;
mod model;
mod normalize;
mod pipeline;
mod render;
mod resolve;
mod sheet;
mod xmatch;

use config::{Config, SheetSource};
use pipeline::GenerateOptions;
use resolve::ConsolePrompter;
use xmatch::XmatchOptions;

#[derive(Parser, Debug)]
#[command(
    name = "coauthor-tex",
    about = "Build LaTeX co-author lists from linked spreadsheet data."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(
        long,
        global = true,
        default_value_t = LevelFilter::Info,
        value_parser = parse_level,
        help = "Log level (ERROR, WARN, INFO, DEBUG, TRACE)"
    )]
    log_level: LevelFilter,

    #[arg(
        long,
        global = true,
        value_name = "FILE",
        help = "JSON config overriding the built-in sheet ids and thresholds"
    )]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_name = "DIR",
        help = "Read sheets from CSV files in a local directory instead of fetching"
    )]
    sheet_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the full fetch/match/resolve pipeline and write the LaTeX author list
    Generate {
        #[arg(long, help = "Paper key to generate; prompts interactively when omitted")]
        paper: Option<String>,

        #[arg(
            short,
            long,
            help = "Output .tex path (defaults to <paper key>_coauthors.tex)"
        )]
        output: Option<PathBuf>,
    },
    /// Fuzzy-match a pasted co-author list against the master author sheet
    Xmatch {
        #[arg(
            long,
            default_value_t = 0.8,
            help = "Minimum score for a match (0 to 1)"
        )]
        min_score: f64,

        #[arg(long, help = "Sort the report by author last name")]
        sort: bool,
    },
}

fn parse_level(input: &str) -> std::result::Result<LevelFilter, String> {
    match input.to_ascii_uppercase().as_str() {
        "ERROR" => Ok(LevelFilter::Error),
        "WARN" => Ok(LevelFilter::Warn),
        "INFO" => Ok(LevelFilter::Info),
        "DEBUG" => Ok(LevelFilter::Debug),
        "TRACE" => Ok(LevelFilter::Trace),
        other => Err(format!("Invalid log level: {}", other)),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    SimpleLogger::new()
        .with_level(cli.log_level)
        .init()
        .context("Initialize logger")?;

    let config = match &cli.config {
        Some(path) => {
            Config::from_file(path).with_context(|| format!("Load config {}", path.display()))?
        }
        None => Config::default(),
    };
    let source = match &cli.sheet_dir {
        Some(dir) => SheetSource::LocalDir(dir.clone()),
        None => SheetSource::Remote,
    };

    match cli.command {
        Commands::Generate { paper, output } => {
            let options = GenerateOptions { paper, output };
            let mut prompter = ConsolePrompter;
            pipeline::run(&config, &source, &options, &mut prompter)
                .context("Generate author list")?;
        }
        Commands::Xmatch { min_score, sort } => {
            let options = XmatchOptions { min_score, sort };
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            xmatch::run(
                &config,
                &source,
                &options,
                &mut stdin.lock(),
                &mut stdout.lock(),
            )
            .context("Cross-match authors")?;
        }
    }
    Ok(())
}
