use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to fetch sheet '{name}': {source}")]
    Fetch {
        name: String,
        source: reqwest::Error,
    },
    #[error("Sheet '{name}' returned HTTP status {status}")]
    FetchStatus {
        name: String,
        status: reqwest::StatusCode,
    },
    #[error("Sheet file not found: {}", .0.display())]
    SheetFileNotFound(PathBuf),
    #[error("Table '{table}' is missing required column '{column}'")]
    MissingColumn { table: String, column: String },
    #[error("Table '{table}' has unexpected column '{column}'")]
    UnexpectedColumn { table: String, column: String },
    #[error("Author '{0}' appears more than once across the author sheets")]
    DuplicateAuthor(String),
    #[error("Author '{0}' is listed more than once for this paper")]
    DuplicatePaperAuthor(String),
    #[error("Paper '{0}' not found in the papers sheet")]
    PaperNotFound(String),
    #[error("Paper style '{style}' is not allowed (expected one of: {allowed})")]
    UnknownStyle { style: String, allowed: String },
    #[error("Acknowledgement '{0}' is not in the acknowledgements sheet")]
    UnknownAcknowledgement(String),
    #[error("Paper-level acknowledgement '{0}' must not contain {{INITIALS}}")]
    PaperAcknowledgementInitials(String),
    #[error("Could not build unique initials for: {0}")]
    InitialsOverflow(String),
    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),
}
