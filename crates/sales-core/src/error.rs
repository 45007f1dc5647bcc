use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the sales dashboard.
#[derive(Error, Debug)]
pub enum SalesError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV reader failed before any row could be processed.
    #[error("Failed to parse spreadsheet: {0}")]
    Csv(#[from] csv::Error),

    /// The workbook could not be opened or its first sheet read.
    #[error("Failed to read workbook: {0}")]
    Workbook(#[from] calamine::Error),

    /// One or more of the required columns is absent from the header row.
    #[error("Missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// The spreadsheet has no header row at all.
    #[error("Spreadsheet is empty")]
    EmptyInput,

    /// The file extension does not map to a supported tabular format.
    #[error("Unsupported spreadsheet format: {0}")]
    UnsupportedFormat(PathBuf),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SalesError {
    /// `true` for errors that mean the uploaded file itself is unusable and
    /// must be replaced, as opposed to environment or configuration failures.
    pub fn is_rejected_upload(&self) -> bool {
        matches!(
            self,
            SalesError::MissingColumns(_)
                | SalesError::EmptyInput
                | SalesError::UnsupportedFormat(_)
                | SalesError::Csv(_)
                | SalesError::Workbook(_)
        )
    }
}

/// Convenience alias used throughout the sales crates.
pub type Result<T> = std::result::Result<T, SalesError>;
