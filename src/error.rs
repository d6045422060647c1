use std::io;
use thiserror::Error;

/// Errors surfaced at the edges of an analysis run (input, configuration, export).
///
/// The mining stages themselves never fail; malformed per-message data is
/// treated as absent.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Rejected configuration values (overlapping hour sets, bad thresholds).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed user dictionary entry.
    #[error("Dictionary error: {0}")]
    Dictionary(String),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
