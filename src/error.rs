//! Error types for neurocohort

use thiserror::Error;

/// Errors that can occur while assembling a cohort
#[derive(Debug, Error)]
pub enum CohortError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Directory scan failed: {0}")]
    Scan(#[from] walkdir::Error),

    #[error("Failed to parse table row: {0}")]
    ParseError(String),

    #[error("Unparsable date of birth: {0}")]
    DateParseError(String),

    #[error("Unparsable session timestamp: {0}")]
    TimestampParseError(String),

    #[error("Metric filename does not follow the naming grammar: {0}")]
    MalformedFilename(String),
}
