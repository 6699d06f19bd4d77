//! Error types for the MC/DC analyzer

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Analyzer errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("Extraction error: {0}")]
    Extract(String),

    #[error("Formula parse error: {0}")]
    Formula(String),

    #[error("Malformed vector dataset: {0}")]
    Dataset(String),

    #[error("Malformed test results: {0}")]
    Results(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_norway::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}
