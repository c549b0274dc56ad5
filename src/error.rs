use std::path::PathBuf;

use thiserror::Error;

/// Main error type for Docwright operations
#[derive(Error, Debug)]
pub enum DocwrightError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parser error: {0}")]
    Parser(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("Page generation failed for {page}: {reason}")]
    Generation { page: String, reason: String },

    /// The only fatal condition of an incremental pass: without the manifest
    /// every later staleness decision would be wrong.
    #[error("Failed to persist build manifest to {path}: {source}")]
    ManifestPersist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("{0} page(s) are out of date")]
    StalePages(usize),
}

pub type Result<T> = std::result::Result<T, DocwrightError>;
