//! Error types for anyvec

use thiserror::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// A single failed document within a batched ingestion
#[derive(Debug, Clone, PartialEq)]
pub struct IngestionFailure {
    pub document_id: String,
    pub reason: String,
}

/// Core error types for the anyvec system
#[derive(Error, Debug)]
pub enum Error {
    #[error("filter syntax error: {0}")]
    Syntax(String),

    #[error("unknown filter field: {0}")]
    UnknownField(String),

    #[error("collection schema missing: {0}")]
    SchemaMissing(String),

    #[error("collection schema conflict: {0}")]
    SchemaConflict(String),

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("partial ingestion failure: {} document(s) failed", failures.len())]
    PartialIngestion { failures: Vec<IngestionFailure> },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("other error: {0}")]
    Other(String),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}
