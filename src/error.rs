use thiserror::Error;

/// Classifies catalog service errors for programmatic matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogErrorKind {
    /// HTTP request failed (connect, status, timeout)
    Http,
    /// Response body could not be parsed
    InvalidResponse,
    /// Local file open/read/write failure
    FileError,
}

/// Domain sieve error types
#[derive(Error, Debug)]
pub enum SieveError {
    #[error("Target list error: {0}")]
    TargetList(String),

    #[error("Catalog error: {message}")]
    Catalog {
        kind: CatalogErrorKind,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SieveError>;
