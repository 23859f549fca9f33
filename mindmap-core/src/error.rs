//! Crate-wide error taxonomy.

/// Result type alias used throughout `mindmap-core`.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the mind map associative query engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid reference: edge endpoint {0} does not exist")]
    InvalidReference(String),

    #[error("cache pressure: no evictable entry found for insertion")]
    CachePressure,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the caller should see this error (validation) or whether the
    /// pipeline should recover locally (everything else, per spec.md §7).
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Validation(_) => false,
            Error::InvalidReference(_)
            | Error::CachePressure
            | Error::Storage(_)
            | Error::Internal(_)
            | Error::Serialization(_)
            | Error::Io(_) => true,
        }
    }
}
