//! Error taxonomy shared by the memory engine and the API surface.

use thiserror::Error;

/// Failures the memory engine can produce.
///
/// The augmentation path recovers from `Embedding` and `Storage` locally
/// (degrading to an unaugmented prompt); the explicit CRUD surface maps each
/// variant to an HTTP status in the API layer.
#[derive(Error, Debug)]
pub enum MemoryError {
    /// Malformed caller input — empty query, zero limit, bad importance.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The embedding provider was unreachable or rejected the input.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The persistence layer failed.
    #[error("storage failure: {0}")]
    Storage(String),

    /// Lookup/delete target does not exist or is not owned by the caller.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<rusqlite::Error> for MemoryError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl MemoryError {
    /// Stable machine-readable code, used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Embedding(_) => "EMBEDDING_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
        }
    }
}

pub type Result<T> = std::result::Result<T, MemoryError>;
