//! Error taxonomy shared by the store, embedding, clustering, and service layers.

use thiserror::Error;

/// Result alias for board operations.
pub type Result<T> = std::result::Result<T, BoardError>;

/// Every failure a board operation can surface to its caller.
///
/// The HTTP layer maps each variant onto a status code; see the server
/// module of the `idea-board` crate.
#[derive(Error, Debug)]
pub enum BoardError {
    /// A required field is missing or empty. Detected before any store or
    /// model call, so no state has changed.
    #[error("{0}")]
    Validation(String),

    /// The embedding backend could not be initialized.
    #[error("embedding model unavailable: {0}")]
    ModelUnavailable(String),

    /// Malformed clustering configuration (`eps < 0`, `min_samples < 1`).
    #[error("invalid clustering parameters: {0}")]
    InvalidParameters(String),

    /// The requested record does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// A loaded embedding backend failed a single encode call.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The board store failed.
    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl BoardError {
    /// Shorthand for [`BoardError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
