//! Error types for the store module.

use stakedag_core::{BlockHash, CoreError, ValidationError};
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Stored bytes failed to decode.
    #[error("codec error: {0}")]
    Codec(#[from] CoreError),

    /// A block could not be turned into metadata.
    #[error("invalid block: {0}")]
    Validation(#[from] ValidationError),

    /// Metadata not found.
    #[error("metadata not found: {0}")]
    NotFound(BlockHash),

    /// Different metadata already stored under the same block hash.
    #[error("conflicting metadata for block {0}")]
    Conflict(BlockHash),

    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
