//! Error types for the client facade.

use stakedag_core::{CoreError, DeployHash, ValidationError};
use stakedag_store::StoreError;
use thiserror::Error;

/// Boxed error produced by external seams (transport, DAG feed).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur during client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Key decoding or codec error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Validation error.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Neither a key nor an account string was supplied.
    #[error("no account identity: supply a public key, a private key, or an account")]
    MissingIdentity,

    /// The transport rejected or failed to deliver a deploy. Never retried.
    #[error("failed to submit deploy {deploy_hash}")]
    TransportFailure {
        deploy_hash: DeployHash,
        #[source]
        source: BoxError,
    },

    /// The DAG feed failed to produce a sample.
    #[error("dag feed error")]
    Feed(#[source] BoxError),

    #[error("operation cancelled")]
    Cancelled,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
