//! Error types for StakeDAG Core.

use thiserror::Error;

use crate::crypto::Ed25519PublicKey;
use crate::types::BlockHash;

/// Errors from encoding, decoding, and key handling.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("malformed encoding: {0}")]
    MalformedEncoding(String),

    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    #[error("invalid key encoding: {0}")]
    InvalidKeyEncoding(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,
}

/// Structural invariant violations detected while constructing or checking
/// block metadata and deploys.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("inconsistent weight map: {0}")]
    InconsistentWeightMap(String),

    #[error("duplicate parent: {0}")]
    DuplicateParent(BlockHash),

    #[error("duplicate justification for validator {0:?}")]
    DuplicateJustificationValidator(Ed25519PublicKey),

    #[error("unknown parent: {0}")]
    UnknownParent(BlockHash),

    #[error("inconsistent rank: {0}")]
    InconsistentRank(String),

    #[error("rank overflow at block {0}")]
    RankOverflow(BlockHash),

    #[error("commitment mismatch: {0}")]
    CommitmentMismatch(String),

    #[error("signature verification failed")]
    SignatureFailed,

    #[error(transparent)]
    Core(#[from] CoreError),
}
