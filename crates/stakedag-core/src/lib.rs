//! # StakeDAG Core
//!
//! Pure primitives for a proof-of-stake block DAG: block metadata, deploys,
//! hashing and signatures, and the canonical codec.
//!
//! This crate contains no I/O, no storage, no networking. It is pure computation
//! over cryptographic data structures.
//!
//! ## Key Types
//!
//! - [`BlockMetadata`] - Consensus-relevant snapshot of a block, with rank
//! - [`Block`] - An assembled block (header + body) that metadata is extracted from
//! - [`Deploy`] - A unit of work moving through Draft -> Committed -> Signed
//! - [`ReadyDeploy`] - A deploy in final form, signed or not
//!
//! ## Canonicalization
//!
//! Everything that is hashed or stored is encoded using deterministic CBOR.
//! See [`canonical`] module.

pub mod block;
pub mod canonical;
pub mod crypto;
pub mod deploy;
pub mod error;
pub mod metadata;
pub mod types;
pub mod validation;

pub use block::{compute_block_hash, Block, BlockBody, BlockBuilder, BlockHeader, Bond, Justification};
pub use canonical::{decode_metadata, metadata_bytes};
pub use crypto::{derive_public_key, Blake3Hash, Ed25519PublicKey, Ed25519Signature, Keypair};
pub use deploy::{
    Approval, Committed, Deploy, DeployBody, DeployHeader, DeployState, Draft, ReadyDeploy,
    SignatureAlgorithm, Signed,
};
pub use error::{CoreError, ValidationError};
pub use metadata::{compare, sort_by_rank, BlockMetadata, RankLookup, RankOrdered};
pub use types::{BlockHash, DeployHash};
pub use validation::{validate_approval, validate_commitment, validate_deploy, validate_metadata_structure};
