//! # StakeDAG
//!
//! Client-side API for a proof-of-stake block DAG: build and sign deploys,
//! submit them, record block metadata, and watch a node's DAG view.
//!
//! ## Overview
//!
//! - **Deploys**: raw session/payment bytes plus optional hex keys become a
//!   committed, content-addressed and optionally signed [`ReadyDeploy`]
//! - **Submission**: the network transport is a [`DeploySubmitter`]; its
//!   failures keep their cause and are never retried
//! - **Metadata**: blocks are reduced to [`BlockMetadata`] with a rank and read
//!   back in fork-choice order
//! - **DAG feed**: a cancellable poller that forwards changed snapshots
//!
//! ## Usage
//!
//! ```rust,no_run
//! use stakedag::{Client, ClientConfig, DeployRequest};
//! use stakedag::store::MemoryStore;
//! use stakedag::submit::memory::MemorySubmitter;
//!
//! async fn example() {
//!     let client = Client::new(MemoryStore::new(), MemorySubmitter::new(), ClientConfig::default());
//!
//!     let request = DeployRequest::new(&b"session wasm"[..], &b"payment wasm"[..])
//!         .private_key("9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60")
//!         .timestamp(1_736_870_400_000)
//!         .nonce(1);
//!
//!     let outcome = stakedag::outcome::report(client.send_deploy(request).await);
//!     println!("{}", outcome.message);
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `stakedag::core` - Core primitives (BlockMetadata, Deploy, codec, crypto)
//! - `stakedag::store` - Metadata storage abstraction

pub mod builder;
pub mod client;
pub mod config;
pub mod error;
pub mod feed;
pub mod outcome;
pub mod submit;
pub mod summary;

// Re-export component crates
pub use stakedag_core as core;
pub use stakedag_store as store;

// Re-export main types for convenience
pub use builder::{build_deploy, DeployRequest};
pub use client::{Client, IngestResult};
pub use config::ClientConfig;
pub use error::{BoxError, ClientError, Result};
pub use feed::{spawn_feed, DagFeed, FeedHandle, FeedStop};
pub use outcome::{report, Outcome};
pub use submit::{submit_deploy, DeploySubmitter};
pub use summary::{render_deploys, DeploySummary};

// Re-export commonly used core types
pub use stakedag_core::{
    Block, BlockBuilder, BlockHash, BlockMetadata, Deploy, DeployHash, Ed25519PublicKey, Keypair,
    RankOrdered, ReadyDeploy,
};
