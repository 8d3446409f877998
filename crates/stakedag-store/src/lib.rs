//! # StakeDAG Store
//!
//! Storage abstraction for block metadata. Provides a trait-based interface
//! so that fork choice and the client facade stay storage-agnostic.
//!
//! ## Key Types
//!
//! - [`MetadataStore`] - The async trait for all storage operations
//! - [`MetadataStoreExt`] - Block insertion with parent rank lookup, ordered listing
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`InsertResult`] - Result of storing a record
//!
//! ## Usage
//!
//! ```rust,no_run
//! use stakedag_store::{MemoryStore, MetadataStoreExt};
//! use stakedag_core::{BlockBuilder, Keypair};
//!
//! async fn example() {
//!     let store = MemoryStore::new();
//!     let validator = Keypair::generate().public_key();
//!     let genesis = BlockBuilder::new(validator, 0).bond(validator, 100).build();
//!
//!     let meta = store.insert_block(&genesis).await.unwrap();
//!     assert_eq!(meta.rank(), 0);
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Canonical at rest**: records are stored as canonical bytes and decoded on read
//! - **Idempotent inserts**: storing identical metadata twice returns `AlreadyExists`
//! - **Conflict detection**: different metadata under the same hash is an error

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use traits::{InsertResult, MetadataStore, MetadataStoreExt};
