//! # StakeDAG Testkit
//!
//! Testing utilities for StakeDAG.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known encodings and inputs for cross-platform verification
//! - **Generators**: Proptest strategies for random deploys and DAGs
//! - **Fixtures**: Helper structs for setting up test scenarios
//!
//! ## Golden Vectors
//!
//! ```rust
//! use stakedag_testkit::vectors::{check_metadata_vector, metadata_vectors};
//!
//! for vector in metadata_vectors() {
//!     let meta = check_metadata_vector(&vector).unwrap();
//!     println!("{}: rank {}", vector.name, meta.rank());
//! }
//! ```
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use stakedag_testkit::generators::{dag_from_params, metadata_for_dag, DagParams};
//!
//! proptest! {
//!     #[test]
//!     fn metadata_roundtrips(params: DagParams) {
//!         for meta in metadata_for_dag(&dag_from_params(&params)) {
//!             prop_assert_eq!(BlockMetadata::from_bytes(&meta.to_bytes()).unwrap(), meta);
//!         }
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use stakedag_testkit::fixtures::DagFixture;
//!
//! let mut dag = DagFixture::new(3);
//! let meta = dag.extend(1).unwrap();
//! assert_eq!(meta.rank(), 1);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_party_fixtures, DagFixture, TestFixture};
pub use generators::{dag_from_params, deploy_from_params, metadata_for_dag, DagParams, DeployParams};
pub use vectors::{
    deploy_vectors, generate_deploy_from_vector, metadata_vectors, verify_all_vectors,
    DeployVector, MetadataVector,
};
