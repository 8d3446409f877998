//! The Client: unified API over deploy construction, submission, metadata
//! storage and DAG watching.

use std::sync::Arc;

use tracing::debug;

use stakedag_core::{Block, BlockMetadata, ReadyDeploy};
use stakedag_store::{InsertResult, MetadataStore, MetadataStoreExt};

use crate::builder::{build_deploy, DeployRequest};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::feed::{spawn_feed, DagFeed, FeedHandle};
use crate::submit::{submit_deploy, DeploySubmitter};

/// Result of ingesting a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestResult {
    /// Metadata was extracted and stored.
    Accepted(BlockMetadata),
    /// Block was already in store (idempotent).
    Duplicate,
}

/// The main Client struct.
///
/// Provides a unified API for:
/// - Building deploys from raw inputs and submitting them
/// - Recording block metadata and reading it back in fork-choice order
/// - Watching a node's DAG view
pub struct Client<S: MetadataStore, T: DeploySubmitter> {
    store: Arc<S>,
    submitter: Arc<T>,
    config: ClientConfig,
}

impl<S: MetadataStore, T: DeploySubmitter> Client<S, T> {
    /// Create a new client instance.
    pub fn new(store: S, submitter: T, config: ClientConfig) -> Self {
        Self {
            store: Arc::new(store),
            submitter: Arc::new(submitter),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn submitter(&self) -> &T {
        &self.submitter
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Deploy Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Build a deploy from raw inputs.
    pub fn build_deploy(&self, request: DeployRequest) -> Result<ReadyDeploy> {
        build_deploy(request, &self.config)
    }

    /// Submit an already-built deploy.
    pub async fn submit(&self, deploy: &ReadyDeploy) -> Result<String> {
        submit_deploy(self.submitter.as_ref(), deploy, &self.config).await
    }

    /// Build and submit in one step. Returns the node's acknowledgement.
    pub async fn send_deploy(&self, request: DeployRequest) -> Result<String> {
        let deploy = self.build_deploy(request)?;
        self.submit(&deploy).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Block Metadata Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Extract and store a block's metadata. Parents must already be stored.
    pub async fn ingest_block(&self, block: &Block) -> Result<IngestResult> {
        if self.store.has_metadata(&block.block_hash).await? {
            debug!(block = %block.block_hash, "block already known");
            return Ok(IngestResult::Duplicate);
        }
        match self.store.store_block(block).await? {
            (meta, InsertResult::Inserted) => Ok(IngestResult::Accepted(meta)),
            (_, InsertResult::AlreadyExists) => {
                debug!(block = %block.block_hash, "block stored concurrently");
                Ok(IngestResult::Duplicate)
            }
        }
    }

    /// All stored metadata, rank ascending with hash tie-break.
    pub async fn fork_choice_order(&self) -> Result<Vec<BlockMetadata>> {
        Ok(self.store.ordered_metadata().await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // DAG Watching
    // ─────────────────────────────────────────────────────────────────────────

    /// Start polling `feed` with the configured interval and budget.
    pub fn watch_dag<F>(&self, feed: Arc<F>) -> FeedHandle
    where
        F: DagFeed + ?Sized + 'static,
    {
        spawn_feed(feed, &self.config)
    }
}
