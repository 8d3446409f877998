//! MetadataStore trait: the abstract interface for block metadata persistence.
//!
//! Metadata is stored as canonical bytes keyed by block hash. Reads decode
//! through [`BlockMetadata::from_bytes`], so a store never hands out a value
//! that would not survive a round trip.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use stakedag_core::{sort_by_rank, Block, BlockHash, BlockMetadata};

use crate::error::{Result, StoreError};

/// Result of storing a metadata record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// Metadata was inserted.
    Inserted,
    /// Identical metadata already exists (idempotent - not an error).
    AlreadyExists,
}

/// Async interface for metadata persistence.
///
/// # Design Notes
///
/// - **Idempotent inserts**: Storing byte-identical metadata twice returns `AlreadyExists`.
/// - **Conflict detection**: Storing different metadata under an existing block
///   hash fails with [`StoreError::Conflict`].
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Store metadata under its block hash.
    async fn put_metadata(&self, meta: &BlockMetadata) -> Result<InsertResult>;

    /// Get metadata by block hash.
    async fn get_metadata(&self, hash: &BlockHash) -> Result<Option<BlockMetadata>>;

    /// Get the stored canonical bytes.
    async fn get_metadata_bytes(&self, hash: &BlockHash) -> Result<Option<Bytes>>;

    /// Check if metadata exists for a block.
    async fn has_metadata(&self, hash: &BlockHash) -> Result<bool>;

    /// All stored block hashes, in no particular order.
    async fn list_metadata(&self) -> Result<Vec<BlockHash>>;
}

/// Extension trait for common store patterns.
pub trait MetadataStoreExt: MetadataStore {
    /// Extract metadata from `block` using stored parent ranks, then store it.
    ///
    /// Fails with [`StoreError::Validation`] if a parent is not stored yet.
    fn insert_block(
        &self,
        block: &Block,
    ) -> impl std::future::Future<Output = Result<BlockMetadata>> + Send;

    /// Like [`insert_block`](Self::insert_block), but also reports whether
    /// this call stored the record or found it already present.
    fn store_block(
        &self,
        block: &Block,
    ) -> impl std::future::Future<Output = Result<(BlockMetadata, InsertResult)>> + Send;

    /// Get metadata, failing with [`StoreError::NotFound`] if absent.
    fn require_metadata(
        &self,
        hash: &BlockHash,
    ) -> impl std::future::Future<Output = Result<BlockMetadata>> + Send;

    /// Every stored record, ordered by rank then block hash.
    fn ordered_metadata(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<BlockMetadata>>> + Send;
}

impl<S: MetadataStore + ?Sized> MetadataStoreExt for S {
    async fn insert_block(&self, block: &Block) -> Result<BlockMetadata> {
        let (meta, _) = self.store_block(block).await?;
        Ok(meta)
    }

    async fn store_block(&self, block: &Block) -> Result<(BlockMetadata, InsertResult)> {
        let mut ranks: HashMap<BlockHash, u64> = HashMap::new();
        for parent in &block.header.parent_hashes {
            if let Some(meta) = self.get_metadata(parent).await? {
                ranks.insert(*parent, meta.rank());
            }
        }

        let meta = BlockMetadata::from_block(block, &ranks)?;
        let result = self.put_metadata(&meta).await?;
        Ok((meta, result))
    }

    async fn require_metadata(&self, hash: &BlockHash) -> Result<BlockMetadata> {
        self.get_metadata(hash)
            .await?
            .ok_or(StoreError::NotFound(*hash))
    }

    async fn ordered_metadata(&self) -> Result<Vec<BlockMetadata>> {
        let mut all = Vec::new();
        for hash in self.list_metadata().await? {
            all.push(self.require_metadata(&hash).await?);
        }
        sort_by_rank(&mut all);
        Ok(all)
    }
}
