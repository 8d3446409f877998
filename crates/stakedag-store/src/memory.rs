//! In-memory implementation of the MetadataStore trait.
//!
//! This is primarily for testing. It keeps canonical bytes in a map with no
//! persistence.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, warn};

use stakedag_core::{BlockHash, BlockMetadata};

use crate::error::{Result, StoreError};
use crate::traits::{InsertResult, MetadataStore};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<HashMap<BlockHash, Bytes>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> Result<usize> {
        Ok(self.inner.read().map_err(|_| StoreError::LockPoisoned)?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn put_metadata(&self, meta: &BlockMetadata) -> Result<InsertResult> {
        let canonical = Bytes::from(meta.to_bytes());
        let hash = *meta.block_hash();

        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;

        if let Some(existing) = inner.get(&hash) {
            if *existing == canonical {
                return Ok(InsertResult::AlreadyExists);
            }
            warn!(block = %hash, "conflicting metadata rejected");
            return Err(StoreError::Conflict(hash));
        }

        debug!(block = %hash, rank = meta.rank(), "storing metadata");
        inner.insert(hash, canonical);
        Ok(InsertResult::Inserted)
    }

    async fn get_metadata(&self, hash: &BlockHash) -> Result<Option<BlockMetadata>> {
        let bytes = self.get_metadata_bytes(hash).await?;
        match bytes {
            Some(b) => Ok(Some(BlockMetadata::from_bytes(&b)?)),
            None => Ok(None),
        }
    }

    async fn get_metadata_bytes(&self, hash: &BlockHash) -> Result<Option<Bytes>> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner.get(hash).cloned())
    }

    async fn has_metadata(&self, hash: &BlockHash) -> Result<bool> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner.contains_key(hash))
    }

    async fn list_metadata(&self) -> Result<Vec<BlockHash>> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner.keys().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MetadataStoreExt;
    use stakedag_core::{Block, BlockBuilder, Ed25519PublicKey, Keypair, ValidationError};

    fn validator(seed: u8) -> Ed25519PublicKey {
        Keypair::from_seed(&[seed; 32]).public_key()
    }

    fn genesis() -> Block {
        BlockBuilder::new(validator(1), 0)
            .bond(validator(1), 100)
            .bond(validator(2), 50)
            .build()
    }

    fn child(parent: &Block, seq: u32, ts: i64) -> Block {
        BlockBuilder::new(validator(1), seq)
            .timestamp(ts)
            .parent(parent.block_hash)
            .bond(validator(1), 100)
            .bond(validator(2), 50)
            .build()
    }

    #[tokio::test]
    async fn test_insert_chain_and_get() {
        let store = MemoryStore::new();
        let g = genesis();
        let b1 = child(&g, 1, 1);
        let b2 = child(&b1, 2, 2);

        let m0 = store.insert_block(&g).await.unwrap();
        let m1 = store.insert_block(&b1).await.unwrap();
        let m2 = store.insert_block(&b2).await.unwrap();

        assert_eq!(m0.rank(), 0);
        assert_eq!(m1.rank(), 1);
        assert_eq!(m2.rank(), 2);
        assert_eq!(store.get_metadata(&b2.block_hash).await.unwrap(), Some(m2));
        assert_eq!(store.len().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_stored_bytes_are_canonical() {
        let store = MemoryStore::new();
        let meta = store.insert_block(&genesis()).await.unwrap();

        let bytes = store.get_metadata_bytes(meta.block_hash()).await.unwrap().unwrap();
        assert_eq!(bytes.as_ref(), meta.to_bytes().as_slice());
    }

    #[tokio::test]
    async fn test_idempotent_insert() {
        let store = MemoryStore::new();
        let meta = store.insert_block(&genesis()).await.unwrap();

        let result = store.put_metadata(&meta).await.unwrap();
        assert_eq!(result, InsertResult::AlreadyExists);
    }

    #[tokio::test]
    async fn test_store_block_reports_existing() {
        let store = MemoryStore::new();
        let g = genesis();

        let (first, result) = store.store_block(&g).await.unwrap();
        assert_eq!(result, InsertResult::Inserted);
        let (second, result) = store.store_block(&g).await.unwrap();
        assert_eq!(result, InsertResult::AlreadyExists);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_unknown_parent_rejected() {
        let store = MemoryStore::new();
        let orphan = child(&genesis(), 1, 1);

        let err = store.insert_block(&orphan).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::UnknownParent(_))
        ));
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_require_missing() {
        let store = MemoryStore::new();
        let missing = genesis().block_hash;
        assert!(!store.has_metadata(&missing).await.unwrap());
        assert!(matches!(
            store.require_metadata(&missing).await,
            Err(StoreError::NotFound(h)) if h == missing
        ));
    }

    #[tokio::test]
    async fn test_ordered_metadata() {
        let store = MemoryStore::new();
        let g = genesis();
        let a = child(&g, 1, 10);
        let b = child(&g, 1, 20);
        let tip = BlockBuilder::new(validator(2), 1)
            .parent(a.block_hash)
            .parent(b.block_hash)
            .bond(validator(1), 100)
            .build();

        for block in [&g, &a, &b, &tip] {
            store.insert_block(block).await.unwrap();
        }

        let ordered = store.ordered_metadata().await.unwrap();
        let ranks: Vec<u64> = ordered.iter().map(|m| m.rank()).collect();
        assert_eq!(ranks, vec![0, 1, 1, 2]);
        assert!(ordered[1].block_hash() < ordered[2].block_hash());
        assert_eq!(ordered[3].block_hash(), &tip.block_hash);
    }

    proptest::proptest! {
        #[test]
        fn prop_chain_ranks_follow_height(stakes in proptest::collection::vec(1i64..1_000, 1..16)) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let store = MemoryStore::new();
                let mut parent = store.insert_block(&genesis()).await.unwrap();
                for (i, stake) in stakes.iter().enumerate() {
                    let block = BlockBuilder::new(validator(1), i as u32 + 1)
                        .timestamp(i as i64)
                        .parent(*parent.block_hash())
                        .bond(validator(1), *stake)
                        .build();
                    let meta = store.insert_block(&block).await.unwrap();
                    assert_eq!(meta.rank(), parent.rank() + 1);
                    assert_eq!(meta.weight_of(&validator(1)), *stake as u64);
                    parent = meta;
                }
                assert_eq!(store.len().unwrap(), stakes.len() + 1);
            });
        }
    }
}
