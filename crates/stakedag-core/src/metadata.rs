//! BlockMetadata: the consensus-relevant snapshot of one DAG node.
//!
//! Metadata is extracted once from an assembled [`Block`] (producer path) or
//! decoded from canonical bytes (storage path), and is immutable afterwards.
//!
//! ## Ordering
//!
//! Fork choice needs a deterministic sequencing of blocks: rank ascending,
//! ties broken by unsigned lexicographic comparison of the block hash.
//! `BlockMetadata` deliberately does not implement `Ord`; callers pick the
//! ordering explicitly through [`BlockMetadata::compare`], [`sort_by_rank`]
//! or the [`RankOrdered`] wrapper.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::block::{Block, Bond, Justification};
use crate::canonical::{decode_metadata, metadata_bytes};
use crate::crypto::Ed25519PublicKey;
use crate::error::{CoreError, ValidationError};
use crate::types::BlockHash;

/// Source of parent ranks during extraction.
pub trait RankLookup {
    /// The rank of an already-known block, if known.
    fn rank_of(&self, hash: &BlockHash) -> Option<u64>;
}

impl RankLookup for HashMap<BlockHash, u64> {
    fn rank_of(&self, hash: &BlockHash) -> Option<u64> {
        self.get(hash).copied()
    }
}

impl RankLookup for BTreeMap<BlockHash, u64> {
    fn rank_of(&self, hash: &BlockHash) -> Option<u64> {
        self.get(hash).copied()
    }
}

impl RankLookup for HashMap<BlockHash, BlockMetadata> {
    fn rank_of(&self, hash: &BlockHash) -> Option<u64> {
        self.get(hash).map(BlockMetadata::rank)
    }
}

impl RankLookup for [BlockMetadata] {
    fn rank_of(&self, hash: &BlockHash) -> Option<u64> {
        self.iter().find(|m| m.block_hash == *hash).map(BlockMetadata::rank)
    }
}

impl RankLookup for Vec<BlockMetadata> {
    fn rank_of(&self, hash: &BlockHash) -> Option<u64> {
        self.as_slice().rank_of(hash)
    }
}

/// Canonical, immutable snapshot of a block's consensus-relevant fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMetadata {
    block_hash: BlockHash,
    parents: Vec<BlockHash>,
    validator: Ed25519PublicKey,
    justifications: Vec<Justification>,
    weight_map: HashMap<Ed25519PublicKey, u64>,
    rank: u64,
    validator_block_seq_num: u32,
}

impl BlockMetadata {
    /// Extract metadata from an assembled block.
    ///
    /// Parent ranks come from `ranks`; every parent must be known. This does
    /// not check consensus rules, only the structural invariants of the
    /// metadata itself.
    pub fn from_block<L>(block: &Block, ranks: &L) -> Result<Self, ValidationError>
    where
        L: RankLookup + ?Sized,
    {
        let header = &block.header;
        check_unique_parents(&header.parent_hashes)?;
        check_unique_justifications(&header.justifications)?;

        let genesis = header.parent_hashes.is_empty();
        let weight_map = weight_map_from_bonds(&block.body.bonds)?;
        let total = total_weight(&weight_map)?;
        if !genesis && total == 0 {
            return Err(ValidationError::InconsistentWeightMap(
                "non-genesis block has zero total stake".into(),
            ));
        }

        let mut max_parent_rank: Option<u64> = None;
        for parent in &header.parent_hashes {
            let rank = ranks
                .rank_of(parent)
                .ok_or(ValidationError::UnknownParent(*parent))?;
            max_parent_rank = Some(max_parent_rank.map_or(rank, |m| m.max(rank)));
        }
        let rank = match max_parent_rank {
            None => 0,
            Some(max) => max
                .checked_add(1)
                .ok_or(ValidationError::RankOverflow(block.block_hash))?,
        };

        Ok(Self {
            block_hash: block.block_hash,
            parents: header.parent_hashes.clone(),
            validator: header.validator,
            justifications: header.justifications.clone(),
            weight_map,
            rank,
            validator_block_seq_num: header.validator_block_seq_num,
        })
    }

    /// Assemble metadata from decoded fields. The codec checks structure
    /// before and after calling this.
    pub(crate) fn from_parts(
        block_hash: BlockHash,
        parents: Vec<BlockHash>,
        validator: Ed25519PublicKey,
        justifications: Vec<Justification>,
        weight_map: HashMap<Ed25519PublicKey, u64>,
        rank: u64,
        validator_block_seq_num: u32,
    ) -> Self {
        Self {
            block_hash,
            parents,
            validator,
            justifications,
            weight_map,
            rank,
            validator_block_seq_num,
        }
    }

    /// Encode to canonical bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        metadata_bytes(self)
    }

    /// Decode from canonical bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        decode_metadata(bytes)
    }

    /// The explicit total order: rank, then block hash bytes.
    pub fn compare(&self, other: &Self) -> Ordering {
        self.rank
            .cmp(&other.rank)
            .then_with(|| self.block_hash.cmp(&other.block_hash))
    }

    pub fn block_hash(&self) -> &BlockHash {
        &self.block_hash
    }

    pub fn parents(&self) -> &[BlockHash] {
        &self.parents
    }

    pub fn validator(&self) -> &Ed25519PublicKey {
        &self.validator
    }

    pub fn justifications(&self) -> &[Justification] {
        &self.justifications
    }

    pub fn weight_map(&self) -> &HashMap<Ed25519PublicKey, u64> {
        &self.weight_map
    }

    pub fn rank(&self) -> u64 {
        self.rank
    }

    pub fn validator_block_seq_num(&self) -> u32 {
        self.validator_block_seq_num
    }

    pub fn is_genesis(&self) -> bool {
        self.parents.is_empty()
    }

    /// Stake of a single validator (0 if unbonded).
    pub fn weight_of(&self, validator: &Ed25519PublicKey) -> u64 {
        self.weight_map.get(validator).copied().unwrap_or(0)
    }

    /// Sum of all stakes. Cannot overflow: checked at construction.
    pub fn total_weight(&self) -> u64 {
        self.weight_map.values().sum()
    }

    /// The weight map as a list sorted by validator bytes.
    pub fn sorted_weights(&self) -> Vec<(Ed25519PublicKey, u64)> {
        let mut weights: Vec<_> = self.weight_map.iter().map(|(k, v)| (*k, *v)).collect();
        weights.sort_by(|a, b| a.0.cmp(&b.0));
        weights
    }
}

/// Free-function form of [`BlockMetadata::compare`].
pub fn compare(a: &BlockMetadata, b: &BlockMetadata) -> Ordering {
    a.compare(b)
}

/// Sort in place by rank, then block hash.
pub fn sort_by_rank(items: &mut [BlockMetadata]) {
    items.sort_by(compare);
}

/// Wrapper that orders metadata by rank then hash, for ordered containers.
///
/// Works over owned values, references, and shared pointers.
#[derive(Debug, Clone)]
pub struct RankOrdered<M>(pub M);

impl<M: Borrow<BlockMetadata>> RankOrdered<M> {
    pub fn into_inner(self) -> M {
        self.0
    }
}

impl<M: Borrow<BlockMetadata>> PartialEq for RankOrdered<M> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<M: Borrow<BlockMetadata>> Eq for RankOrdered<M> {}

impl<M: Borrow<BlockMetadata>> PartialOrd for RankOrdered<M> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<M: Borrow<BlockMetadata>> Ord for RankOrdered<M> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.borrow().compare(other.0.borrow())
    }
}

pub(crate) fn check_unique_parents(parents: &[BlockHash]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(parents.len());
    for parent in parents {
        if !seen.insert(parent) {
            return Err(ValidationError::DuplicateParent(*parent));
        }
    }
    Ok(())
}

pub(crate) fn check_unique_justifications(
    justifications: &[Justification],
) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(justifications.len());
    for j in justifications {
        if !seen.insert(j.validator) {
            return Err(ValidationError::DuplicateJustificationValidator(j.validator));
        }
    }
    Ok(())
}

fn weight_map_from_bonds(
    bonds: &[Bond],
) -> Result<HashMap<Ed25519PublicKey, u64>, ValidationError> {
    let mut weights = HashMap::with_capacity(bonds.len());
    for bond in bonds {
        let stake = u64::try_from(bond.stake).map_err(|_| {
            ValidationError::InconsistentWeightMap(format!(
                "negative stake {} for validator {:?}",
                bond.stake, bond.validator
            ))
        })?;
        if weights.insert(bond.validator, stake).is_some() {
            return Err(ValidationError::InconsistentWeightMap(format!(
                "validator {:?} bonded twice",
                bond.validator
            )));
        }
    }
    Ok(weights)
}

pub(crate) fn total_weight(
    weights: &HashMap<Ed25519PublicKey, u64>,
) -> Result<u64, ValidationError> {
    weights.values().try_fold(0u64, |acc, w| {
        acc.checked_add(*w)
            .ok_or_else(|| ValidationError::InconsistentWeightMap("total stake overflows".into()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockBuilder;
    use crate::crypto::Keypair;
    use std::collections::BTreeSet;

    fn validator(seed: u8) -> Ed25519PublicKey {
        Keypair::from_seed(&[seed; 32]).public_key()
    }

    fn genesis() -> Block {
        BlockBuilder::new(validator(0), 0).bond(validator(1), 10).build()
    }

    fn metadata(rank: u64, hash_byte: u8) -> BlockMetadata {
        let mut weights = HashMap::new();
        weights.insert(validator(1), 1);
        BlockMetadata::from_parts(
            BlockHash::from_bytes([hash_byte; 32]),
            if rank == 0 { vec![] } else { vec![BlockHash::from_bytes([0xee; 32])] },
            validator(1),
            vec![],
            weights,
            rank,
            1,
        )
    }

    #[test]
    fn test_genesis_rank_zero() {
        let g = genesis();
        let meta = BlockMetadata::from_block(&g, &HashMap::<BlockHash, u64>::new()).unwrap();
        assert_eq!(meta.rank(), 0);
        assert!(meta.is_genesis());
        assert_eq!(meta.block_hash(), &g.block_hash);
        assert_eq!(meta.weight_of(&validator(1)), 10);
    }

    #[test]
    fn test_rank_is_one_plus_max_parent() {
        let p1 = BlockHash::from_bytes([1; 32]);
        let p2 = BlockHash::from_bytes([2; 32]);
        let p3 = BlockHash::from_bytes([3; 32]);
        let ranks: HashMap<BlockHash, u64> = [(p1, 2), (p2, 2), (p3, 5)].into_iter().collect();

        let block = BlockBuilder::new(validator(1), 4)
            .parent(p1)
            .parent(p2)
            .parent(p3)
            .bond(validator(1), 50)
            .build();

        let meta = BlockMetadata::from_block(&block, &ranks).unwrap();
        assert_eq!(meta.rank(), 6);
        assert_eq!(meta.parents(), &[p1, p2, p3]);
        assert_eq!(meta.validator_block_seq_num(), 4);
    }

    #[test]
    fn test_duplicate_parent_rejected() {
        let h1 = BlockHash::from_bytes([1; 32]);
        let ranks: HashMap<BlockHash, u64> = [(h1, 0)].into_iter().collect();
        let block = BlockBuilder::new(validator(1), 1)
            .parent(h1)
            .parent(h1)
            .bond(validator(1), 1)
            .build();

        let result = BlockMetadata::from_block(&block, &ranks);
        assert!(matches!(result, Err(ValidationError::DuplicateParent(h)) if h == h1));
    }

    #[test]
    fn test_duplicate_justification_rejected() {
        let g = genesis();
        let ranks: HashMap<BlockHash, u64> = [(g.block_hash, 0)].into_iter().collect();
        let block = BlockBuilder::new(validator(1), 1)
            .parent(g.block_hash)
            .justification(validator(2), g.block_hash)
            .justification(validator(2), BlockHash::from_bytes([9; 32]))
            .bond(validator(1), 1)
            .build();

        assert!(matches!(
            BlockMetadata::from_block(&block, &ranks),
            Err(ValidationError::DuplicateJustificationValidator(v)) if v == validator(2)
        ));
    }

    #[test]
    fn test_negative_stake_rejected() {
        let block = BlockBuilder::new(validator(1), 0).bond(validator(1), -1).build();
        assert!(matches!(
            BlockMetadata::from_block(&block, &HashMap::<BlockHash, u64>::new()),
            Err(ValidationError::InconsistentWeightMap(_))
        ));
    }

    #[test]
    fn test_duplicate_bond_rejected() {
        let block = BlockBuilder::new(validator(1), 0)
            .bond(validator(1), 1)
            .bond(validator(1), 2)
            .build();
        assert!(matches!(
            BlockMetadata::from_block(&block, &HashMap::<BlockHash, u64>::new()),
            Err(ValidationError::InconsistentWeightMap(_))
        ));
    }

    #[test]
    fn test_overflowing_total_rejected() {
        let block = BlockBuilder::new(validator(1), 0)
            .bond(validator(1), i64::MAX)
            .bond(validator(2), i64::MAX)
            .bond(validator(3), i64::MAX)
            .build();
        assert!(matches!(
            BlockMetadata::from_block(&block, &HashMap::<BlockHash, u64>::new()),
            Err(ValidationError::InconsistentWeightMap(_))
        ));
    }

    #[test]
    fn test_zero_stake_non_genesis_rejected() {
        let g = genesis();
        let ranks: HashMap<BlockHash, u64> = [(g.block_hash, 0)].into_iter().collect();
        let block = BlockBuilder::new(validator(1), 1)
            .parent(g.block_hash)
            .bond(validator(1), 0)
            .build();
        assert!(matches!(
            BlockMetadata::from_block(&block, &ranks),
            Err(ValidationError::InconsistentWeightMap(_))
        ));
    }

    #[test]
    fn test_unknown_parent() {
        let missing = BlockHash::from_bytes([0x55; 32]);
        let block = BlockBuilder::new(validator(1), 1)
            .parent(missing)
            .bond(validator(1), 1)
            .build();
        assert!(matches!(
            BlockMetadata::from_block(&block, &HashMap::<BlockHash, u64>::new()),
            Err(ValidationError::UnknownParent(h)) if h == missing
        ));
    }

    #[test]
    fn test_slice_lookup() {
        let g = genesis();
        let g_meta = BlockMetadata::from_block(&g, &HashMap::<BlockHash, u64>::new()).unwrap();
        let known = vec![g_meta];
        let child = BlockBuilder::new(validator(1), 1)
            .parent(g.block_hash)
            .bond(validator(1), 3)
            .build();
        let meta = BlockMetadata::from_block(&child, known.as_slice()).unwrap();
        assert_eq!(meta.rank(), 1);
    }

    #[test]
    fn test_compare_rank_first() {
        let low_rank_high_hash = metadata(1, 0xff);
        let high_rank_low_hash = metadata(2, 0x00);
        assert_eq!(
            compare(&low_rank_high_hash, &high_rank_low_hash),
            Ordering::Less
        );
    }

    #[test]
    fn test_compare_hash_tiebreak() {
        let a = metadata(3, 0x10);
        let b = metadata(3, 0x20);
        assert_eq!(a.compare(&b), Ordering::Less);
        assert_eq!(b.compare(&a), Ordering::Greater);
        assert_eq!(a.compare(&a), Ordering::Equal);
    }

    #[test]
    fn test_sort_by_rank() {
        let mut items = vec![metadata(2, 1), metadata(0, 9), metadata(2, 0), metadata(1, 5)];
        sort_by_rank(&mut items);
        let keys: Vec<_> = items.iter().map(|m| (m.rank(), m.block_hash().0[0])).collect();
        assert_eq!(keys, vec![(0, 9), (1, 5), (2, 0), (2, 1)]);
    }

    #[test]
    fn test_rank_ordered_in_btree_set() {
        let items = [metadata(5, 1), metadata(1, 2), metadata(5, 0)];
        let set: BTreeSet<RankOrdered<&BlockMetadata>> = items.iter().map(RankOrdered).collect();
        let order: Vec<_> = set.iter().map(|r| (r.0.rank(), r.0.block_hash().0[0])).collect();
        assert_eq!(order, vec![(1, 2), (5, 0), (5, 1)]);
    }

    #[test]
    fn test_sorted_weights_and_total() {
        let block = BlockBuilder::new(validator(1), 0)
            .bond(validator(3), 30)
            .bond(validator(1), 10)
            .bond(validator(2), 20)
            .build();
        let meta = BlockMetadata::from_block(&block, &HashMap::<BlockHash, u64>::new()).unwrap();
        assert_eq!(meta.total_weight(), 60);
        let sorted = meta.sorted_weights();
        assert!(sorted.windows(2).all(|w| w[0].0 < w[1].0));
    }
}
