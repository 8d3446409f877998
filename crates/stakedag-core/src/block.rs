//! Block: the fully assembled unit that metadata is extracted from.
//!
//! Only the header fields the metadata model needs are carried here. Execution
//! results and deploy payloads live elsewhere; the body only lists deploy
//! hashes and the active bonds.

use serde::{Deserialize, Serialize};

use crate::canonical::{block_body_bytes, block_header_bytes};
use crate::crypto::{Blake3Hash, Ed25519PublicKey};
use crate::types::{BlockHash, DeployHash};

/// The current block protocol version.
pub const PROTOCOL_VERSION: u32 = 1;

/// A validator's stake as recorded in the block body.
///
/// Stake is signed so that a corrupted or hostile body can be represented
/// and rejected during metadata extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bond {
    pub validator: Ed25519PublicKey,
    pub stake: i64,
}

impl Bond {
    pub fn new(validator: Ed25519PublicKey, stake: i64) -> Self {
        Self { validator, stake }
    }
}

/// The latest block the proposer has seen from another validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Justification {
    pub validator: Ed25519PublicKey,
    pub latest_block_hash: BlockHash,
}

impl Justification {
    pub fn new(validator: Ed25519PublicKey, latest_block_hash: BlockHash) -> Self {
        Self {
            validator,
            latest_block_hash,
        }
    }
}

/// The block header. Its canonical bytes are what the block hash commits to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Immediate DAG predecessors (empty for genesis).
    pub parent_hashes: Vec<BlockHash>,

    /// Latest-seen block per validator, in the proposer's order.
    pub justifications: Vec<Justification>,

    /// Blake3 hash of the canonical body bytes.
    pub body_hash: Blake3Hash,

    /// Proposer-claimed timestamp (Unix milliseconds). Untrusted.
    pub timestamp: i64,

    pub protocol_version: u32,

    /// The proposer.
    pub validator: Ed25519PublicKey,

    /// 1-based position among the proposer's own blocks (0 for genesis).
    pub validator_block_seq_num: u32,
}

/// The block body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockBody {
    /// Active bonds at this block.
    pub bonds: Vec<Bond>,

    /// Deploys included in this block.
    pub deploy_hashes: Vec<DeployHash>,
}

impl BlockBody {
    /// Blake3 hash of the canonical body bytes.
    pub fn compute_hash(&self) -> Blake3Hash {
        Blake3Hash::hash(&block_body_bytes(self))
    }
}

/// A complete block: hash, header and body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub block_hash: BlockHash,
    pub header: BlockHeader,
    pub body: BlockBody,
}

impl Block {
    /// Assemble a block, committing the header to the body and hashing the header.
    pub fn new(mut header: BlockHeader, body: BlockBody) -> Self {
        header.body_hash = body.compute_hash();
        let block_hash = compute_block_hash(&header);
        Self {
            block_hash,
            header,
            body,
        }
    }

    /// Check if this block has no parents.
    pub fn is_genesis(&self) -> bool {
        self.header.parent_hashes.is_empty()
    }

    /// Check that the stored hashes match the header and body contents.
    pub fn hashes_match(&self) -> bool {
        self.header.body_hash == self.body.compute_hash()
            && self.block_hash == compute_block_hash(&self.header)
    }
}

/// Hash of the canonical header bytes.
pub fn compute_block_hash(header: &BlockHeader) -> BlockHash {
    BlockHash::from(Blake3Hash::hash(&block_header_bytes(header)))
}

/// Builder for assembling blocks.
pub struct BlockBuilder {
    validator: Ed25519PublicKey,
    validator_block_seq_num: u32,
    timestamp: i64,
    parent_hashes: Vec<BlockHash>,
    justifications: Vec<Justification>,
    bonds: Vec<Bond>,
    deploy_hashes: Vec<DeployHash>,
}

impl BlockBuilder {
    /// Start building a block proposed by `validator`.
    pub fn new(validator: Ed25519PublicKey, validator_block_seq_num: u32) -> Self {
        Self {
            validator,
            validator_block_seq_num,
            timestamp: 0,
            parent_hashes: Vec::new(),
            justifications: Vec::new(),
            bonds: Vec::new(),
            deploy_hashes: Vec::new(),
        }
    }

    pub fn timestamp(mut self, ts: i64) -> Self {
        self.timestamp = ts;
        self
    }

    pub fn parent(mut self, parent: BlockHash) -> Self {
        self.parent_hashes.push(parent);
        self
    }

    pub fn justification(mut self, validator: Ed25519PublicKey, latest: BlockHash) -> Self {
        self.justifications.push(Justification::new(validator, latest));
        self
    }

    pub fn bond(mut self, validator: Ed25519PublicKey, stake: i64) -> Self {
        self.bonds.push(Bond::new(validator, stake));
        self
    }

    pub fn deploy(mut self, deploy_hash: DeployHash) -> Self {
        self.deploy_hashes.push(deploy_hash);
        self
    }

    /// Hash and assemble the block.
    pub fn build(self) -> Block {
        let header = BlockHeader {
            parent_hashes: self.parent_hashes,
            justifications: self.justifications,
            body_hash: Blake3Hash::ZERO,
            timestamp: self.timestamp,
            protocol_version: PROTOCOL_VERSION,
            validator: self.validator,
            validator_block_seq_num: self.validator_block_seq_num,
        };
        let body = BlockBody {
            bonds: self.bonds,
            deploy_hashes: self.deploy_hashes,
        };
        Block::new(header, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;

    fn validator(seed: u8) -> Ed25519PublicKey {
        Keypair::from_seed(&[seed; 32]).public_key()
    }

    #[test]
    fn test_builder_sets_hashes() {
        let block = BlockBuilder::new(validator(1), 1)
            .timestamp(1_736_870_400_000)
            .parent(BlockHash::from_bytes([0xaa; 32]))
            .bond(validator(1), 100)
            .build();

        assert!(block.hashes_match());
        assert!(!block.is_genesis());
        assert_eq!(block.header.body_hash, block.body.compute_hash());
    }

    #[test]
    fn test_block_hash_deterministic() {
        let make = || {
            BlockBuilder::new(validator(2), 3)
                .timestamp(42)
                .bond(validator(2), 7)
                .build()
        };
        assert_eq!(make().block_hash, make().block_hash);
    }

    #[test]
    fn test_block_hash_commits_to_body() {
        let a = BlockBuilder::new(validator(2), 1).bond(validator(2), 7).build();
        let b = BlockBuilder::new(validator(2), 1).bond(validator(2), 8).build();
        assert_ne!(a.header.body_hash, b.header.body_hash);
        assert_ne!(a.block_hash, b.block_hash);
    }

    #[test]
    fn test_tampered_body_detected() {
        let mut block = BlockBuilder::new(validator(3), 1).bond(validator(3), 5).build();
        block.body.bonds[0].stake = 6;
        assert!(!block.hashes_match());
    }
}
