//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::collections::HashMap;

use stakedag_core::{
    Block, BlockBuilder, BlockHash, BlockMetadata, Deploy, DeployBody, DeployHeader,
    Ed25519PublicKey, Keypair, ReadyDeploy, ValidationError,
};
use stakedag_store::MemoryStore;

/// Stake bonded for each fixture validator.
pub const DEFAULT_STAKE: i64 = 100;

/// A test fixture with a keypair and memory store.
pub struct TestFixture {
    pub keypair: Keypair,
    pub store: MemoryStore,
}

impl TestFixture {
    /// Create a new test fixture with a random keypair.
    pub fn new() -> Self {
        Self {
            keypair: Keypair::generate(),
            store: MemoryStore::new(),
        }
    }

    /// Create with a deterministic keypair from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self {
            keypair: Keypair::from_seed(&seed),
            store: MemoryStore::new(),
        }
    }

    /// Get the keypair's public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        self.keypair.public_key()
    }

    /// The private key as hex, the way a key file holds it.
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.keypair.seed())
    }

    /// An unsigned deploy whose account is this fixture's public key.
    pub fn make_unsigned_deploy(&self, session: &[u8], nonce: u64) -> ReadyDeploy {
        self.commit(session, nonce).into()
    }

    /// A deploy signed by this fixture's key.
    pub fn make_signed_deploy(&self, session: &[u8], nonce: u64) -> ReadyDeploy {
        self.commit(session, nonce).sign(&self.keypair).into()
    }

    fn commit(&self, session: &[u8], nonce: u64) -> Deploy<stakedag_core::Committed> {
        let header = DeployHeader::new(self.public_key().0.to_vec(), FIXED_TIMESTAMP, nonce, 10);
        let body = DeployBody::new(session.to_vec(), b"standard-payment".to_vec());
        Deploy::new(header, body).with_hashes()
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create multiple test fixtures for multi-party tests.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            TestFixture::with_seed(seed)
        })
        .collect()
}

/// 2025-01-14T16:00:00Z, so fixture hashes do not depend on the clock.
pub const FIXED_TIMESTAMP: i64 = 1_736_870_400_000;

/// A growing DAG with a fixed validator set, tracking ranks in memory.
pub struct DagFixture {
    pub validators: Vec<Keypair>,
    pub blocks: Vec<Block>,
    metadata: HashMap<BlockHash, BlockMetadata>,
    seq_nums: Vec<u32>,
}

impl DagFixture {
    /// Create `validators` deterministic validators and a genesis block
    /// proposed by the first one.
    pub fn new(validators: usize) -> Self {
        let validators: Vec<Keypair> = (0..validators.max(1))
            .map(|i| Keypair::from_seed(&[i as u8 + 1; 32]))
            .collect();
        let mut fixture = Self {
            seq_nums: vec![0; validators.len()],
            validators,
            blocks: Vec::new(),
            metadata: HashMap::new(),
        };
        let genesis = fixture
            .bonded(BlockBuilder::new(fixture.validators[0].public_key(), 0))
            .timestamp(FIXED_TIMESTAMP)
            .build();
        fixture.push(genesis).expect("genesis is valid");
        fixture
    }

    pub fn genesis(&self) -> &Block {
        &self.blocks[0]
    }

    pub fn validator(&self, index: usize) -> Ed25519PublicKey {
        self.validators[index].public_key()
    }

    /// Propose a block from validator `proposer` on top of `parents`.
    ///
    /// Justifications cite the latest block of every other validator that
    /// appears among the parents.
    pub fn propose(
        &mut self,
        proposer: usize,
        parents: &[BlockHash],
    ) -> Result<BlockMetadata, ValidationError> {
        self.seq_nums[proposer] += 1;
        let mut builder = BlockBuilder::new(self.validator(proposer), self.seq_nums[proposer])
            .timestamp(FIXED_TIMESTAMP + self.blocks.len() as i64);
        let mut justified = Vec::new();
        for parent in parents {
            builder = builder.parent(*parent);
            if let Some(meta) = self.metadata.get(parent) {
                let v = *meta.validator();
                if v != self.validator(proposer) && !justified.contains(&v) {
                    justified.push(v);
                    builder = builder.justification(v, *parent);
                }
            }
        }
        let block = self.bonded(builder).build();
        self.push(block)
    }

    /// Extend the tip with a single-parent block.
    pub fn extend(&mut self, proposer: usize) -> Result<BlockMetadata, ValidationError> {
        let tip = self.tip().block_hash;
        self.propose(proposer, &[tip])
    }

    /// The most recently added block.
    pub fn tip(&self) -> &Block {
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn metadata(&self, hash: &BlockHash) -> Option<&BlockMetadata> {
        self.metadata.get(hash)
    }

    /// Metadata in insertion order.
    pub fn all_metadata(&self) -> Vec<BlockMetadata> {
        self.blocks
            .iter()
            .filter_map(|b| self.metadata.get(&b.block_hash).cloned())
            .collect()
    }

    fn bonded(&self, mut builder: BlockBuilder) -> BlockBuilder {
        for kp in &self.validators {
            builder = builder.bond(kp.public_key(), DEFAULT_STAKE);
        }
        builder
    }

    fn push(&mut self, block: Block) -> Result<BlockMetadata, ValidationError> {
        let meta = BlockMetadata::from_block(&block, &self.metadata)?;
        self.metadata.insert(block.block_hash, meta.clone());
        self.blocks.push(block);
        Ok(meta)
    }
}
