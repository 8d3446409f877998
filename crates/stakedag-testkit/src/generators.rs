//! Proptest generators for property-based testing.

use std::collections::HashMap;

use proptest::prelude::*;

use stakedag_core::{
    Block, BlockBuilder, BlockHash, BlockMetadata, Deploy, DeployBody, DeployHash, DeployHeader,
    Ed25519PublicKey, Keypair, ReadyDeploy,
};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random Ed25519PublicKey.
pub fn public_key() -> impl Strategy<Value = Ed25519PublicKey> {
    keypair().prop_map(|kp| kp.public_key())
}

/// Generate a random BlockHash.
pub fn block_hash() -> impl Strategy<Value = BlockHash> {
    any::<[u8; 32]>().prop_map(BlockHash::from_bytes)
}

/// Generate a random DeployHash.
pub fn deploy_hash() -> impl Strategy<Value = DeployHash> {
    any::<[u8; 32]>().prop_map(DeployHash::from_bytes)
}

/// Generate a reasonable timestamp.
pub fn timestamp() -> impl Strategy<Value = i64> {
    0i64..=i64::MAX / 2
}

/// Generate opaque session or payment code of at most `max_len` bytes.
pub fn code(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Parameters for generating a deploy.
#[derive(Debug, Clone)]
pub struct DeployParams {
    /// Signing seed. `None` produces an unsigned deploy with a string account.
    pub seed: Option<[u8; 32]>,
    pub session: Vec<u8>,
    pub payment: Vec<u8>,
    pub timestamp: i64,
    pub nonce: u64,
    pub gas_price: u64,
}

impl Arbitrary for DeployParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            any::<Option<[u8; 32]>>(),
            code(256),
            code(256),
            0i64..=1_800_000_000_000i64,
            any::<u64>(),
            1u64..=1_000u64,
        )
            .prop_map(|(seed, session, payment, timestamp, nonce, gas_price)| DeployParams {
                seed,
                session,
                payment,
                timestamp,
                nonce,
                gas_price,
            })
            .boxed()
    }
}

/// Build a final deploy from parameters.
pub fn deploy_from_params(params: &DeployParams) -> ReadyDeploy {
    let keypair = params.seed.map(|seed| Keypair::from_seed(&seed));
    let account = match &keypair {
        Some(kp) => kp.public_key().0.to_vec(),
        None => b"proptest-account".to_vec(),
    };
    let header = DeployHeader::new(account, params.timestamp, params.nonce, params.gas_price);
    let body = DeployBody::new(params.session.clone(), params.payment.clone());
    let committed = Deploy::new(header, body).with_hashes();
    match keypair {
        Some(kp) => committed.sign(&kp).into(),
        None => committed.into(),
    }
}

/// Parameters for a random DAG.
///
/// Block `i` (for `i > 0`) picks its parents among blocks `0..i` from
/// `parent_picks`, so every DAG is acyclic and topologically ordered.
#[derive(Debug, Clone)]
pub struct DagParams {
    pub validator_seeds: Vec<u8>,
    pub stakes: Vec<u32>,
    pub parent_picks: Vec<Vec<prop::sample::Index>>,
}

impl Arbitrary for DagParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (1usize..=4, 1usize..=12)
            .prop_flat_map(|(validators, blocks)| {
                (
                    prop::collection::hash_set(any::<u8>(), validators)
                        .prop_map(|s| s.into_iter().collect::<Vec<_>>()),
                    prop::collection::vec(1u32..=1_000_000, validators),
                    prop::collection::vec(
                        prop::collection::vec(any::<prop::sample::Index>(), 1..=3),
                        blocks,
                    ),
                )
            })
            .prop_map(|(validator_seeds, stakes, parent_picks)| DagParams {
                stakes: stakes[..validator_seeds.len()].to_vec(),
                validator_seeds,
                parent_picks,
            })
            .boxed()
    }
}

/// Build the blocks of a random DAG in topological order, genesis first.
pub fn dag_from_params(params: &DagParams) -> Vec<Block> {
    let validators: Vec<Ed25519PublicKey> = params
        .validator_seeds
        .iter()
        .map(|seed| Keypair::from_seed(&[*seed; 32]).public_key())
        .collect();

    let with_bonds = |mut builder: BlockBuilder| {
        for (v, stake) in validators.iter().zip(&params.stakes) {
            builder = builder.bond(*v, i64::from(*stake));
        }
        builder
    };

    let mut blocks = vec![with_bonds(BlockBuilder::new(validators[0], 0)).build()];
    let mut seq_nums: HashMap<usize, u32> = HashMap::new();

    for (i, picks) in params.parent_picks.iter().enumerate() {
        let proposer = i % validators.len();
        let seq = seq_nums.entry(proposer).or_insert(0);
        *seq += 1;

        let mut parents: Vec<BlockHash> = Vec::new();
        for pick in picks {
            let hash = blocks[pick.index(blocks.len())].block_hash;
            if !parents.contains(&hash) {
                parents.push(hash);
            }
        }

        let mut builder = BlockBuilder::new(validators[proposer], *seq).timestamp(i as i64 + 1);
        for parent in parents {
            builder = builder.parent(parent);
        }
        blocks.push(with_bonds(builder).build());
    }
    blocks
}

/// Extract metadata for every block of a topologically ordered DAG.
///
/// Panics if the blocks are not valid; intended for generated DAGs.
pub fn metadata_for_dag(blocks: &[Block]) -> Vec<BlockMetadata> {
    let mut ranks: HashMap<BlockHash, u64> = HashMap::new();
    blocks
        .iter()
        .map(|block| {
            let meta = BlockMetadata::from_block(block, &ranks).expect("generated block is valid");
            ranks.insert(*meta.block_hash(), meta.rank());
            meta
        })
        .collect()
}
