//! Golden test vectors for deterministic verification.
//!
//! Metadata vectors pin the exact canonical bytes: every implementation must
//! decode them to the listed fields and re-encode them byte for byte. Deploy
//! vectors pin the inputs; their hashes must be stable across runs and the
//! result must pass validation.

use serde::Serialize;

use stakedag_core::{
    BlockHash, BlockMetadata, Deploy, DeployBody, DeployHeader, Ed25519PublicKey, Keypair,
    ReadyDeploy,
};

/// A golden metadata encoding.
#[derive(Debug, Clone, Serialize)]
pub struct MetadataVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Canonical bytes (hex).
    pub bytes_hex: &'static str,
    /// Fill byte of the block hash.
    pub block_hash_fill: u8,
    pub parent_fills: &'static [u8],
    pub validator_fill: u8,
    /// `(validator fill, stake)` in canonical (sorted) order.
    pub weights: &'static [(u8, u64)],
    pub rank: u64,
    pub validator_block_seq_num: u32,
}

/// Get all metadata vectors.
pub fn metadata_vectors() -> Vec<MetadataVector> {
    vec![
        MetadataVector {
            name: "genesis with a single bond",
            bytes_hex: "a80000015820111111111111111111111111111111111111111111111111111111111111111102800358200101010101010101010101010101010101010101010101010101010101010101048005818258200101010101010101010101010101010101010101010101010101010101010101186406000700",
            block_hash_fill: 0x11,
            parent_fills: &[],
            validator_fill: 0x01,
            weights: &[(0x01, 100)],
            rank: 0,
            validator_block_seq_num: 0,
        },
        MetadataVector {
            name: "two parents, weights given out of order",
            bytes_hex: "a80000015820222222222222222222222222222222222222222222222222222222222222222202825820aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa5820bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb0358200202020202020202020202020202020202020202020202020202020202020202048182582001010101010101010101010101010101010101010101010101010101010101015820aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa058282582001010101010101010101010101010101010101010101010101010101010101010a825820020202020202020202020202020202020202020202020202020202020202020219012c06060703",
            block_hash_fill: 0x22,
            parent_fills: &[0xaa, 0xbb],
            validator_fill: 0x02,
            weights: &[(0x01, 10), (0x02, 300)],
            rank: 6,
            validator_block_seq_num: 3,
        },
        MetadataVector {
            name: "wide integers and a zero stake",
            bytes_hex: "a8000001582033333333333333333333333333333333333333333333333333333333333333330281582022222222222222222222222222222222222222222222222222222222222222220358200303030303030303030303030303030303030303030303030303030303030303048282582002020202020202020202020202020202020202020202020202020202020202025820222222222222222222222222222222222222222222222222222222222222222282582001010101010101010101010101010101010101010101010101010101010101015820aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa058382582001010101010101010101010101010101010101010101010101010101010101010182582002020202020202020202020202020202020202020202020202020202020202020082582003030303030303030303030303030303030303030303030303030303030303031b00000100000000000607071a00011170",
            block_hash_fill: 0x33,
            parent_fills: &[0x22],
            validator_fill: 0x03,
            weights: &[(0x01, 1), (0x02, 0), (0x03, 1 << 40)],
            rank: 7,
            validator_block_seq_num: 70_000,
        },
    ]
}

/// Decode a vector and check every listed field.
pub fn check_metadata_vector(vector: &MetadataVector) -> Result<BlockMetadata, String> {
    let bytes = hex::decode(vector.bytes_hex).map_err(|e| format!("{}: {}", vector.name, e))?;
    let meta = BlockMetadata::from_bytes(&bytes).map_err(|e| format!("{}: {}", vector.name, e))?;

    let fill = |b: u8| [b; 32];
    let expect = |ok: bool, what: &str| {
        if ok {
            Ok(())
        } else {
            Err(format!("{}: {} mismatch", vector.name, what))
        }
    };

    expect(*meta.block_hash() == BlockHash(fill(vector.block_hash_fill)), "block_hash")?;
    let parents: Vec<BlockHash> = vector.parent_fills.iter().map(|b| BlockHash(fill(*b))).collect();
    expect(meta.parents() == parents.as_slice(), "parents")?;
    expect(*meta.validator() == Ed25519PublicKey(fill(vector.validator_fill)), "validator")?;
    let weights: Vec<(Ed25519PublicKey, u64)> = vector
        .weights
        .iter()
        .map(|(b, s)| (Ed25519PublicKey(fill(*b)), *s))
        .collect();
    expect(meta.sorted_weights() == weights, "weights")?;
    expect(meta.rank() == vector.rank, "rank")?;
    expect(
        meta.validator_block_seq_num() == vector.validator_block_seq_num,
        "validator_block_seq_num",
    )?;
    expect(meta.to_bytes() == bytes, "re-encoding")?;
    Ok(meta)
}

/// A deploy built from fixed inputs.
#[derive(Debug, Clone, Serialize)]
pub struct DeployVector {
    pub name: &'static str,
    /// Signing seed; `None` for an unsigned deploy with a string account.
    pub seed: Option<[u8; 32]>,
    pub account: &'static str,
    pub session: &'static [u8],
    pub payment: &'static [u8],
    pub timestamp: i64,
    pub nonce: u64,
    pub gas_price: u64,
}

/// Get all deploy vectors.
pub fn deploy_vectors() -> Vec<DeployVector> {
    vec![
        DeployVector {
            name: "signed transfer",
            seed: Some([0x42; 32]),
            account: "",
            session: b"transfer-to-account",
            payment: b"standard-payment",
            timestamp: 1_736_870_400_000,
            nonce: 1,
            gas_price: 10,
        },
        DeployVector {
            name: "unsigned legacy account",
            seed: None,
            account: "3030303030303030303030303030303030303030303030303030303030303030",
            session: b"",
            payment: b"",
            timestamp: 0,
            nonce: 0,
            gas_price: 1,
        },
        DeployVector {
            name: "large nonce",
            seed: Some([0x00; 32]),
            account: "",
            session: b"\x00asm\x01\x00\x00\x00",
            payment: b"\x00asm\x01\x00\x00\x00",
            timestamp: 1_736_870_401_000,
            nonce: u64::MAX,
            gas_price: 1_000,
        },
    ]
}

/// Build the deploy a vector describes.
pub fn generate_deploy_from_vector(vector: &DeployVector) -> ReadyDeploy {
    let keypair = vector.seed.map(|seed| Keypair::from_seed(&seed));
    let account = match &keypair {
        Some(kp) => kp.public_key().0.to_vec(),
        None => vector.account.as_bytes().to_vec(),
    };
    let header = DeployHeader::new(account, vector.timestamp, vector.nonce, vector.gas_price);
    let body = DeployBody::new(vector.session, vector.payment);
    let committed = Deploy::new(header, body).with_hashes();
    match keypair {
        Some(kp) => committed.sign(&kp).into(),
        None => committed.into(),
    }
}

/// Check every vector. Returns the first failure.
pub fn verify_all_vectors() -> Result<(), String> {
    for vector in metadata_vectors() {
        check_metadata_vector(&vector)?;
    }
    for vector in deploy_vectors() {
        let a = generate_deploy_from_vector(&vector);
        let b = generate_deploy_from_vector(&vector);
        if a != b {
            return Err(format!("{}: not deterministic", vector.name));
        }
        stakedag_core::validate_deploy(&a).map_err(|e| format!("{}: {}", vector.name, e))?;
        let decoded = ReadyDeploy::from_bytes(&a.to_bytes())
            .map_err(|e| format!("{}: {}", vector.name, e))?;
        if decoded != a {
            return Err(format!("{}: round trip changed the deploy", vector.name));
        }
    }
    Ok(())
}

/// All vectors as pretty JSON, for sharing with other implementations.
pub fn vectors_json() -> Result<String, serde_json::Error> {
    #[derive(Serialize)]
    struct All {
        metadata: Vec<MetadataVector>,
        deploys: Vec<DeployVector>,
    }
    serde_json::to_string_pretty(&All {
        metadata: metadata_vectors(),
        deploys: deploy_vectors(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_vectors_verify() {
        verify_all_vectors().unwrap();
    }

    #[test]
    fn test_vectors_json() {
        let json = vectors_json().unwrap();
        assert!(json.contains("genesis with a single bond"));
        assert!(json.contains("signed transfer"));
    }
}
