//! Canonical CBOR encoding for deterministic serialization.
//!
//! This module implements RFC 8949 Core Deterministic Encoding:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats, tags or booleans (timestamps are i64 milliseconds)
//!
//! The canonical encoding is what block hashes, deploy hashes and stored
//! metadata are computed over, so the same logical value must produce the same
//! bytes everywhere. In particular the weight map is written as a list of
//! `[validator, stake]` pairs sorted by validator bytes, whatever the
//! iteration order of the in-memory map.
//!
//! Decoding is strict. After parsing, the value is re-encoded and must match
//! the input byte for byte, so trailing bytes, unsorted keys or weights,
//! non-minimal integers and indefinite lengths are all rejected with
//! [`CoreError::MalformedEncoding`].

use ciborium::value::{Integer, Value};
use std::collections::HashMap;

use crate::block::{BlockBody, BlockHeader, Justification};
use crate::crypto::{Blake3Hash, Ed25519PublicKey, Ed25519Signature};
use crate::deploy::{Approval, DeployBody, DeployHeader, SignatureAlgorithm};
use crate::error::CoreError;
use crate::metadata::BlockMetadata;
use crate::types::{BlockHash, DeployHash};
use crate::validation::validate_metadata_structure;

/// Schema version written into encoded metadata.
pub const METADATA_VERSION: u8 = 0;

/// Schema version written into encoded deploy headers.
pub const DEPLOY_VERSION: u8 = 0;

/// Map field keys (integer keys for compact encoding).
///
/// Keys 0-23 encode as single bytes in CBOR.
mod keys {
    pub mod metadata {
        pub const VERSION: u64 = 0;
        pub const BLOCK_HASH: u64 = 1;
        pub const PARENTS: u64 = 2;
        pub const VALIDATOR: u64 = 3;
        pub const JUSTIFICATIONS: u64 = 4;
        pub const WEIGHTS: u64 = 5;
        pub const RANK: u64 = 6;
        pub const SEQ_NUM: u64 = 7;
    }

    pub mod block_header {
        pub const PARENT_HASHES: u64 = 0;
        pub const JUSTIFICATIONS: u64 = 1;
        pub const BODY_HASH: u64 = 2;
        pub const TIMESTAMP: u64 = 3;
        pub const PROTOCOL_VERSION: u64 = 4;
        pub const VALIDATOR: u64 = 5;
        pub const SEQ_NUM: u64 = 6;
    }

    pub mod block_body {
        pub const BONDS: u64 = 0;
        pub const DEPLOY_HASHES: u64 = 1;
    }

    pub mod deploy_header {
        pub const VERSION: u64 = 0;
        pub const ACCOUNT: u64 = 1;
        pub const TIMESTAMP: u64 = 2;
        pub const NONCE: u64 = 3;
        pub const GAS_PRICE: u64 = 4;
        pub const BODY_HASH: u64 = 5;
    }

    pub mod deploy_body {
        pub const SESSION: u64 = 0;
        pub const PAYMENT: u64 = 1;
    }

    pub mod deploy {
        pub const DEPLOY_HASH: u64 = 0;
        pub const HEADER: u64 = 1;
        pub const BODY: u64 = 2;
        pub const APPROVAL: u64 = 3;
    }

    pub mod approval {
        pub const SIGNER: u64 = 0;
        pub const ALGORITHM: u64 = 1;
        pub const SIGNATURE: u64 = 2;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Public encoders
// ─────────────────────────────────────────────────────────────────────────────

/// Encode block metadata to canonical bytes.
pub fn metadata_bytes(meta: &BlockMetadata) -> Vec<u8> {
    encode_cbor_value_canonical(&metadata_to_value(meta))
}

/// Encode a block header to canonical bytes (the block hash preimage).
pub fn block_header_bytes(header: &BlockHeader) -> Vec<u8> {
    use keys::block_header as k;

    let justifications = header.justifications.iter().map(justification_to_value).collect();
    let value = Cbor::Map(vec![
        entry(k::PARENT_HASHES, digest_array(&header.parent_hashes)),
        entry(k::JUSTIFICATIONS, Cbor::Array(justifications)),
        entry(k::BODY_HASH, bytes(&header.body_hash.0)),
        entry(k::TIMESTAMP, int(header.timestamp)),
        entry(k::PROTOCOL_VERSION, int(header.protocol_version)),
        entry(k::VALIDATOR, bytes(&header.validator.0)),
        entry(k::SEQ_NUM, int(header.validator_block_seq_num)),
    ]);
    encode_cbor_value_canonical(&value)
}

/// Encode a block body to canonical bytes (the body hash preimage).
///
/// Bonds are written in body order; the body is hashed as the producer built it.
pub fn block_body_bytes(body: &BlockBody) -> Vec<u8> {
    use keys::block_body as k;

    let bonds = body
        .bonds
        .iter()
        .map(|b| Cbor::Array(vec![bytes(&b.validator.0), int(b.stake)]))
        .collect();
    let value = Cbor::Map(vec![
        entry(k::BONDS, Cbor::Array(bonds)),
        entry(k::DEPLOY_HASHES, digest_array(&body.deploy_hashes)),
    ]);
    encode_cbor_value_canonical(&value)
}

/// Encode a deploy header to canonical bytes (the deploy hash preimage).
pub fn deploy_header_bytes(header: &DeployHeader) -> Vec<u8> {
    encode_cbor_value_canonical(&deploy_header_to_value(header))
}

/// Encode a deploy body to canonical bytes (the body hash preimage).
pub fn deploy_body_bytes(body: &DeployBody) -> Vec<u8> {
    encode_cbor_value_canonical(&deploy_body_to_value(body))
}

/// Encode a complete deploy to canonical bytes.
pub fn deploy_bytes(
    deploy_hash: &DeployHash,
    header: &DeployHeader,
    body: &DeployBody,
    approval: Option<&Approval>,
) -> Vec<u8> {
    use keys::deploy as k;

    let approval_value = match approval {
        Some(a) => approval_to_value(a),
        None => Cbor::Null,
    };
    let value = Cbor::Map(vec![
        entry(k::DEPLOY_HASH, bytes(&deploy_hash.0)),
        entry(k::HEADER, deploy_header_to_value(header)),
        entry(k::BODY, deploy_body_to_value(body)),
        entry(k::APPROVAL, approval_value),
    ]);
    encode_cbor_value_canonical(&value)
}

// ─────────────────────────────────────────────────────────────────────────────
// Value builders
// ─────────────────────────────────────────────────────────────────────────────

/// The subset of CBOR the canonical writer emits.
#[derive(Debug, Clone, PartialEq)]
enum Cbor {
    Int(Integer),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<Cbor>),
    Map(Vec<(Cbor, Cbor)>),
    Null,
}

fn entry(key: u64, value: Cbor) -> (Cbor, Cbor) {
    (Cbor::Int(key.into()), value)
}

fn int(n: impl Into<Integer>) -> Cbor {
    Cbor::Int(n.into())
}

fn bytes(b: &[u8]) -> Cbor {
    Cbor::Bytes(b.to_vec())
}

fn digest_array<D: AsRef<[u8]>>(items: &[D]) -> Cbor {
    Cbor::Array(items.iter().map(|d| bytes(d.as_ref())).collect())
}

fn justification_to_value(j: &Justification) -> Cbor {
    Cbor::Array(vec![bytes(&j.validator.0), bytes(&j.latest_block_hash.0)])
}

fn metadata_to_value(meta: &BlockMetadata) -> Cbor {
    use keys::metadata as k;

    let justifications = meta.justifications().iter().map(justification_to_value).collect();
    let weights = meta
        .sorted_weights()
        .into_iter()
        .map(|(validator, stake)| Cbor::Array(vec![bytes(&validator.0), int(stake)]))
        .collect();

    Cbor::Map(vec![
        entry(k::VERSION, int(METADATA_VERSION)),
        entry(k::BLOCK_HASH, bytes(&meta.block_hash().0)),
        entry(k::PARENTS, digest_array(meta.parents())),
        entry(k::VALIDATOR, bytes(&meta.validator().0)),
        entry(k::JUSTIFICATIONS, Cbor::Array(justifications)),
        entry(k::WEIGHTS, Cbor::Array(weights)),
        entry(k::RANK, int(meta.rank())),
        entry(k::SEQ_NUM, int(meta.validator_block_seq_num())),
    ])
}

fn deploy_header_to_value(header: &DeployHeader) -> Cbor {
    use keys::deploy_header as k;

    let body_hash = match header.body_hash() {
        Some(h) => bytes(&h.0),
        None => Cbor::Null,
    };
    Cbor::Map(vec![
        entry(k::VERSION, int(DEPLOY_VERSION)),
        entry(k::ACCOUNT, bytes(&header.account)),
        entry(k::TIMESTAMP, int(header.timestamp)),
        entry(k::NONCE, int(header.nonce)),
        entry(k::GAS_PRICE, int(header.gas_price)),
        entry(k::BODY_HASH, body_hash),
    ])
}

fn deploy_body_to_value(body: &DeployBody) -> Cbor {
    use keys::deploy_body as k;

    Cbor::Map(vec![
        entry(k::SESSION, bytes(&body.session)),
        entry(k::PAYMENT, bytes(&body.payment)),
    ])
}

fn approval_to_value(approval: &Approval) -> Cbor {
    use keys::approval as k;

    Cbor::Map(vec![
        entry(k::SIGNER, bytes(&approval.signer.0)),
        entry(k::ALGORITHM, Cbor::Text(approval.algorithm.as_str().to_string())),
        entry(k::SIGNATURE, bytes(&approval.signature.0)),
    ])
}

// ─────────────────────────────────────────────────────────────────────────────
// Canonical CBOR writer
// ─────────────────────────────────────────────────────────────────────────────

/// Encode a value to canonical bytes.
///
/// This function ensures:
/// - Map keys are sorted by encoded byte comparison
/// - Integers use smallest encoding
/// - Definite lengths only
fn encode_cbor_value_canonical(value: &Cbor) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value);
    buf
}

/// Recursively encode a CBOR value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Cbor) {
    match value {
        Cbor::Int(i) => encode_integer(buf, *i),
        Cbor::Bytes(b) => encode_bytes(buf, b),
        Cbor::Text(s) => encode_text(buf, s),
        Cbor::Array(arr) => encode_array(buf, arr),
        Cbor::Map(entries) => encode_map_canonical(buf, entries),
        Cbor::Null => buf.push(0xf6),
    }
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: Integer) {
    let n: i128 = i.into();

    if n >= 0 {
        // Major type 0: unsigned integer
        encode_uint(buf, 0, n as u64);
    } else {
        // Major type 1: -1 encodes as 0, -2 as 1, ...
        let abs = (-1 - n) as u64;
        encode_uint(buf, 1, abs);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a byte string (major type 2).
fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Encode a text string (major type 3).
fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

/// Encode an array (major type 4).
fn encode_array(buf: &mut Vec<u8>, arr: &[Cbor]) {
    encode_uint(buf, 4, arr.len() as u64);
    for item in arr {
        encode_value_to(buf, item);
    }
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Cbor, Cbor)]) {
    let mut key_value_pairs: Vec<(Vec<u8>, &Cbor)> = entries
        .iter()
        .map(|(k, v)| {
            let mut key_buf = Vec::new();
            encode_value_to(&mut key_buf, k);
            (key_buf, v)
        })
        .collect();

    key_value_pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, key_value_pairs.len() as u64);

    for (key_bytes, value) in key_value_pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decoding
// ─────────────────────────────────────────────────────────────────────────────

/// Fields of a decoded deploy, before commitment checks.
pub(crate) struct DeployParts {
    pub deploy_hash: DeployHash,
    pub header: DeployHeader,
    pub body: DeployBody,
    pub approval: Option<Approval>,
}

/// Decode block metadata from canonical bytes.
pub fn decode_metadata(bytes: &[u8]) -> Result<BlockMetadata, CoreError> {
    decode_canonical(bytes, "metadata", value_to_metadata, metadata_bytes)
}

/// Decode a deploy from canonical bytes. Hashes and signature are not checked here.
pub(crate) fn decode_deploy(bytes: &[u8]) -> Result<DeployParts, CoreError> {
    decode_canonical(bytes, "deploy", value_to_deploy_parts, |p| {
        deploy_bytes(&p.deploy_hash, &p.header, &p.body, p.approval.as_ref())
    })
}

/// Parse one CBOR item, convert it, and require that it re-encodes to the input.
fn decode_canonical<T>(
    bytes: &[u8],
    what: &str,
    parse: impl FnOnce(&Value) -> Result<T, CoreError>,
    encode: impl FnOnce(&T) -> Vec<u8>,
) -> Result<T, CoreError> {
    let value: Value = ciborium::from_reader(bytes)
        .map_err(|e| malformed(format!("{}: {}", what, e)))?;

    let decoded = parse(&value)?;

    if encode(&decoded) != bytes {
        return Err(malformed(format!(
            "{}: non-canonical encoding or trailing bytes",
            what
        )));
    }
    Ok(decoded)
}

fn malformed(msg: impl Into<String>) -> CoreError {
    CoreError::MalformedEncoding(msg.into())
}

/// Integer-keyed view over a decoded CBOR map.
struct Fields<'a> {
    what: &'static str,
    entries: &'a [(Value, Value)],
}

impl<'a> Fields<'a> {
    fn of(value: &'a Value, what: &'static str) -> Result<Self, CoreError> {
        match value {
            Value::Map(entries) => Ok(Self { what, entries }),
            _ => Err(malformed(format!("{}: expected map", what))),
        }
    }

    fn get(&self, key: u64) -> Option<&'a Value> {
        self.entries
            .iter()
            .find(|(k, _)| matches!(k, Value::Integer(i) if i128::from(*i) == i128::from(key)))
            .map(|(_, v)| v)
    }

    fn require(&self, key: u64, name: &str) -> Result<&'a Value, CoreError> {
        self.get(key)
            .ok_or_else(|| malformed(format!("{}: missing {}", self.what, name)))
    }

    fn uint(&self, key: u64, name: &str) -> Result<u64, CoreError> {
        as_uint(self.require(key, name)?, name)
    }

    fn int(&self, key: u64, name: &str) -> Result<i64, CoreError> {
        as_int(self.require(key, name)?, name)
    }

    fn bytes(&self, key: u64, name: &str) -> Result<&'a [u8], CoreError> {
        as_bytes(self.require(key, name)?, name)
    }

    fn digest(&self, key: u64, name: &str) -> Result<[u8; 32], CoreError> {
        as_digest(self.require(key, name)?, name)
    }

    fn array(&self, key: u64, name: &str) -> Result<&'a [Value], CoreError> {
        match self.require(key, name)? {
            Value::Array(items) => Ok(items),
            _ => Err(malformed(format!("{}: {} is not an array", self.what, name))),
        }
    }

    fn version(&self, key: u64, expected: u8) -> Result<(), CoreError> {
        let version = self.uint(key, "version")?;
        if version != u64::from(expected) {
            return Err(malformed(format!(
                "{}: unsupported version {}",
                self.what, version
            )));
        }
        Ok(())
    }
}

fn as_uint(value: &Value, name: &str) -> Result<u64, CoreError> {
    match value {
        Value::Integer(i) => u64::try_from(i128::from(*i))
            .map_err(|_| malformed(format!("{} out of range", name))),
        _ => Err(malformed(format!("{} is not an integer", name))),
    }
}

fn as_int(value: &Value, name: &str) -> Result<i64, CoreError> {
    match value {
        Value::Integer(i) => i64::try_from(i128::from(*i))
            .map_err(|_| malformed(format!("{} out of range", name))),
        _ => Err(malformed(format!("{} is not an integer", name))),
    }
}

fn as_u32(value: &Value, name: &str) -> Result<u32, CoreError> {
    u32::try_from(as_uint(value, name)?).map_err(|_| malformed(format!("{} out of range", name)))
}

fn as_bytes<'a>(value: &'a Value, name: &str) -> Result<&'a [u8], CoreError> {
    match value {
        Value::Bytes(b) => Ok(b),
        _ => Err(malformed(format!("{} is not a byte string", name))),
    }
}

fn as_digest(value: &Value, name: &str) -> Result<[u8; 32], CoreError> {
    let b = as_bytes(value, name)?;
    b.try_into()
        .map_err(|_| malformed(format!("{} must be 32 bytes, got {}", name, b.len())))
}

fn as_pair<'a>(value: &'a Value, name: &str) -> Result<(&'a Value, &'a Value), CoreError> {
    match value {
        Value::Array(items) if items.len() == 2 => Ok((&items[0], &items[1])),
        _ => Err(malformed(format!("{} is not a pair", name))),
    }
}

fn value_to_justification(value: &Value) -> Result<Justification, CoreError> {
    let (validator, latest) = as_pair(value, "justification")?;
    Ok(Justification::new(
        Ed25519PublicKey(as_digest(validator, "justification validator")?),
        BlockHash(as_digest(latest, "justification block hash")?),
    ))
}

fn value_to_metadata(value: &Value) -> Result<BlockMetadata, CoreError> {
    use keys::metadata as k;

    let fields = Fields::of(value, "metadata")?;
    fields.version(k::VERSION, METADATA_VERSION)?;

    let block_hash = BlockHash(fields.digest(k::BLOCK_HASH, "block_hash")?);

    let parents = fields
        .array(k::PARENTS, "parents")?
        .iter()
        .map(|v| as_digest(v, "parent").map(BlockHash))
        .collect::<Result<Vec<_>, _>>()?;

    let validator = Ed25519PublicKey(fields.digest(k::VALIDATOR, "validator")?);

    let justifications = fields
        .array(k::JUSTIFICATIONS, "justifications")?
        .iter()
        .map(value_to_justification)
        .collect::<Result<Vec<_>, _>>()?;

    let weight_items = fields.array(k::WEIGHTS, "weights")?;
    let mut weight_map = HashMap::with_capacity(weight_items.len());
    for item in weight_items {
        let (v, stake) = as_pair(item, "weight")?;
        let validator = Ed25519PublicKey(as_digest(v, "weight validator")?);
        let stake = as_uint(stake, "stake")?;
        if weight_map.insert(validator, stake).is_some() {
            return Err(malformed(format!("duplicate weight for {:?}", validator)));
        }
    }

    let rank = fields.uint(k::RANK, "rank")?;
    let seq_num = as_u32(fields.require(k::SEQ_NUM, "validator_block_seq_num")?, "validator_block_seq_num")?;

    let meta = BlockMetadata::from_parts(
        block_hash,
        parents,
        validator,
        justifications,
        weight_map,
        rank,
        seq_num,
    );
    validate_metadata_structure(&meta).map_err(|e| malformed(e.to_string()))?;
    Ok(meta)
}

fn value_to_deploy_header(value: &Value) -> Result<DeployHeader, CoreError> {
    use keys::deploy_header as k;

    let fields = Fields::of(value, "deploy header")?;
    fields.version(k::VERSION, DEPLOY_VERSION)?;

    let body_hash = match fields.require(k::BODY_HASH, "body_hash")? {
        Value::Null => None,
        v => Some(Blake3Hash(as_digest(v, "body_hash")?)),
    };

    Ok(DeployHeader::new(
        fields.bytes(k::ACCOUNT, "account")?.to_vec(),
        fields.int(k::TIMESTAMP, "timestamp")?,
        fields.uint(k::NONCE, "nonce")?,
        fields.uint(k::GAS_PRICE, "gas_price")?,
    )
    .with_body_hash(body_hash))
}

fn value_to_deploy_body(value: &Value) -> Result<DeployBody, CoreError> {
    use keys::deploy_body as k;

    let fields = Fields::of(value, "deploy body")?;
    Ok(DeployBody::new(
        fields.bytes(k::SESSION, "session")?.to_vec(),
        fields.bytes(k::PAYMENT, "payment")?.to_vec(),
    ))
}

fn value_to_approval(value: &Value) -> Result<Approval, CoreError> {
    use keys::approval as k;

    let fields = Fields::of(value, "approval")?;
    let algorithm = match fields.require(k::ALGORITHM, "algorithm")? {
        Value::Text(tag) => SignatureAlgorithm::from_tag(tag)
            .ok_or_else(|| malformed(format!("unknown signature algorithm {:?}", tag)))?,
        _ => return Err(malformed("algorithm is not text")),
    };
    let sig = fields.bytes(k::SIGNATURE, "signature")?;
    let sig: [u8; 64] = sig
        .try_into()
        .map_err(|_| malformed(format!("signature must be 64 bytes, got {}", sig.len())))?;

    Ok(Approval {
        signer: Ed25519PublicKey(fields.digest(k::SIGNER, "signer")?),
        algorithm,
        signature: Ed25519Signature(sig),
    })
}

fn value_to_deploy_parts(value: &Value) -> Result<DeployParts, CoreError> {
    use keys::deploy as k;

    let fields = Fields::of(value, "deploy")?;
    let approval = match fields.require(k::APPROVAL, "approval")? {
        Value::Null => None,
        v => Some(value_to_approval(v)?),
    };

    Ok(DeployParts {
        deploy_hash: DeployHash(fields.digest(k::DEPLOY_HASH, "deploy_hash")?),
        header: value_to_deploy_header(fields.require(k::HEADER, "header")?)?,
        body: value_to_deploy_body(fields.require(k::BODY, "body")?)?,
        approval,
    })
}
