//! Deploy: a user-submitted unit of work, committed by hash and optionally signed.
//!
//! The commitment pipeline is a typestate:
//!
//! ```text
//! Deploy<Draft> --with_hashes--> Deploy<Committed> --sign--> Deploy<Signed>
//! ```
//!
//! A draft has no deploy hash and cannot be signed. A committed deploy's
//! header carries the body hash and its deploy hash is the hash of that
//! header. Transitions only move forward.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::canonical::{decode_deploy, deploy_body_bytes, deploy_bytes, deploy_header_bytes};
use crate::crypto::{self, Blake3Hash, Ed25519PublicKey, Ed25519Signature, Keypair};
use crate::error::ValidationError;
use crate::types::DeployHash;
use crate::validation::{validate_approval, validate_commitment};

/// The deploy header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployHeader {
    /// Proposer identity: public key bytes, or a legacy account string.
    pub account: Bytes,

    /// Client-claimed timestamp (Unix milliseconds).
    pub timestamp: i64,

    /// Replay-prevention counter.
    pub nonce: u64,

    pub gas_price: u64,

    body_hash: Option<Blake3Hash>,
}

impl DeployHeader {
    pub fn new(account: impl Into<Bytes>, timestamp: i64, nonce: u64, gas_price: u64) -> Self {
        Self {
            account: account.into(),
            timestamp,
            nonce,
            gas_price,
            body_hash: None,
        }
    }

    /// Hash of the body this header commits to. `None` until committed.
    pub fn body_hash(&self) -> Option<&Blake3Hash> {
        self.body_hash.as_ref()
    }

    pub(crate) fn with_body_hash(mut self, body_hash: Option<Blake3Hash>) -> Self {
        self.body_hash = body_hash;
        self
    }

    /// Blake3 hash of the canonical header bytes.
    pub fn compute_hash(&self) -> DeployHash {
        DeployHash::from(Blake3Hash::hash(&deploy_header_bytes(self)))
    }
}

/// Session and payment code. Opaque to this crate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployBody {
    pub session: Bytes,
    pub payment: Bytes,
}

impl DeployBody {
    pub fn new(session: impl Into<Bytes>, payment: impl Into<Bytes>) -> Self {
        Self {
            session: session.into(),
            payment: payment.into(),
        }
    }

    /// Blake3 hash of the canonical body bytes.
    pub fn compute_hash(&self) -> Blake3Hash {
        Blake3Hash::hash(&deploy_body_bytes(self))
    }
}

/// Signature scheme recorded next to a deploy signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    Ed25519,
}

impl SignatureAlgorithm {
    /// Wire tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ed25519 => "ed25519",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "ed25519" => Some(Self::Ed25519),
            _ => None,
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A signature over a deploy hash, with the signer's key and algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Approval {
    pub signer: Ed25519PublicKey,
    pub algorithm: SignatureAlgorithm,
    pub signature: Ed25519Signature,
}

impl Approval {
    /// Check the signature against `deploy_hash` and the declared signer.
    pub fn verify(&self, deploy_hash: &DeployHash) -> bool {
        match self.algorithm {
            SignatureAlgorithm::Ed25519 => {
                crypto::verify(deploy_hash.as_bytes(), &self.signature, &self.signer)
            }
        }
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Marker for the states of the commitment pipeline.
pub trait DeployState: sealed::Sealed {}

/// Header and body populated; nothing hashed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft;

/// Body hash set in the header; deploy hash computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed {
    deploy_hash: DeployHash,
}

/// Committed and carrying an approval over the deploy hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signed {
    deploy_hash: DeployHash,
    approval: Approval,
}

impl sealed::Sealed for Draft {}
impl sealed::Sealed for Committed {}
impl sealed::Sealed for Signed {}
impl DeployState for Draft {}
impl DeployState for Committed {}
impl DeployState for Signed {}

/// A deploy in pipeline state `S`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deploy<S: DeployState> {
    header: DeployHeader,
    body: DeployBody,
    state: S,
}

impl<S: DeployState> Deploy<S> {
    pub fn header(&self) -> &DeployHeader {
        &self.header
    }

    pub fn body(&self) -> &DeployBody {
        &self.body
    }
}

impl Deploy<Draft> {
    /// Start a deploy. Any body hash already present in `header` is discarded.
    pub fn new(header: DeployHeader, body: DeployBody) -> Self {
        Self {
            header: header.with_body_hash(None),
            body,
            state: Draft,
        }
    }

    /// Commit: hash the body into the header, then hash the header.
    pub fn with_hashes(self) -> Deploy<Committed> {
        commit(self.header, self.body)
    }
}

impl Deploy<Committed> {
    /// Recompute both hashes. Unchanged fields yield the same deploy hash.
    pub fn with_hashes(self) -> Deploy<Committed> {
        commit(self.header, self.body)
    }

    pub fn deploy_hash(&self) -> &DeployHash {
        &self.state.deploy_hash
    }

    /// Sign the deploy hash.
    pub fn sign(self, keypair: &Keypair) -> Deploy<Signed> {
        let signature = crypto::sign(self.state.deploy_hash.as_bytes(), keypair);
        let approval = Approval {
            signer: keypair.public_key(),
            algorithm: SignatureAlgorithm::Ed25519,
            signature,
        };
        Deploy {
            header: self.header,
            body: self.body,
            state: Signed {
                deploy_hash: self.state.deploy_hash,
                approval,
            },
        }
    }
}

impl Deploy<Signed> {
    pub fn deploy_hash(&self) -> &DeployHash {
        &self.state.deploy_hash
    }

    pub fn approval(&self) -> &Approval {
        &self.state.approval
    }

    /// Check the approval against the deploy hash.
    pub fn verify(&self) -> bool {
        self.state.approval.verify(&self.state.deploy_hash)
    }
}

fn commit(header: DeployHeader, body: DeployBody) -> Deploy<Committed> {
    let header = header.with_body_hash(Some(body.compute_hash()));
    let deploy_hash = header.compute_hash();
    Deploy {
        header,
        body,
        state: Committed { deploy_hash },
    }
}

/// A deploy in its final form, ready for submission or storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadyDeploy {
    Unsigned(Deploy<Committed>),
    Signed(Deploy<Signed>),
}

impl ReadyDeploy {
    pub fn deploy_hash(&self) -> &DeployHash {
        match self {
            Self::Unsigned(d) => d.deploy_hash(),
            Self::Signed(d) => d.deploy_hash(),
        }
    }

    pub fn header(&self) -> &DeployHeader {
        match self {
            Self::Unsigned(d) => d.header(),
            Self::Signed(d) => d.header(),
        }
    }

    pub fn body(&self) -> &DeployBody {
        match self {
            Self::Unsigned(d) => d.body(),
            Self::Signed(d) => d.body(),
        }
    }

    pub fn approval(&self) -> Option<&Approval> {
        match self {
            Self::Unsigned(_) => None,
            Self::Signed(d) => Some(d.approval()),
        }
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, Self::Signed(_))
    }

    /// Encode to canonical bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        deploy_bytes(self.deploy_hash(), self.header(), self.body(), self.approval())
    }

    /// Decode and re-verify the commitment and any approval.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ValidationError> {
        let parts = decode_deploy(bytes)?;
        validate_commitment(&parts.header, &parts.body, &parts.deploy_hash)?;
        let committed = Deploy {
            header: parts.header,
            body: parts.body,
            state: Committed {
                deploy_hash: parts.deploy_hash,
            },
        };
        match parts.approval {
            None => Ok(Self::Unsigned(committed)),
            Some(approval) => {
                validate_approval(&approval, &parts.deploy_hash)?;
                Ok(Self::Signed(Deploy {
                    header: committed.header,
                    body: committed.body,
                    state: Signed {
                        deploy_hash: parts.deploy_hash,
                        approval,
                    },
                }))
            }
        }
    }
}

impl From<Deploy<Committed>> for ReadyDeploy {
    fn from(deploy: Deploy<Committed>) -> Self {
        Self::Unsigned(deploy)
    }
}

impl From<Deploy<Signed>> for ReadyDeploy {
    fn from(deploy: Deploy<Signed>) -> Self {
        Self::Signed(deploy)
    }
}
