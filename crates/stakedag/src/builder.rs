//! Deploy construction from raw client inputs.
//!
//! The account identity and signing key are picked from whatever key material
//! the caller supplied:
//!
//! | public key | private key | account            | signed |
//! |------------|-------------|--------------------|--------|
//! | given      | given       | given public key   | yes    |
//! | given      | absent      | given public key   | no     |
//! | absent     | given       | derived public key | yes    |
//! | absent     | absent      | fallback account   | no     |
//!
//! With an explicit public key and a private key, the approval's signer is the
//! key derived from the private key, which need not equal the account.

use bytes::Bytes;
use tracing::{debug, info};

use stakedag_core::{Deploy, DeployBody, DeployHeader, Ed25519PublicKey, Keypair, ReadyDeploy};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

/// Raw inputs for one deploy, as read by a CLI or file layer.
#[derive(Debug, Clone, Default)]
pub struct DeployRequest {
    pub session: Bytes,
    pub payment: Bytes,
    /// Hex-encoded 32-byte public key.
    pub public_key_hex: Option<String>,
    /// Hex-encoded 32-byte private key (Ed25519 seed).
    pub private_key_hex: Option<String>,
    /// Legacy account string, used only when no key is given.
    pub account: Option<String>,
    pub timestamp: i64,
    pub nonce: u64,
    /// Overrides [`ClientConfig::default_gas_price`].
    pub gas_price: Option<u64>,
}

impl DeployRequest {
    pub fn new(session: impl Into<Bytes>, payment: impl Into<Bytes>) -> Self {
        Self {
            session: session.into(),
            payment: payment.into(),
            ..Self::default()
        }
    }

    pub fn public_key(mut self, hex: impl Into<String>) -> Self {
        self.public_key_hex = Some(hex.into());
        self
    }

    pub fn private_key(mut self, hex: impl Into<String>) -> Self {
        self.private_key_hex = Some(hex.into());
        self
    }

    pub fn account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    pub fn timestamp(mut self, ts: i64) -> Self {
        self.timestamp = ts;
        self
    }

    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn gas_price(mut self, gas_price: u64) -> Self {
        self.gas_price = Some(gas_price);
        self
    }
}

/// Build a committed, and if possible signed, deploy from a request.
///
/// All key text is decoded before anything is hashed, so a bad key aborts
/// with `InvalidKeyEncoding` or `InvalidKeyMaterial` and no partial deploy.
pub fn build_deploy(request: DeployRequest, config: &ClientConfig) -> Result<ReadyDeploy> {
    let public_key = request
        .public_key_hex
        .as_deref()
        .map(Ed25519PublicKey::from_hex)
        .transpose()?;
    let keypair = request
        .private_key_hex
        .as_deref()
        .map(Keypair::from_hex)
        .transpose()?;

    let account = match (&public_key, &keypair) {
        (Some(pk), _) => Bytes::copy_from_slice(pk.as_bytes()),
        (None, Some(kp)) => Bytes::copy_from_slice(kp.public_key().as_bytes()),
        (None, None) => match request.account {
            Some(account) => Bytes::from(account.into_bytes()),
            None => return Err(ClientError::MissingIdentity),
        },
    };
    debug!(
        explicit_public_key = public_key.is_some(),
        private_key = keypair.is_some(),
        "resolved deploy account"
    );

    let gas_price = request.gas_price.unwrap_or(config.default_gas_price);
    let header = DeployHeader::new(account, request.timestamp, request.nonce, gas_price);
    let body = DeployBody::new(request.session, request.payment);
    let committed = Deploy::new(header, body).with_hashes();

    let ready = match keypair {
        Some(kp) => ReadyDeploy::from(committed.sign(&kp)),
        None => ReadyDeploy::from(committed),
    };
    info!(
        deploy_hash = %ready.deploy_hash(),
        signed = ready.is_signed(),
        "deploy built"
    );
    Ok(ready)
}
