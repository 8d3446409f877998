//! Cryptographic primitives for StakeDAG.
//!
//! Wraps Ed25519 signing and Blake3 hashing with strong types. Everything here
//! is a pure function of its inputs: no key storage, no I/O.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Length of an Ed25519 private key (seed) in bytes.
pub const PRIVATE_KEY_LENGTH: usize = 32;

/// A 32-byte Blake3 hash.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Blake3Hash(pub [u8; 32]);

impl Blake3Hash {
    /// Compute the Blake3 hash of the given data.
    pub fn hash(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// The zero hash (sentinel value).
    pub const ZERO: Self = Self([0u8; 32]);
}

impl fmt::Debug for Blake3Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blake3({})", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Blake3Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Blake3Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// A 32-byte Ed25519 public key. Identifies validators and deploy signers.
///
/// Ordered by raw byte comparison; the canonical weight list relies on it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ed25519PublicKey(pub [u8; 32]);

impl Ed25519PublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    ///
    /// Non-hex input is an `InvalidKeyEncoding`; hex of the wrong length is
    /// `InvalidKeyMaterial`.
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let bytes = decode_key_hex(s)?;
        let arr: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            CoreError::InvalidKeyMaterial(format!(
                "public key must be 32 bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Verify a signature over a message.
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> Result<(), CoreError> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| CoreError::InvalidPublicKey)?;

        let sig = Signature::from_bytes(&signature.0);

        verifying_key
            .verify(message, &sig)
            .map_err(|_| CoreError::InvalidSignature)
    }
}

impl fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Pub({})", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Ed25519PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Ed25519PublicKey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// A 64-byte Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ed25519Signature(pub [u8; 64]);

impl Ed25519Signature {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Sig({}...)", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Ed25519Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 64]> for Ed25519Signature {
    fn from(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }
}

/// A keypair for signing deploys and blocks.
///
/// This wraps ed25519-dalek's SigningKey.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let signing_key = SigningKey::generate(&mut rng);
        Self { signing_key }
    }

    /// Create from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        Self { signing_key }
    }

    /// Create from raw private key bytes of unchecked length.
    pub fn from_private_key(bytes: &[u8]) -> Result<Self, CoreError> {
        let seed: [u8; PRIVATE_KEY_LENGTH] = bytes.try_into().map_err(|_| {
            CoreError::InvalidKeyMaterial(format!(
                "private key must be {} bytes, got {}",
                PRIVATE_KEY_LENGTH,
                bytes.len()
            ))
        })?;
        Ok(Self::from_seed(&seed))
    }

    /// Parse a hex-encoded private key.
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let bytes = decode_key_hex(s)?;
        Self::from_private_key(&bytes)
    }

    /// Get the public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        let sig = self.signing_key.sign(message);
        Ed25519Signature(sig.to_bytes())
    }

    /// Get the raw seed bytes (secret key material).
    pub fn seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({:?})", self.public_key())
    }
}

/// Hash arbitrary bytes.
pub fn hash(data: &[u8]) -> Blake3Hash {
    Blake3Hash::hash(data)
}

/// Sign a digest with the given keypair.
pub fn sign(digest: &[u8; 32], keypair: &Keypair) -> Ed25519Signature {
    keypair.sign(digest)
}

/// Check a signature over a digest. Malformed keys never verify.
pub fn verify(digest: &[u8; 32], signature: &Ed25519Signature, public_key: &Ed25519PublicKey) -> bool {
    public_key.verify(digest, signature).is_ok()
}

/// Derive the public key for raw private key bytes.
pub fn derive_public_key(private_key: &[u8]) -> Result<Ed25519PublicKey, CoreError> {
    Keypair::from_private_key(private_key).map(|kp| kp.public_key())
}

/// Decode key text, tolerating surrounding whitespace (key files end in a newline).
fn decode_key_hex(s: &str) -> Result<Vec<u8>, CoreError> {
    hex::decode(s.trim()).map_err(|e| CoreError::InvalidKeyEncoding(e.to_string()))
}
