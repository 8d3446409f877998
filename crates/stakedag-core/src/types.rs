//! Strong type definitions for StakeDAG.
//!
//! All identifiers are newtypes to prevent misuse at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::Blake3Hash;
use crate::error::CoreError;

macro_rules! digest_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub [u8; 32]);

        impl $name {
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
            pub fn from_hex(s: &str) -> Result<Self, CoreError> {
                let bytes =
                    hex::decode(s).map_err(|e| CoreError::MalformedEncoding(e.to_string()))?;
                Self::try_from(bytes.as_slice()).map_err(|_| {
                    CoreError::MalformedEncoding(format!(
                        "expected 32 bytes, got {}",
                        bytes.len()
                    ))
                })
            }

            /// The zero value (sentinel).
            pub const ZERO: Self = Self([0u8; 32]);
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), &self.to_hex()[..16])
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", &self.to_hex()[..16])
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl From<Blake3Hash> for $name {
            fn from(hash: Blake3Hash) -> Self {
                Self(hash.0)
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = std::array::TryFromSliceError;

            fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
                let arr: [u8; 32] = slice.try_into()?;
                Ok(Self(arr))
            }
        }
    };
}

digest_newtype!(
    /// A 32-byte block identifier: Blake3 of the canonical block header bytes.
    BlockHash
);

digest_newtype!(
    /// A 32-byte deploy identifier: Blake3 of the canonical deploy header bytes,
    /// taken after the header's body hash has been set.
    DeployHash
);
