//! Account identities
//!
//! A `Pubkey` is a 32-byte address. It is either the public half of an
//! Ed25519 keypair, or a derived address that deliberately has no
//! corresponding private key. The all-zero key doubles as the id of the
//! system program, which owns every account that holds no program data.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::errors::ParseError;

/// Number of bytes in an address.
pub const PUBKEY_BYTES: usize = 32;

static UNIQUE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// A 32-byte account address.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pubkey([u8; PUBKEY_BYTES]);

impl Pubkey {
    /// Create from raw bytes.
    pub const fn new_from_array(bytes: [u8; PUBKEY_BYTES]) -> Self {
        Self(bytes)
    }

    /// Create a key that is unique within this process.
    ///
    /// Intended for tests and tooling that need throwaway identities
    /// (mints, programs) without generating a keypair.
    pub fn new_unique() -> Self {
        let n = UNIQUE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut bytes = [0u8; PUBKEY_BYTES];
        bytes[..8].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }

    /// Try to create from a byte slice.
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self, ParseError> {
        let array: [u8; PUBKEY_BYTES] =
            bytes.try_into().map_err(|_| ParseError::WrongLength {
                expected: PUBKEY_BYTES,
                actual: bytes.len(),
            })?;
        Ok(Self(array))
    }

    /// Raw bytes.
    pub const fn to_bytes(self) -> [u8; PUBKEY_BYTES] {
        self.0
    }

    /// Borrow the raw bytes.
    pub const fn as_array(&self) -> &[u8; PUBKEY_BYTES] {
        &self.0
    }
}

impl AsRef<[u8]> for Pubkey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; PUBKEY_BYTES]> for Pubkey {
    fn from(bytes: [u8; PUBKEY_BYTES]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({})", hex::encode(self.0))
    }
}

impl FromStr for Pubkey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| ParseError::InvalidHex(e.to_string()))?;
        Self::try_from_slice(&bytes)
    }
}

impl Serialize for Pubkey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Pubkey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
