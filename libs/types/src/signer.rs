//! Ed25519 keypairs and signatures
//!
//! A keypair is the only way to produce a signature for a `Pubkey`.
//! Derived addresses have no keypair by construction.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::errors::ParseError;
use crate::pubkey::Pubkey;

/// Number of bytes in a signature.
pub const SIGNATURE_BYTES: usize = 64;

/// An Ed25519 signature over a message.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; SIGNATURE_BYTES]);

impl Signature {
    pub const fn new_from_array(bytes: [u8; SIGNATURE_BYTES]) -> Self {
        Self(bytes)
    }

    pub const fn to_bytes(self) -> [u8; SIGNATURE_BYTES] {
        self.0
    }

    /// Verify this signature for `message` under `pubkey`.
    ///
    /// Returns `false` for keys that are not valid curve points, which
    /// includes every derived address.
    pub fn verify(&self, pubkey: &Pubkey, message: &[u8]) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(pubkey.as_array()) else {
            return false;
        };
        let signature = ed25519_dalek::Signature::from_bytes(&self.0);
        verifying_key.verify(message, &signature).is_ok()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(self.0))
    }
}

impl FromStr for Signature {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| ParseError::InvalidHex(e.to_string()))?;
        let actual = bytes.len();
        let array: [u8; SIGNATURE_BYTES] =
            bytes.try_into().map_err(|_| ParseError::WrongLength {
                expected: SIGNATURE_BYTES,
                actual,
            })?;
        Ok(Self(array))
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// An Ed25519 keypair controlling one `Pubkey`.
pub struct Keypair(SigningKey);

impl Keypair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn new() -> Self {
        Self(SigningKey::generate(&mut OsRng))
    }

    /// Deterministic keypair from a 32-byte secret seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self(SigningKey::from_bytes(&seed))
    }

    /// The public identity controlled by this keypair.
    pub fn pubkey(&self) -> Pubkey {
        Pubkey::new_from_array(self.0.verifying_key().to_bytes())
    }

    /// Sign an arbitrary message.
    pub fn sign_message(&self, message: &[u8]) -> Signature {
        Signature(self.0.sign(message).to_bytes())
    }
}

impl Default for Keypair {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // never print the secret half
        f.debug_tuple("Keypair").field(&self.pubkey()).finish()
    }
}
