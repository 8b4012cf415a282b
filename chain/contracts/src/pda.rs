//! Address Deriver: deterministic addresses with no private key
//!
//! An address is `SHA-256(seeds.. || program_id || "ProgramDerivedAddress")`,
//! accepted only if the 32 bytes do not decompress to an ed25519 point. A
//! point off the curve has no secret scalar, so no keypair can ever sign
//! for it; only the program named in the derivation can act on its behalf,
//! through a `PdaSigner` issued inside that program's handler.

use ed25519_dalek::VerifyingKey;
use escrow_types::pubkey::Pubkey;
use sha2::{Digest, Sha256};

use crate::errors::PdaError;

/// Maximum length of a single seed.
pub const MAX_SEED_LEN: usize = 32;

/// Maximum number of seeds, bump included.
pub const MAX_SEEDS: usize = 16;

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Whether `bytes` is a valid compressed ed25519 point.
pub fn is_on_curve(bytes: &[u8; 32]) -> bool {
    VerifyingKey::from_bytes(bytes).is_ok()
}

/// Derive the address for an exact seed list (bump included).
pub fn create_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> Result<Pubkey, PdaError> {
    if seeds.len() > MAX_SEEDS {
        return Err(PdaError::TooManySeeds { count: seeds.len() });
    }
    if let Some(seed) = seeds.iter().find(|s| s.len() > MAX_SEED_LEN) {
        return Err(PdaError::MaxSeedLengthExceeded { len: seed.len() });
    }

    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update(program_id.as_ref());
    hasher.update(PDA_MARKER);
    let hash: [u8; 32] = hasher.finalize().into();

    if is_on_curve(&hash) {
        return Err(PdaError::OnCurve);
    }
    Ok(Pubkey::new_from_array(hash))
}

/// Search bumps from 255 downward for the first off-curve address.
///
/// Returns the address and the bump that produced it. Callers persist the
/// bump so later derivations are a single hash.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &Pubkey,
) -> Result<(Pubkey, u8), PdaError> {
    // the bump occupies one seed slot
    if seeds.len() >= MAX_SEEDS {
        return Err(PdaError::TooManySeeds {
            count: seeds.len() + 1,
        });
    }

    for bump in (0..=u8::MAX).rev() {
        let bump_seed = [bump];
        let with_bump: Vec<&[u8]> = seeds
            .iter()
            .copied()
            .chain(std::iter::once(&bump_seed[..]))
            .collect();

        match create_program_address(&with_bump, program_id) {
            Ok(address) => return Ok((address, bump)),
            Err(PdaError::OnCurve) => continue,
            Err(err) => return Err(err),
        }
    }
    Err(PdaError::NoViableBump)
}
