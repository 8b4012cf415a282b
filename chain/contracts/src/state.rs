//! Escrow Record: persistent state of one outstanding offer
//!
//! Byte layout (little-endian integers):
//! ```text
//! [tag: u8 = 1]
//! [maker: 32][mint_a: 32][mint_b: 32]
//! [receive_amount: u64][seed: u64]
//! [bump: u8]
//! ```
//! The record lives at `derive("escrow", maker, seed)` under the escrow
//! program id, so at most one record exists per `(maker, seed)`.

use escrow_types::pubkey::Pubkey;
use serde::{Deserialize, Serialize};

use crate::errors::{EscrowError, PdaError};
use crate::pda;

/// Namespace seed for record addresses.
pub const ESCROW_SEED: &[u8] = b"escrow";

/// One outstanding swap offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowRecord {
    pub maker: Pubkey,
    /// Asset deposited by the maker
    pub mint_a: Pubkey,
    /// Asset the maker wants in return
    pub mint_b: Pubkey,
    /// Units of `mint_b` required to take the offer
    pub receive_amount: u64,
    pub seed: u64,
    pub bump: u8,
}

impl EscrowRecord {
    pub const DISCRIMINATOR: u8 = 1;

    /// 1 (tag) + 32 * 3 (keys) + 8 (receive_amount) + 8 (seed) + 1 (bump)
    pub const LEN: usize = 1 + 32 * 3 + 8 + 8 + 1;

    /// Locate the record address and bump for `(maker, seed)`.
    pub fn find_address(
        maker: &Pubkey,
        seed: u64,
        program_id: &Pubkey,
    ) -> Result<(Pubkey, u8), PdaError> {
        pda::find_program_address(&[ESCROW_SEED, maker.as_ref(), &seed.to_le_bytes()], program_id)
    }

    /// Re-derive this record's address from its stored seeds and bump.
    pub fn address(&self, program_id: &Pubkey) -> Result<Pubkey, PdaError> {
        pda::create_program_address(
            &[
                ESCROW_SEED,
                self.maker.as_ref(),
                &self.seed.to_le_bytes(),
                &[self.bump],
            ],
            program_id,
        )
    }

    /// Serialize into a fresh buffer of exactly `LEN` bytes.
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::LEN);
        buf.push(Self::DISCRIMINATOR);
        buf.extend_from_slice(self.maker.as_ref());
        buf.extend_from_slice(self.mint_a.as_ref());
        buf.extend_from_slice(self.mint_b.as_ref());
        buf.extend_from_slice(&self.receive_amount.to_le_bytes());
        buf.extend_from_slice(&self.seed.to_le_bytes());
        buf.push(self.bump);
        buf
    }

    /// Serialize into an existing account data buffer.
    pub fn pack_into(&self, dst: &mut [u8]) -> Result<(), EscrowError> {
        if dst.len() != Self::LEN {
            return Err(EscrowError::InvalidAccountData);
        }
        dst.copy_from_slice(&self.pack());
        Ok(())
    }

    /// Parse account data. Rejects wrong length or tag.
    pub fn unpack(data: &[u8]) -> Result<Self, EscrowError> {
        if data.len() != Self::LEN || data[0] != Self::DISCRIMINATOR {
            return Err(EscrowError::InvalidAccountData);
        }

        let key_at = |offset: usize| {
            Pubkey::try_from_slice(&data[offset..offset + 32])
                .map_err(|_| EscrowError::InvalidAccountData)
        };
        let u64_at = |offset: usize| -> Result<u64, EscrowError> {
            let bytes: [u8; 8] = data[offset..offset + 8]
                .try_into()
                .map_err(|_| EscrowError::InvalidAccountData)?;
            Ok(u64::from_le_bytes(bytes))
        };

        Ok(Self {
            maker: key_at(1)?,
            mint_a: key_at(33)?,
            mint_b: key_at(65)?,
            receive_amount: u64_at(97)?,
            seed: u64_at(105)?,
            bump: data[113],
        })
    }
}
