//! Escrow handlers
//!
//! Each handler validates every precondition before its first write.

pub mod make;
pub mod refund;
pub mod take;

use escrow_types::pubkey::Pubkey;

use crate::config::SYSTEM_PROGRAM_ID;
use crate::context::{InvokeContext, PdaSigner};
use crate::errors::EscrowError;
use crate::state::{EscrowRecord, ESCROW_SEED};
use crate::token::{self, TokenAccount};

/// Require the system, token and associated-token programs at
/// `first`, `first + 1`, `first + 2`.
pub(crate) fn check_programs(ctx: &InvokeContext<'_>, first: usize) -> Result<(), EscrowError> {
    let config = ctx.config();
    ctx.require_program(first, &SYSTEM_PROGRAM_ID)?;
    ctx.require_program(first + 1, &config.token_program_id)?;
    ctx.require_program(first + 2, &config.associated_token_program_id)
}

/// Load the record at `index`, failing with `RecordNotFound` when the
/// address holds nothing.
pub(crate) fn load_record(
    ctx: &InvokeContext<'_>,
    index: usize,
) -> Result<EscrowRecord, EscrowError> {
    let account = ctx.account(index)?;
    if !account.exists() {
        return Err(EscrowError::RecordNotFound);
    }
    if !account.is_owned_by(ctx.program_id()) {
        return Err(EscrowError::InvalidAccountData);
    }
    EscrowRecord::unpack(&account.data)
}

/// Confirm the record really lives at its derived address.
pub(crate) fn check_record_address(
    ctx: &InvokeContext<'_>,
    index: usize,
    record: &EscrowRecord,
) -> Result<Pubkey, EscrowError> {
    let key = ctx.key(index)?;
    let derived = record
        .address(ctx.program_id())
        .map_err(|_| EscrowError::InvalidSeeds)?;
    if derived != key {
        return Err(EscrowError::InvalidSeeds);
    }
    Ok(key)
}

/// Signer capability for the record's derived address.
pub(crate) fn record_signer(
    ctx: &InvokeContext<'_>,
    record: &EscrowRecord,
) -> Result<PdaSigner, EscrowError> {
    let seed = record.seed.to_le_bytes();
    ctx.derive_signer(&[ESCROW_SEED, record.maker.as_ref(), &seed, &[record.bump]])
}

/// Load the associated token account of `(wallet, mint)` at `index`.
pub(crate) fn load_associated(
    ctx: &InvokeContext<'_>,
    index: usize,
    wallet: &Pubkey,
    mint: &Pubkey,
) -> Result<TokenAccount, EscrowError> {
    if ctx.key(index)? != token::associated_token_address(wallet, mint, ctx.config())? {
        return Err(EscrowError::InvalidTokenAccount);
    }
    let state = token::load_token_account(ctx, index)?;
    if state.mint != *mint {
        return Err(EscrowError::MintMismatch);
    }
    if state.owner != *wallet {
        return Err(EscrowError::Unauthorized);
    }
    Ok(state)
}
