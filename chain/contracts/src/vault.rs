//! Vault: custody of an offer's deposit
//!
//! The vault is the associated token account of `(escrow record, mint_a)`.
//! Its owner is the record's derived address, so only the escrow program,
//! holding the record's `PdaSigner`, can move tokens out of it. A vault
//! exists exactly as long as its record does.

use escrow_types::pubkey::Pubkey;

use crate::config::RuntimeConfig;
use crate::context::{InvokeContext, PdaSigner};
use crate::errors::{EscrowError, PdaError};
use crate::state::EscrowRecord;
use crate::token::{self, Authority};

/// Address of the vault holding the deposit for the record at `escrow`.
pub fn vault_address(
    escrow: &Pubkey,
    mint_a: &Pubkey,
    config: &RuntimeConfig,
) -> Result<Pubkey, PdaError> {
    token::associated_token_address(escrow, mint_a, config)
}

/// Create an empty vault for a record that is being opened.
///
/// Fails if anything already lives at the vault address.
pub fn open(
    ctx: &mut InvokeContext<'_>,
    payer: usize,
    vault: usize,
    escrow: usize,
    mint_a: usize,
) -> Result<(), EscrowError> {
    token::create_associated_account(ctx, payer, vault, escrow, mint_a, false)
}

/// Verify that `vault` is the live vault of `record`, stored at `escrow_key`.
pub fn check(
    ctx: &InvokeContext<'_>,
    vault: usize,
    escrow_key: &Pubkey,
    record: &EscrowRecord,
) -> Result<(), EscrowError> {
    let expected = vault_address(escrow_key, &record.mint_a, ctx.config())?;
    if ctx.key(vault)? != expected {
        return Err(EscrowError::InvalidVault);
    }
    let state = token::load_token_account(ctx, vault).map_err(|_| EscrowError::InvalidVault)?;
    if state.mint != record.mint_a || state.owner != *escrow_key {
        return Err(EscrowError::InvalidVault);
    }
    Ok(())
}

/// Drain the vault into `destination` and close it.
///
/// The full balance moves to `destination`; the vault's rent goes to
/// `rent_destination`. Returns `(amount released, lamports reclaimed)`.
pub fn release(
    ctx: &mut InvokeContext<'_>,
    vault: usize,
    mint_a: usize,
    destination: usize,
    rent_destination: usize,
    signer: &PdaSigner,
) -> Result<(u64, u64), EscrowError> {
    let amount = token::load_token_account(ctx, vault)?.amount;
    if amount > 0 {
        let decimals = token::load_mint(ctx, mint_a)?.decimals;
        token::transfer_checked(
            ctx,
            vault,
            mint_a,
            destination,
            Authority::Derived(signer),
            amount,
            decimals,
        )?;
    }
    let reclaimed = token::close_account(ctx, vault, rent_destination, Authority::Derived(signer))?;
    Ok((amount, reclaimed))
}
