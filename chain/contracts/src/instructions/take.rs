//! Take: fill an offer
//!
//! One atomic swap: the taker pays `receive_amount` of mint B to the
//! maker, the vault's mint A goes to the taker, and the vault and record
//! close with their rent returned to the maker.

use tracing::{debug, info};

use crate::context::InvokeContext;
use crate::errors::EscrowError;
use crate::events::{EscrowEvent, EscrowTaken};
use crate::instructions::{
    check_programs, check_record_address, load_associated, load_record, record_signer,
};
use crate::token::{self, Authority};
use crate::vault;

const TAKER: usize = 0;
const MAKER: usize = 1;
const ESCROW: usize = 2;
const MINT_A: usize = 3;
const MINT_B: usize = 4;
const VAULT: usize = 5;
const TAKER_ATA_A: usize = 6;
const TAKER_ATA_B: usize = 7;
const MAKER_ATA_B: usize = 8;
const SYSTEM_PROGRAM: usize = 9;

pub fn process(ctx: &mut InvokeContext<'_>) -> Result<(), EscrowError> {
    if !ctx.is_signer(TAKER) {
        return Err(EscrowError::Unauthorized);
    }
    check_programs(ctx, SYSTEM_PROGRAM)?;

    let record = load_record(ctx, ESCROW)?;
    let taker = ctx.key(TAKER)?;
    let maker = ctx.key(MAKER)?;
    if maker != record.maker {
        return Err(EscrowError::Unauthorized);
    }
    if ctx.key(MINT_A)? != record.mint_a || ctx.key(MINT_B)? != record.mint_b {
        return Err(EscrowError::MintMismatch);
    }
    let escrow = check_record_address(ctx, ESCROW, &record)?;
    vault::check(ctx, VAULT, &escrow, &record)?;

    let payment = load_associated(ctx, TAKER_ATA_B, &taker, &record.mint_b)?;
    if payment.amount < record.receive_amount {
        return Err(EscrowError::InsufficientFunds {
            required: record.receive_amount,
            available: payment.amount,
        });
    }

    token::create_associated_account(ctx, TAKER, TAKER_ATA_A, TAKER, MINT_A, true)?;
    token::create_associated_account(ctx, TAKER, MAKER_ATA_B, MAKER, MINT_B, true)?;

    let decimals_b = token::load_mint(ctx, MINT_B)?.decimals;
    token::transfer_checked(
        ctx,
        TAKER_ATA_B,
        MINT_B,
        MAKER_ATA_B,
        Authority::Signer(TAKER),
        record.receive_amount,
        decimals_b,
    )?;
    debug!(%escrow, %taker, amount = record.receive_amount, "Payment sent to maker");

    let signer = record_signer(ctx, &record)?;
    let (deposit_amount, vault_rent) =
        vault::release(ctx, VAULT, MINT_A, TAKER_ATA_A, MAKER, &signer)?;
    let record_rent = ctx.close_account(ESCROW, MAKER)?;
    let rent_reclaimed = vault_rent.checked_add(record_rent).ok_or(EscrowError::Overflow)?;

    ctx.emit(EscrowEvent::Taken(EscrowTaken {
        escrow,
        maker,
        taker,
        deposit_amount,
        receive_amount: record.receive_amount,
        rent_reclaimed,
    }));
    info!(
        %escrow,
        %maker,
        %taker,
        deposit_amount,
        receive_amount = record.receive_amount,
        rent_reclaimed,
        "Escrow taken"
    );
    Ok(())
}
