//! Refund: the maker cancels an outstanding offer

use tracing::info;

use crate::context::InvokeContext;
use crate::errors::EscrowError;
use crate::events::{EscrowEvent, EscrowRefunded};
use crate::instructions::{check_programs, check_record_address, load_record, record_signer};
use crate::token;
use crate::vault;

const MAKER: usize = 0;
const ESCROW: usize = 1;
const MINT_A: usize = 2;
const VAULT: usize = 3;
const MAKER_ATA_A: usize = 4;
const SYSTEM_PROGRAM: usize = 5;

pub fn process(ctx: &mut InvokeContext<'_>) -> Result<(), EscrowError> {
    check_programs(ctx, SYSTEM_PROGRAM)?;

    let record = load_record(ctx, ESCROW)?;
    let maker = ctx.key(MAKER)?;
    if !ctx.is_signer(MAKER) || maker != record.maker {
        return Err(EscrowError::Unauthorized);
    }
    if ctx.key(MINT_A)? != record.mint_a {
        return Err(EscrowError::MintMismatch);
    }
    let escrow = check_record_address(ctx, ESCROW, &record)?;
    vault::check(ctx, VAULT, &escrow, &record)?;

    token::create_associated_account(ctx, MAKER, MAKER_ATA_A, MAKER, MINT_A, true)?;

    let signer = record_signer(ctx, &record)?;
    let (amount_returned, vault_rent) =
        vault::release(ctx, VAULT, MINT_A, MAKER_ATA_A, MAKER, &signer)?;
    let record_rent = ctx.close_account(ESCROW, MAKER)?;
    let rent_reclaimed = vault_rent.checked_add(record_rent).ok_or(EscrowError::Overflow)?;

    ctx.emit(EscrowEvent::Refunded(EscrowRefunded {
        escrow,
        maker,
        amount_returned,
        rent_reclaimed,
    }));
    info!(%escrow, %maker, amount_returned, rent_reclaimed, "Escrow refunded");
    Ok(())
}
