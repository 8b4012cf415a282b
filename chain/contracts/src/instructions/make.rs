//! Make: open an offer
//!
//! Allocates the escrow record at `derive("escrow", maker, seed)`, creates
//! the vault under the record's authority, and moves the deposit in.

use tracing::{debug, info};

use crate::context::InvokeContext;
use crate::errors::EscrowError;
use crate::events::{EscrowEvent, EscrowMade};
use crate::instructions::{check_programs, load_associated, record_signer};
use crate::state::EscrowRecord;
use crate::token::{self, Authority};
use crate::vault;

const MAKER: usize = 0;
const ESCROW: usize = 1;
const MINT_A: usize = 2;
const MINT_B: usize = 3;
const MAKER_ATA_A: usize = 4;
const VAULT: usize = 5;
const SYSTEM_PROGRAM: usize = 6;

pub fn process(
    ctx: &mut InvokeContext<'_>,
    seed: u64,
    deposit_amount: u64,
    receive_amount: u64,
) -> Result<(), EscrowError> {
    if deposit_amount == 0 || receive_amount == 0 {
        return Err(EscrowError::InvalidAmount);
    }
    if !ctx.is_signer(MAKER) {
        return Err(EscrowError::Unauthorized);
    }
    check_programs(ctx, SYSTEM_PROGRAM)?;

    let program_id = *ctx.program_id();
    let maker = ctx.key(MAKER)?;
    let escrow = ctx.key(ESCROW)?;
    let (expected, bump) = EscrowRecord::find_address(&maker, seed, &program_id)?;
    if escrow != expected {
        return Err(EscrowError::InvalidSeeds);
    }
    if ctx.account(ESCROW)?.exists() {
        return Err(EscrowError::RecordAlreadyExists);
    }

    let mint_a = ctx.key(MINT_A)?;
    let mint_b = ctx.key(MINT_B)?;
    let decimals = token::load_mint(ctx, MINT_A)?.decimals;
    token::load_mint(ctx, MINT_B)?;

    let source = load_associated(ctx, MAKER_ATA_A, &maker, &mint_a)?;
    if source.amount < deposit_amount {
        return Err(EscrowError::InsufficientFunds {
            required: deposit_amount,
            available: source.amount,
        });
    }
    if ctx.key(VAULT)? != vault::vault_address(&escrow, &mint_a, ctx.config())? {
        return Err(EscrowError::InvalidVault);
    }

    let record = EscrowRecord {
        maker,
        mint_a,
        mint_b,
        receive_amount,
        seed,
        bump,
    };
    let signer = record_signer(ctx, &record)?;
    ctx.create_account(MAKER, ESCROW, EscrowRecord::LEN, program_id, Some(&signer))?;
    record.pack_into(&mut ctx.account_mut(ESCROW)?.data)?;
    debug!(%escrow, bump, "Escrow record allocated");

    vault::open(ctx, MAKER, VAULT, ESCROW, MINT_A)?;
    token::transfer_checked(
        ctx,
        MAKER_ATA_A,
        MINT_A,
        VAULT,
        Authority::Signer(MAKER),
        deposit_amount,
        decimals,
    )?;

    ctx.emit(EscrowEvent::Made(EscrowMade {
        escrow,
        maker,
        mint_a,
        mint_b,
        seed,
        deposit_amount,
        receive_amount,
    }));
    info!(%escrow, %maker, seed, deposit_amount, receive_amount, "Escrow made");
    Ok(())
}
