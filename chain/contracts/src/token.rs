//! Built-in token program primitives
//!
//! The escrow consumes these the way an on-chain program consumes the
//! token program: mint and balance-account layouts, associated-account
//! addressing, and the checked transfer / close operations. Issuance
//! (creating mints, minting supply) is not an instruction here; the
//! ledger exposes it directly as test and tooling setup.
//!
//! # Layouts
//! ```text
//! Mint         [initialized: u8][decimals: u8][supply: u64][has_authority: u8][authority: 32]
//! TokenAccount [initialized: u8][mint: 32][owner: 32][amount: u64]
//! ```

use escrow_types::pubkey::Pubkey;
use serde::{Deserialize, Serialize};

use crate::config::RuntimeConfig;
use crate::context::{InvokeContext, PdaSigner};
use crate::errors::{EscrowError, PdaError, TokenError};
use crate::pda;

/// A fungible asset definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mint {
    pub mint_authority: Option<Pubkey>,
    pub supply: u64,
    pub decimals: u8,
}

impl Mint {
    pub const LEN: usize = 1 + 1 + 8 + 1 + 32;

    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::LEN);
        buf.push(1);
        buf.push(self.decimals);
        buf.extend_from_slice(&self.supply.to_le_bytes());
        match self.mint_authority {
            Some(authority) => {
                buf.push(1);
                buf.extend_from_slice(authority.as_ref());
            }
            None => {
                buf.push(0);
                buf.extend_from_slice(&[0u8; 32]);
            }
        }
        buf
    }

    pub fn unpack(data: &[u8]) -> Result<Self, TokenError> {
        if data.len() != Self::LEN {
            return Err(TokenError::InvalidAccountData);
        }
        if data[0] != 1 {
            return Err(TokenError::UninitializedState);
        }
        let supply = u64::from_le_bytes(
            data[2..10]
                .try_into()
                .map_err(|_| TokenError::InvalidAccountData)?,
        );
        let mint_authority = match data[10] {
            0 => None,
            1 => Some(
                Pubkey::try_from_slice(&data[11..43]).map_err(|_| TokenError::InvalidAccountData)?,
            ),
            _ => return Err(TokenError::InvalidAccountData),
        };
        Ok(Self {
            mint_authority,
            supply,
            decimals: data[1],
        })
    }
}

/// A balance of one mint held on behalf of one owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAccount {
    pub mint: Pubkey,
    /// Wallet or derived address allowed to move the balance
    pub owner: Pubkey,
    pub amount: u64,
}

impl TokenAccount {
    pub const LEN: usize = 1 + 32 + 32 + 8;

    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::LEN);
        buf.push(1);
        buf.extend_from_slice(self.mint.as_ref());
        buf.extend_from_slice(self.owner.as_ref());
        buf.extend_from_slice(&self.amount.to_le_bytes());
        buf
    }

    pub fn unpack(data: &[u8]) -> Result<Self, TokenError> {
        if data.len() != Self::LEN {
            return Err(TokenError::InvalidAccountData);
        }
        if data[0] != 1 {
            return Err(TokenError::UninitializedState);
        }
        let key_at = |offset: usize| {
            Pubkey::try_from_slice(&data[offset..offset + 32])
                .map_err(|_| TokenError::InvalidAccountData)
        };
        let amount = u64::from_le_bytes(
            data[65..73]
                .try_into()
                .map_err(|_| TokenError::InvalidAccountData)?,
        );
        Ok(Self {
            mint: key_at(1)?,
            owner: key_at(33)?,
            amount,
        })
    }
}

/// Who authorizes a debit from a token account.
#[derive(Debug)]
pub enum Authority<'s> {
    /// Instruction account index of a transaction signer.
    Signer(usize),
    /// A derived address, proven by a capability from the executing program.
    Derived(&'s PdaSigner),
}

/// The associated token address for `(wallet, mint)`.
pub fn associated_token_address(
    wallet: &Pubkey,
    mint: &Pubkey,
    config: &RuntimeConfig,
) -> Result<Pubkey, PdaError> {
    find_associated_token_address(wallet, mint, config).map(|(address, _)| address)
}

fn find_associated_token_address(
    wallet: &Pubkey,
    mint: &Pubkey,
    config: &RuntimeConfig,
) -> Result<(Pubkey, u8), PdaError> {
    pda::find_program_address(
        &[wallet.as_ref(), config.token_program_id.as_ref(), mint.as_ref()],
        &config.associated_token_program_id,
    )
}

/// Load a mint; the account must be owned by the token program.
pub fn load_mint(ctx: &InvokeContext<'_>, index: usize) -> Result<Mint, EscrowError> {
    let account = ctx.account(index)?;
    if !account.is_owned_by(&ctx.config().token_program_id) {
        return Err(TokenError::InvalidAccountData.into());
    }
    Ok(Mint::unpack(&account.data)?)
}

/// Load a token account; the account must be owned by the token program.
pub fn load_token_account(
    ctx: &InvokeContext<'_>,
    index: usize,
) -> Result<TokenAccount, EscrowError> {
    let account = ctx.account(index)?;
    if !account.is_owned_by(&ctx.config().token_program_id) {
        return Err(TokenError::InvalidAccountData.into());
    }
    Ok(TokenAccount::unpack(&account.data)?)
}

fn store_token_account(
    ctx: &mut InvokeContext<'_>,
    index: usize,
    state: &TokenAccount,
) -> Result<(), EscrowError> {
    let account = ctx.account_mut(index)?;
    account.data = state.pack();
    Ok(())
}

fn check_authority(
    ctx: &InvokeContext<'_>,
    authority: &Authority<'_>,
    owner: &Pubkey,
) -> Result<(), EscrowError> {
    match authority {
        Authority::Signer(index) => {
            if ctx.key(*index)? != *owner {
                return Err(TokenError::OwnerMismatch.into());
            }
            ctx.require_signer(*index)?;
        }
        Authority::Derived(signer) => {
            if signer.address() != owner {
                return Err(TokenError::OwnerMismatch.into());
            }
        }
    }
    Ok(())
}

/// Create the associated token account of `(wallet, mint)` at `account`,
/// funded by `payer`.
///
/// With `idempotent`, an existing account that already belongs to the
/// same wallet and mint is accepted as-is.
pub fn create_associated_account(
    ctx: &mut InvokeContext<'_>,
    payer: usize,
    account: usize,
    wallet: usize,
    mint: usize,
    idempotent: bool,
) -> Result<(), EscrowError> {
    let config = ctx.config();
    let wallet_key = ctx.key(wallet)?;
    let mint_key = ctx.key(mint)?;
    let account_key = ctx.key(account)?;
    load_mint(ctx, mint)?;

    let (expected, bump) = find_associated_token_address(&wallet_key, &mint_key, config)?;
    if account_key != expected {
        return Err(TokenError::InvalidAssociatedAddress.into());
    }

    if ctx.account(account)?.exists() {
        if !idempotent {
            return Err(EscrowError::AccountAlreadyInitialized(account_key));
        }
        let existing = load_token_account(ctx, account)?;
        if existing.mint != mint_key || existing.owner != wallet_key {
            return Err(EscrowError::InvalidTokenAccount);
        }
        return Ok(());
    }

    let signer = PdaSigner::derive(
        &[
            wallet_key.as_ref(),
            config.token_program_id.as_ref(),
            mint_key.as_ref(),
            &[bump],
        ],
        &config.associated_token_program_id,
    )?;
    ctx.create_account(payer, account, TokenAccount::LEN, config.token_program_id, Some(&signer))?;
    store_token_account(
        ctx,
        account,
        &TokenAccount {
            mint: mint_key,
            owner: wallet_key,
            amount: 0,
        },
    )?;

    tracing::debug!(%wallet_key, %mint_key, %account_key, "Associated token account created");
    Ok(())
}

/// Move `amount` of `mint` from `from` to `to`, checking mint identity,
/// decimals, authority and balance before touching either account.
pub fn transfer_checked(
    ctx: &mut InvokeContext<'_>,
    from: usize,
    mint: usize,
    to: usize,
    authority: Authority<'_>,
    amount: u64,
    decimals: u8,
) -> Result<(), EscrowError> {
    let mint_key = ctx.key(mint)?;
    let mint_state = load_mint(ctx, mint)?;
    if mint_state.decimals != decimals {
        return Err(TokenError::DecimalsMismatch {
            expected: mint_state.decimals,
            actual: decimals,
        }
        .into());
    }

    let mut source = load_token_account(ctx, from)?;
    let mut destination = load_token_account(ctx, to)?;
    if source.mint != mint_key || destination.mint != mint_key {
        return Err(TokenError::MintMismatch.into());
    }
    check_authority(ctx, &authority, &source.owner)?;

    if source.amount < amount {
        return Err(TokenError::InsufficientFunds {
            required: amount,
            available: source.amount,
        }
        .into());
    }
    if ctx.key(from)? == ctx.key(to)? {
        return Ok(());
    }

    source.amount -= amount;
    destination.amount = destination
        .amount
        .checked_add(amount)
        .ok_or(TokenError::Overflow)?;
    store_token_account(ctx, from, &source)?;
    store_token_account(ctx, to, &destination)?;
    Ok(())
}

/// Close an empty token account, sending its lamports to `destination`.
pub fn close_account(
    ctx: &mut InvokeContext<'_>,
    account: usize,
    destination: usize,
    authority: Authority<'_>,
) -> Result<u64, EscrowError> {
    let state = load_token_account(ctx, account)?;
    check_authority(ctx, &authority, &state.owner)?;
    if state.amount != 0 {
        return Err(TokenError::NonZeroBalance {
            amount: state.amount,
        }
        .into());
    }
    ctx.close_account(account, destination)
}
