//! Instruction execution context
//!
//! A handler never touches ledger storage directly. It sees the accounts
//! its instruction named, through indices into the transaction's staged
//! write-set, with the signer and writable privileges the instruction
//! declared. Nothing here is visible to other transactions until the
//! ledger commits the whole write-set.

use escrow_types::account::Account;
use escrow_types::pubkey::Pubkey;

use crate::config::{Rent, RuntimeConfig, SYSTEM_PROGRAM_ID};
use crate::errors::{EscrowError, PdaError};
use crate::events::EscrowEvent;
use crate::pda;

/// One account of the staged write-set.
#[derive(Debug, Clone)]
pub struct TransactionAccount {
    pub key: Pubkey,
    pub account: Account,
}

/// Capability to act as a derived address.
///
/// Only the ledger can mint one, and only for an address derived under
/// the program that is currently executing. Token transfers out of an
/// account whose owner is a derived address require this value.
#[derive(Debug)]
pub struct PdaSigner {
    address: Pubkey,
}

impl PdaSigner {
    pub(crate) fn derive(seeds: &[&[u8]], program_id: &Pubkey) -> Result<Self, PdaError> {
        Ok(Self {
            address: pda::create_program_address(seeds, program_id)?,
        })
    }

    /// The address this capability signs for.
    pub fn address(&self) -> &Pubkey {
        &self.address
    }
}

#[derive(Debug, Clone, Copy)]
struct InstructionAccount {
    store_index: usize,
    is_signer: bool,
    is_writable: bool,
}

/// View of the write-set for one executing instruction.
pub struct InvokeContext<'a> {
    config: &'a RuntimeConfig,
    program_id: Pubkey,
    accounts: Vec<InstructionAccount>,
    store: &'a mut [TransactionAccount],
    events: &'a mut Vec<EscrowEvent>,
}

impl<'a> InvokeContext<'a> {
    /// `metas` maps each instruction account to `(store index, signer, writable)`.
    pub(crate) fn new(
        config: &'a RuntimeConfig,
        program_id: Pubkey,
        metas: &[(usize, bool, bool)],
        store: &'a mut [TransactionAccount],
        events: &'a mut Vec<EscrowEvent>,
    ) -> Self {
        let accounts = metas
            .iter()
            .map(|&(store_index, is_signer, is_writable)| InstructionAccount {
                store_index,
                is_signer,
                is_writable,
            })
            .collect();
        Self {
            config,
            program_id,
            accounts,
            store,
            events,
        }
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    pub fn config(&self) -> &'a RuntimeConfig {
        self.config
    }

    pub fn rent(&self) -> &'a Rent {
        &self.config.rent
    }

    /// Number of accounts passed to the instruction.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    fn slot(&self, index: usize) -> Result<InstructionAccount, EscrowError> {
        self.accounts
            .get(index)
            .copied()
            .ok_or(EscrowError::NotEnoughAccountKeys)
    }

    pub fn key(&self, index: usize) -> Result<Pubkey, EscrowError> {
        let slot = self.slot(index)?;
        Ok(self.store[slot.store_index].key)
    }

    pub fn is_signer(&self, index: usize) -> bool {
        self.slot(index).map(|s| s.is_signer).unwrap_or(false)
    }

    pub fn is_writable(&self, index: usize) -> bool {
        self.slot(index).map(|s| s.is_writable).unwrap_or(false)
    }

    pub fn account(&self, index: usize) -> Result<&Account, EscrowError> {
        let slot = self.slot(index)?;
        Ok(&self.store[slot.store_index].account)
    }

    /// Mutable access; fails unless the instruction marked the account writable.
    pub fn account_mut(&mut self, index: usize) -> Result<&mut Account, EscrowError> {
        let slot = self.slot(index)?;
        let entry = &mut self.store[slot.store_index];
        if !slot.is_writable {
            return Err(EscrowError::AccountNotWritable(entry.key));
        }
        Ok(&mut entry.account)
    }

    /// Require that the account at `index` signed the transaction.
    pub fn require_signer(&self, index: usize) -> Result<Pubkey, EscrowError> {
        let key = self.key(index)?;
        if !self.is_signer(index) {
            return Err(EscrowError::MissingSignature(key));
        }
        Ok(key)
    }

    /// Require that the account at `index` is the given program.
    pub fn require_program(&self, index: usize, program_id: &Pubkey) -> Result<(), EscrowError> {
        if self.key(index)? != *program_id {
            return Err(EscrowError::IncorrectProgramId);
        }
        Ok(())
    }

    /// Issue a signer capability for an address derived under the
    /// executing program.
    pub fn derive_signer(&self, seeds: &[&[u8]]) -> Result<PdaSigner, EscrowError> {
        Ok(PdaSigner::derive(seeds, &self.program_id)?)
    }

    /// Allocate a rent-exempt account of `space` bytes owned by `owner`,
    /// funded by `payer`.
    ///
    /// The new address must sign, either as a transaction signer or via
    /// `signer` when it is a derived address.
    pub fn create_account(
        &mut self,
        payer: usize,
        new_account: usize,
        space: usize,
        owner: Pubkey,
        signer: Option<&PdaSigner>,
    ) -> Result<(), EscrowError> {
        let payer_key = self.require_signer(payer)?;
        let new_key = self.key(new_account)?;

        let authorized = self.is_signer(new_account)
            || signer.map_or(false, |s| *s.address() == new_key);
        if !authorized {
            return Err(EscrowError::MissingSignature(new_key));
        }
        if self.account(new_account)?.exists() {
            return Err(EscrowError::AccountAlreadyInitialized(new_key));
        }

        let lamports = self.rent().minimum_balance(space);
        let available = self.account(payer)?.lamports;
        if available < lamports {
            return Err(EscrowError::InsufficientFunds {
                required: lamports,
                available,
            });
        }

        self.account_mut(payer)?.lamports -= lamports;
        let created = self.account_mut(new_account)?;
        *created = Account::new(lamports, space, owner);

        tracing::debug!(%payer_key, %new_key, space, lamports, "Account created");
        Ok(())
    }

    /// Move `lamports` out of the data-less system account `from`.
    ///
    /// `from` must sign, either as a transaction signer or via `signer`
    /// when it is a derived address.
    pub fn transfer_lamports(
        &mut self,
        from: usize,
        to: usize,
        lamports: u64,
        signer: Option<&PdaSigner>,
    ) -> Result<(), EscrowError> {
        let from_key = self.key(from)?;
        let to_key = self.key(to)?;
        let authorized =
            self.is_signer(from) || signer.map_or(false, |s| *s.address() == from_key);
        if !authorized {
            return Err(EscrowError::MissingSignature(from_key));
        }
        for (index, key) in [(from, from_key), (to, to_key)] {
            if !self.is_writable(index) {
                return Err(EscrowError::AccountNotWritable(key));
            }
        }

        let source = self.account(from)?;
        if !source.is_owned_by(&SYSTEM_PROGRAM_ID) || !source.data.is_empty() {
            return Err(EscrowError::InvalidAccountData);
        }
        if source.lamports < lamports {
            return Err(EscrowError::InsufficientFunds {
                required: lamports,
                available: source.lamports,
            });
        }
        if from_key == to_key {
            return Ok(());
        }
        let credited = self
            .account(to)?
            .lamports
            .checked_add(lamports)
            .ok_or(EscrowError::Overflow)?;

        self.account_mut(from)?.lamports -= lamports;
        self.account_mut(to)?.lamports = credited;
        Ok(())
    }

    /// Close `target`: move all its lamports to `destination`, wipe data
    /// and hand ownership back to the system program. Returns the lamports
    /// reclaimed.
    pub fn close_account(&mut self, target: usize, destination: usize) -> Result<u64, EscrowError> {
        if self.key(target)? == self.key(destination)? {
            return Err(EscrowError::DuplicateAccount);
        }

        let reclaimed = self.account(target)?.lamports;
        let credited = self
            .account(destination)?
            .lamports
            .checked_add(reclaimed)
            .ok_or(EscrowError::Overflow)?;

        let closed = self.account_mut(target)?;
        closed.lamports = 0;
        closed.data.clear();
        closed.owner = SYSTEM_PROGRAM_ID;
        self.account_mut(destination)?.lamports = credited;
        Ok(reclaimed)
    }

    /// Record an event for the transaction receipt.
    pub fn emit(&mut self, event: EscrowEvent) {
        self.events.push(event);
    }
}
