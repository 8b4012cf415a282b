//! Program events
//!
//! Events are immutable records emitted by the escrow and vault handlers. The ledger
//! attaches them to the transaction receipt and the journal entry only when
//! the transaction commits.

use escrow_types::pubkey::Pubkey;
use serde::{Deserialize, Serialize};

/// An offer was opened and its deposit moved into the vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowMade {
    pub escrow: Pubkey,
    pub maker: Pubkey,
    pub mint_a: Pubkey,
    pub mint_b: Pubkey,
    pub seed: u64,
    pub deposit_amount: u64,
    pub receive_amount: u64,
}

/// An offer was filled; both legs settled and the record closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowTaken {
    pub escrow: Pubkey,
    pub maker: Pubkey,
    pub taker: Pubkey,
    /// Units of mint A released from the vault to the taker
    pub deposit_amount: u64,
    /// Units of mint B paid to the maker
    pub receive_amount: u64,
    /// Lamports returned to the maker from the vault and record
    pub rent_reclaimed: u64,
}

/// An offer was cancelled by its maker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowRefunded {
    pub escrow: Pubkey,
    pub maker: Pubkey,
    pub amount_returned: u64,
    pub rent_reclaimed: u64,
}

/// A lamport vault was funded by its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultDeposited {
    pub vault: Pubkey,
    pub owner: Pubkey,
    pub amount: u64,
}

/// A lamport vault was drained back to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultWithdrawn {
    pub vault: Pubkey,
    pub owner: Pubkey,
    pub amount: u64,
}

/// Enum wrapper for all program events, enabling uniform handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscrowEvent {
    Made(EscrowMade),
    Taken(EscrowTaken),
    Refunded(EscrowRefunded),
    Deposited(VaultDeposited),
    Withdrawn(VaultWithdrawn),
}

impl EscrowEvent {
    /// Address of the record or vault the event concerns.
    pub fn address(&self) -> &Pubkey {
        match self {
            EscrowEvent::Made(e) => &e.escrow,
            EscrowEvent::Taken(e) => &e.escrow,
            EscrowEvent::Refunded(e) => &e.escrow,
            EscrowEvent::Deposited(e) => &e.vault,
            EscrowEvent::Withdrawn(e) => &e.vault,
        }
    }
}
