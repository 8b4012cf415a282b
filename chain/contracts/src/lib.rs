//! Escrow program and its host ledger
//!
//! A maker locks units of one asset in a vault owned by a derived address
//! and names the amount of a second asset wanted in return. A taker fills
//! the offer in one atomic swap, or the maker refunds it. The ledger that
//! hosts the program executes each transaction against a staged write-set
//! and commits it all-or-nothing. It also hosts a second, smaller program:
//! a per-owner vault for native lamports.
//!
//! # Modules
//! - `pda`: Address derivation with no private key
//! - `state`: The escrow record and its byte layout
//! - `vault`: Custody of the deposit under the record's authority
//! - `instructions`: The make, take and refund handlers
//! - `instruction`: Instruction encoding and client-side builders
//! - `processor`: Escrow program entrypoint
//! - `lamport_vault`: Per-owner lamport vault, a second hosted program
//! - `token`: Built-in token primitives consumed by the handlers
//! - `context`: The handler's view of the write-set
//! - `transaction`: Signed transactions
//! - `ledger`: Locking, atomic commit and the journal
//! - `security`: Account locks and replay protection
//! - `journal`: State roots of committed transactions
//! - `events`: Program events
//! - `config`: Program ids, rent and limits
//! - `errors`: Error types per layer

pub mod config;
pub mod context;
pub mod errors;
pub mod events;
pub mod instruction;
pub mod instructions;
pub mod journal;
pub mod lamport_vault;
pub mod ledger;
pub mod pda;
pub mod processor;
pub mod security;
pub mod state;
pub mod token;
pub mod transaction;
pub mod vault;
