//! Types library for the escrow ledger
//!
//! Primitives shared by the ledger runtime, the escrow program and the
//! simulation tooling.
//!
//! # Modules
//! - `pubkey`: 32-byte account identities
//! - `signer`: Ed25519 keypairs and signatures
//! - `account`: The unit of ledger storage
//! - `errors`: Parse errors for the primitives above

pub mod pubkey;
pub mod signer;
pub mod account;
pub mod errors;
