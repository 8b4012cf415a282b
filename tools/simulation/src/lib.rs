//! Escrow Workload Simulation
//!
//! Drives the escrow ledger with a seeded, reproducible workload of
//! makes, takes and refunds spread across OS threads that share one
//! ledger, then checks that no asset was created, destroyed or stranded.
//!
//! # Modules
//! - `config`: Workload parameters
//! - `engine`: Plan generation and the threaded runner
//! - `metrics`: Outcome counters
//! - `export`: Report and JSON export

pub mod config;
pub mod engine;
pub mod export;
pub mod metrics;

pub use config::{SimConfig, SimError};
pub use engine::run;
pub use export::SimReport;

/// Crate version constant
pub const VERSION: &str = "1.0.0";
