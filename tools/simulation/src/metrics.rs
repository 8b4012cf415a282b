//! Outcome counters for a simulation run
//!
//! Each worker counts locally; the runner merges the per-thread counters
//! after every worker has joined.

use escrow_contracts::errors::TransactionError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregated simulation metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimMetrics {
    pub makes: u64,
    pub takes: u64,
    pub refunds: u64,
    pub failures: u64,
    /// Failure count keyed by error message
    pub failures_by_kind: BTreeMap<String, u64>,
}

impl SimMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_failure(&mut self, err: &TransactionError) {
        self.failures += 1;
        *self.failures_by_kind.entry(err.to_string()).or_insert(0) += 1;
    }

    pub fn committed(&self) -> u64 {
        self.makes + self.takes + self.refunds
    }

    /// Fold another worker's counters into this one.
    pub fn merge(&mut self, other: &SimMetrics) {
        self.makes += other.makes;
        self.takes += other.takes;
        self.refunds += other.refunds;
        self.failures += other.failures;
        for (kind, count) in &other.failures_by_kind {
            *self.failures_by_kind.entry(kind.clone()).or_insert(0) += count;
        }
    }
}
