//! Report export
//!
//! Serializes a finished run to JSON for external consumption.

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::metrics::SimMetrics;

/// Outcome of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimReport {
    pub version: String,
    pub config: SimConfig,
    pub metrics: SimMetrics,
    pub supply_a_before: u64,
    pub supply_a_after: u64,
    pub supply_b_before: u64,
    pub supply_b_after: u64,
    /// Sum of all token account balances of mint A at the end
    pub circulating_a: u64,
    pub circulating_b: u64,
    pub live_records: usize,
    pub transactions_committed: usize,
    pub final_state_root: [u8; 32],
    pub elapsed_ms: u64,
}

impl SimReport {
    /// Supply unchanged, every unit accounted for, no record left open.
    pub fn is_conserved(&self) -> bool {
        self.supply_a_before == self.supply_a_after
            && self.supply_b_before == self.supply_b_after
            && self.circulating_a == self.supply_a_after
            && self.circulating_b == self.supply_b_after
            && self.live_records == 0
    }
}

/// Export a report as pretty JSON.
pub fn export_json(report: &SimReport) -> String {
    serde_json::to_string_pretty(report).unwrap_or_default()
}

/// Write a report to a file path.
pub fn write_to_file(report: &SimReport, path: &str) -> std::io::Result<()> {
    std::fs::write(path, export_json(report))
}
