//! Simulation configuration

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("invalid simulation config: {0}")]
    InvalidConfig(String),

    #[error("setup failed: {0}")]
    Setup(String),

    #[error("worker thread panicked")]
    WorkerPanicked,
}

/// Workload parameters. Identical configs produce identical plans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// RNG seed for identities, amounts and take/refund choices
    pub seed: u64,
    pub makers: usize,
    pub offers_per_maker: usize,
    /// Probability that an offer is taken rather than refunded
    pub take_ratio: f64,
    pub threads: usize,
    pub max_deposit: u64,
    pub max_receive: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            makers: 8,
            offers_per_maker: 4,
            take_ratio: 0.5,
            threads: 4,
            max_deposit: 1_000,
            max_receive: 2_000,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        if self.makers == 0 {
            return Err(SimError::InvalidConfig("makers must be at least 1".into()));
        }
        if self.threads == 0 {
            return Err(SimError::InvalidConfig("threads must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.take_ratio) {
            return Err(SimError::InvalidConfig(format!(
                "take_ratio {} outside [0, 1]",
                self.take_ratio
            )));
        }
        if self.max_deposit == 0 || self.max_receive == 0 {
            return Err(SimError::InvalidConfig("amount bounds must be positive".into()));
        }
        // every offer may draw the bound, and all of it is minted up front
        let offers = (self.makers as u64).checked_mul(self.offers_per_maker as u64);
        let bounds = [("max_deposit", self.max_deposit), ("max_receive", self.max_receive)];
        for (name, bound) in bounds {
            if offers.and_then(|n| n.checked_mul(bound)).is_none() {
                return Err(SimError::InvalidConfig(format!(
                    "{name} {bound} across all offers overflows the token supply"
                )));
            }
        }
        Ok(())
    }
}
