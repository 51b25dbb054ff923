//! Engine configuration options.

use crate::math::{Rad, Ray};
use crate::types::Address;
use serde::{Deserialize, Serialize};

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
    /// Receives every role at construction.
    pub owner: Address,
    /// Ledger address holding protocol surplus, treasury collateral and bad debt.
    pub surplus_engine: Address,
    pub surplus_buffer: Rad,
    /// Stablecoin target price, in the price sources' unit.
    pub reference_price: Ray,
    pub total_debt_ceiling: Rad,
    /// Staleness bound for pools configured with `price_max_age = 0`.
    pub default_price_max_age: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_events: 100_000,
            owner: Address::DEPLOYER,
            surplus_engine: Address::SYSTEM_DEBT_ENGINE,
            surplus_buffer: Rad::zero(),
            reference_price: Ray::ONE,
            total_debt_ceiling: Rad::from_integer(1_000_000_000),
            default_price_max_age: 3_600,
        }
    }
}
