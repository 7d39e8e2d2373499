//! OLAS Tokenomics Module
//!
//! Implements the epoch engine including:
//! - Service revenue tracking per epoch
//! - Unit Coefficient of Functioning (UCF) and Inflation Discount Factor (IDF)
//! - Reward and top-up partitioning
//! - The annual inflation schedule gating mints and bonds

pub mod coefficients;
pub mod engine;
pub mod inflation;
pub mod params;
pub mod point;

pub use engine::{
    Incentives, Registries, StakingIncentives, Tokenomics, TokenomicsConfig, TokenomicsRole,
};
pub use inflation::{inflation_for_year, supply_cap_for_year, year_at, InflationState};
pub use params::{RewardFractions, TokenomicsParameters};
pub use point::{EpochPoint, PointHistory, UnitPoint};

pub use olas_core::{ProtocolError, Result};

/// Economic constants
pub mod constants {
    use olas_core::{Amount, E18};

    /// Supply minted before the first tokenomics year
    pub const INITIAL_SUPPLY: Amount = 526_500_000 * E18;

    /// Supply cap reached at the end of year ten
    pub const TEN_YEAR_SUPPLY_CAP: Amount = 1_000_000_000 * E18;

    /// Inflation for each of the first ten years (decreasing growth rate)
    pub const INFLATION_AMOUNTS: [Amount; 10] = [
        65_000_000 * E18,
        60_000_000 * E18,
        55_000_000 * E18,
        51_000_000 * E18,
        47_000_000 * E18,
        44_000_000 * E18,
        41_000_000 * E18,
        39_000_000 * E18,
        37_000_000 * E18,
        34_500_000 * E18,
    ];

    /// Yearly growth of the supply cap after year ten, in percent
    pub const TERMINAL_INFLATION_PERCENT: u128 = 2;
}

#[cfg(test)]
mod tests {
    use super::constants::*;

    #[test]
    fn test_schedule_reaches_ten_year_cap() {
        let total: u128 = INFLATION_AMOUNTS.iter().sum();
        assert_eq!(INITIAL_SUPPLY + total, TEN_YEAR_SUPPLY_CAP);
    }
}
