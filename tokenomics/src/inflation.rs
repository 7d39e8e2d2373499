//! Annual inflation schedule
//!
//! Years are counted from the tokenomics launch. The first ten years follow
//! the fixed table in [`constants::INFLATION_AMOUNTS`]; afterwards the supply
//! cap grows by [`constants::TERMINAL_INFLATION_PERCENT`] per year forever.

use crate::constants::{
    INFLATION_AMOUNTS, INITIAL_SUPPLY, TEN_YEAR_SUPPLY_CAP, TERMINAL_INFLATION_PERCENT,
};
use olas_core::{amount_serde, Amount, ArithmeticError, Timestamp, ONE_YEAR};
use serde::{Deserialize, Serialize};

/// Number of whole years elapsed since `launch`
pub fn year_at(launch: Timestamp, now: Timestamp) -> u64 {
    now.saturating_sub(launch) / ONE_YEAR
}

/// Supply cap at the end of `year`
pub fn supply_cap_for_year(year: u64) -> Amount {
    if year < 10 {
        let minted: Amount = INFLATION_AMOUNTS[..=year as usize].iter().sum();
        return INITIAL_SUPPLY + minted;
    }

    let mut cap = TEN_YEAR_SUPPLY_CAP;
    for _ in 10..=year {
        cap = cap.saturating_add(cap / 100 * TERMINAL_INFLATION_PERCENT);
        if cap == Amount::MAX {
            break;
        }
    }
    cap
}

/// Amount that may be minted during `year`
pub fn inflation_for_year(year: u64) -> Amount {
    if year < 10 {
        return INFLATION_AMOUNTS[year as usize];
    }
    supply_cap_for_year(year - 1) / 100 * TERMINAL_INFLATION_PERCENT
}

/// Minting progress within the current year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InflationState {
    pub year: u64,
    #[serde(with = "amount_serde")]
    pub minted_this_year: Amount,
    #[serde(with = "amount_serde")]
    pub inflation_cap_this_year: Amount,
}

impl InflationState {
    pub fn for_year(year: u64) -> Self {
        Self {
            year,
            minted_this_year: 0,
            inflation_cap_this_year: inflation_for_year(year),
        }
    }

    /// What can still be minted this year
    pub fn remaining(&self) -> Amount {
        self.inflation_cap_this_year - self.minted_this_year
    }

    /// The state as seen in `year`; a new year starts with nothing minted
    pub fn rolled_to(&self, year: u64) -> Self {
        if year > self.year {
            Self::for_year(year)
        } else {
            *self
        }
    }

    /// Account for a mint, refusing to exceed the yearly cap
    pub fn charge(&mut self, amount: Amount) -> Result<(), ArithmeticError> {
        if amount > self.remaining() {
            return Err(ArithmeticError::Overflow);
        }
        self.minted_this_year += amount;
        Ok(())
    }
}
