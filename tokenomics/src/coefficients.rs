//! UCF, IDF and pro-rata distribution math
//!
//! ```text
//! ucf_class = Σ_u (rev_u / R) / N_class
//! ucf       = (wc·ucfc + wa·ucfa) / (wc + wa)
//! idf       = 1 + ε + max(ucf − target, 0) · innovation / devs_per_capital
//! ```
//!
//! `rev_u` is the epoch revenue of whitelisted-owner services built on unit
//! `u`, `R` the total epoch revenue and `N_class` the number of registered
//! units of the class.

use olas_core::{mul_div, Address, Amount, ArithmeticError, FixedPoint};
use std::collections::BTreeMap;

/// UCF of one unit class, in [0, 1]; zero when nothing is measurable
pub fn unit_ucf(
    unit_revenue: &BTreeMap<u32, Amount>,
    total_revenue: Amount,
    total_units: u32,
) -> Result<FixedPoint, ArithmeticError> {
    if total_revenue == 0 || total_units == 0 {
        return Ok(FixedPoint::ZERO);
    }
    let mut usage = FixedPoint::ZERO;
    for revenue in unit_revenue.values() {
        let share = FixedPoint::from_ratio((*revenue).min(total_revenue), total_revenue)?;
        usage = usage.checked_add(share)?;
    }
    let ucf = usage.checked_div(FixedPoint::from_integer(total_units as u128)?)?;
    Ok(ucf.min(FixedPoint::ONE))
}

/// Weighted average of the component and agent UCFs
pub fn aggregate_ucf(
    ucfc: FixedPoint,
    ucfa: FixedPoint,
    ucfc_weight: u64,
    ucfa_weight: u64,
) -> Result<FixedPoint, ArithmeticError> {
    let weighted = ucfc
        .raw()
        .checked_mul(ucfc_weight as u128)
        .and_then(|c| {
            ucfa.raw()
                .checked_mul(ucfa_weight as u128)
                .and_then(|a| c.checked_add(a))
        })
        .ok_or(ArithmeticError::Overflow)?;
    let total_weight = ucfc_weight as u128 + ucfa_weight as u128;
    if total_weight == 0 {
        return Err(ArithmeticError::DivisionByZero);
    }
    Ok(FixedPoint::from_raw(weighted / total_weight))
}

/// Inflation Discount Factor, never below `1 + epsilon_rate`
pub fn idf(
    ucf: FixedPoint,
    ucf_target: FixedPoint,
    epsilon_rate: FixedPoint,
    innovation: u128,
    devs_per_capital: u64,
) -> Result<FixedPoint, ArithmeticError> {
    let baseline = FixedPoint::ONE.checked_add(epsilon_rate)?;
    let deviation = ucf.saturating_sub(ucf_target);
    let discount = mul_div(deviation.raw(), innovation, devs_per_capital as u128)?;
    baseline.checked_add(FixedPoint::from_raw(discount))
}

/// Split `pool` pro rata to `weights`, rounding every share down
///
/// Returns the shares and their sum, which never exceeds `pool`.
pub fn distribute(
    pool: Amount,
    weights: &BTreeMap<Address, Amount>,
) -> Result<(BTreeMap<Address, Amount>, Amount), ArithmeticError> {
    let total_weight = weights
        .values()
        .try_fold(0u128, |acc, w| acc.checked_add(*w))
        .ok_or(ArithmeticError::Overflow)?;
    let mut shares = BTreeMap::new();
    if pool == 0 || total_weight == 0 {
        return Ok((shares, 0));
    }

    let mut distributed: Amount = 0;
    for (account, weight) in weights {
        let share = mul_div(pool, *weight, total_weight)?;
        if share > 0 {
            shares.insert(*account, share);
            distributed += share;
        }
    }
    Ok((shares, distributed))
}
