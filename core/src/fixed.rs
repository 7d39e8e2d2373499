//! 18-decimal fixed-point arithmetic
//!
//! Every ratio and monetary value in the engine is an unsigned integer scaled
//! by 10^18. Products and quotients go through a 256-bit intermediate so that
//! `a * b / SCALE` never overflows before the final range check.

use primitive_types::U256;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of decimal places carried by [`FixedPoint`]
pub const DECIMALS: u32 = 18;

/// 10^18
pub const SCALE: u128 = 1_000_000_000_000_000_000;

/// Arithmetic failures of the fixed-point layer
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticError {
    #[error("Arithmetic underflow")]
    Underflow,

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Division by zero")]
    DivisionByZero,
}

/// Failure to parse a decimal string into a [`FixedPoint`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid fixed-point literal: {0}")]
pub struct ParseFixedError(pub String);

/// Unsigned fixed-point number with 18 decimals
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FixedPoint(u128);

impl FixedPoint {
    pub const ZERO: FixedPoint = FixedPoint(0);
    pub const ONE: FixedPoint = FixedPoint(SCALE);

    /// Wrap an already scaled value
    pub const fn from_raw(raw: u128) -> Self {
        FixedPoint(raw)
    }

    /// The scaled integer representation
    pub const fn raw(self) -> u128 {
        self.0
    }

    pub fn from_integer(value: u128) -> Result<Self, ArithmeticError> {
        value
            .checked_mul(SCALE)
            .map(FixedPoint)
            .ok_or(ArithmeticError::Overflow)
    }

    /// `numerator / denominator` as a fixed-point value
    pub fn from_ratio(numerator: u128, denominator: u128) -> Result<Self, ArithmeticError> {
        mul_div(numerator, SCALE, denominator).map(FixedPoint)
    }

    /// A whole percentage, `from_percent(25) == 0.25`
    pub fn from_percent(percent: u64) -> Self {
        FixedPoint(percent as u128 * (SCALE / 100))
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Result<Self, ArithmeticError> {
        self.0
            .checked_add(other.0)
            .map(FixedPoint)
            .ok_or(ArithmeticError::Overflow)
    }

    pub fn checked_sub(self, other: Self) -> Result<Self, ArithmeticError> {
        self.0
            .checked_sub(other.0)
            .map(FixedPoint)
            .ok_or(ArithmeticError::Underflow)
    }

    pub fn checked_mul(self, other: Self) -> Result<Self, ArithmeticError> {
        mul_div(self.0, other.0, SCALE).map(FixedPoint)
    }

    pub fn checked_div(self, other: Self) -> Result<Self, ArithmeticError> {
        mul_div(self.0, SCALE, other.0).map(FixedPoint)
    }

    pub fn saturating_add(self, other: Self) -> Self {
        FixedPoint(self.0.saturating_add(other.0))
    }

    /// `self - other`, or zero when `other` is larger
    pub fn saturating_sub(self, other: Self) -> Self {
        FixedPoint(self.0.saturating_sub(other.0))
    }

    /// Apply this ratio to a base-unit amount: `amount * self`
    pub fn mul_amount(self, amount: u128) -> Result<u128, ArithmeticError> {
        mul_div(amount, self.0, SCALE)
    }
}

/// `a * b / denominator` with a 256-bit intermediate, rounding down
pub fn mul_div(a: u128, b: u128, denominator: u128) -> Result<u128, ArithmeticError> {
    if denominator == 0 {
        return Err(ArithmeticError::DivisionByZero);
    }
    let product = U256::from(a)
        .checked_mul(U256::from(b))
        .ok_or(ArithmeticError::Overflow)?;
    let quotient = product / U256::from(denominator);
    if quotient > U256::from(u128::MAX) {
        return Err(ArithmeticError::Overflow);
    }
    Ok(quotient.as_u128())
}

impl fmt::Display for FixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let integer = self.0 / SCALE;
        let fraction = self.0 % SCALE;
        if fraction == 0 {
            return write!(f, "{}", integer);
        }
        let digits = format!("{:018}", fraction);
        write!(f, "{}.{}", integer, digits.trim_end_matches('0'))
    }
}

impl FromStr for FixedPoint {
    type Err = ParseFixedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseFixedError(s.to_string());
        let s = s.trim();
        let (integer, fraction) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        if integer.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        if fraction.len() > DECIMALS as usize
            || !integer.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let integer: u128 = if integer.is_empty() {
            0
        } else {
            integer.parse().map_err(|_| invalid())?
        };
        let fraction: u128 = if fraction.is_empty() {
            0
        } else {
            let padded = format!("{:0<18}", fraction);
            padded.parse().map_err(|_| invalid())?
        };

        integer
            .checked_mul(SCALE)
            .and_then(|scaled| scaled.checked_add(fraction))
            .map(FixedPoint)
            .ok_or_else(invalid)
    }
}

impl Serialize for FixedPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FixedPoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FixedVisitor;

        impl<'de> Visitor<'de> for FixedVisitor {
            type Value = FixedPoint;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a decimal string or a whole number")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<FixedPoint, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<FixedPoint, E> {
                FixedPoint::from_integer(v as u128).map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<FixedPoint, E> {
                let v = u64::try_from(v).map_err(|_| E::custom("negative fixed-point value"))?;
                self.visit_u64(v)
            }
        }

        deserializer.deserialize_any(FixedVisitor)
    }
}
