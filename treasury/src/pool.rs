//! Treasury Pool Management
//!
//! Pure bookkeeping of the treasury's native balances and reserve tokens. The
//! pool never moves value itself; [`crate::Treasury`] pairs each pool update
//! with the matching collaborator transfer.

use olas_core::{amount_serde, Address, Amount, ArithmeticError, ProtocolError, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Native balances and token reserves
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreasuryPool {
    /// Donations received for services, not yet settled by a checkpoint
    eth_from_services: Amount,
    /// Protocol-owned native value, the source of every payout
    eth_owned: Amount,
    reserves: BTreeMap<Address, Amount>,
    enabled_tokens: BTreeSet<Address>,
}

impl TreasuryPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eth_from_services(&self) -> Amount {
        self.eth_from_services
    }

    pub fn eth_owned(&self) -> Amount {
        self.eth_owned
    }

    pub fn token_reserve(&self, token: &Address) -> Amount {
        self.reserves.get(token).copied().unwrap_or(0)
    }

    pub fn is_enabled(&self, token: &Address) -> bool {
        self.enabled_tokens.contains(token)
    }

    /// Returns `false` if the token was already enabled
    pub fn enable_token(&mut self, token: Address) -> bool {
        self.enabled_tokens.insert(token)
    }

    /// Returns `false` if the token was not enabled
    ///
    /// A token still backing a reserve cannot be disabled.
    pub fn disable_token(&mut self, token: &Address) -> Result<bool> {
        let reserve = self.token_reserve(token);
        if reserve > 0 {
            return Err(ProtocolError::NonZeroValue(reserve));
        }
        Ok(self.enabled_tokens.remove(token))
    }

    pub fn credit_services(&mut self, amount: Amount) -> Result<()> {
        self.eth_from_services = checked_credit(self.eth_from_services, amount)?;
        Ok(())
    }

    pub fn credit_owned(&mut self, amount: Amount) -> Result<()> {
        self.eth_owned = checked_credit(self.eth_owned, amount)?;
        Ok(())
    }

    /// Move settled revenue into protocol-owned funds
    ///
    /// Returns `false` without any change when `amount` exceeds what was
    /// collected from services.
    pub fn rebalance(&mut self, amount: Amount) -> Result<bool> {
        if amount > self.eth_from_services {
            return Ok(false);
        }
        let owned = checked_credit(self.eth_owned, amount)?;
        self.eth_from_services -= amount;
        self.eth_owned = owned;
        Ok(true)
    }

    pub fn debit_owned(&mut self, amount: Amount) -> Result<()> {
        if amount > self.eth_owned {
            return Err(ProtocolError::AmountLowerThan {
                requested: amount,
                available: self.eth_owned,
            });
        }
        self.eth_owned -= amount;
        Ok(())
    }

    pub fn credit_reserve(&mut self, token: Address, amount: Amount) -> Result<()> {
        let reserve = checked_credit(self.token_reserve(&token), amount)?;
        self.set_reserve(token, reserve);
        Ok(())
    }

    pub fn debit_reserve(&mut self, token: Address, amount: Amount) -> Result<()> {
        let reserve = self.token_reserve(&token);
        if amount > reserve {
            return Err(ProtocolError::AmountLowerThan {
                requested: amount,
                available: reserve,
            });
        }
        self.set_reserve(token, reserve - amount);
        Ok(())
    }

    fn set_reserve(&mut self, token: Address, amount: Amount) {
        if amount == 0 {
            self.reserves.remove(&token);
        } else {
            self.reserves.insert(token, amount);
        }
    }

    /// Summary of every balance
    pub fn report(&self) -> TreasuryReport {
        TreasuryReport {
            eth_from_services: self.eth_from_services,
            eth_owned: self.eth_owned,
            reserves: self.reserves.clone(),
            enabled_tokens: self.enabled_tokens.iter().copied().collect(),
        }
    }
}

fn checked_credit(balance: Amount, amount: Amount) -> Result<Amount> {
    Ok(balance
        .checked_add(amount)
        .ok_or(ArithmeticError::Overflow)?)
}

/// Point-in-time view of the pool, for reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreasuryReport {
    #[serde(with = "amount_serde")]
    pub eth_from_services: Amount,
    #[serde(with = "amount_serde")]
    pub eth_owned: Amount,
    #[serde(serialize_with = "serialize_reserves")]
    pub reserves: BTreeMap<Address, Amount>,
    pub enabled_tokens: Vec<Address>,
}

fn serialize_reserves<S: serde::Serializer>(
    reserves: &BTreeMap<Address, Amount>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    use serde::ser::SerializeMap;
    let mut map = serializer.serialize_map(Some(reserves.len()))?;
    for (token, amount) in reserves {
        map.serialize_entry(&token.to_string(), &amount.to_string())?;
    }
    map.end()
}
