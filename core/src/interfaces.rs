//! Collaborator interfaces
//!
//! The registries, tokens, native-value bank and voting escrow live outside
//! the engine. The last two traits are the narrow capabilities the tokenomics
//! engine and the treasury expose to each other, so neither needs a handle on
//! the other's whole state.

use crate::address::{Address, Amount, Timestamp};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Class of a registered code unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UnitType {
    Component,
    Agent,
}

impl UnitType {
    pub const ALL: [UnitType; 2] = [UnitType::Component, UnitType::Agent];
}

/// Registry of autonomous services
pub trait ServiceRegistry: Send + Sync {
    fn exists(&self, service_id: u32) -> bool;

    fn owner_of(&self, service_id: u32) -> Option<Address>;

    /// Units of the given class the service is built from
    fn units(&self, service_id: u32, unit_type: UnitType) -> Vec<u32>;

    fn slashed_funds(&self) -> Amount;

    /// Send the whole slashed-funds balance to `drainer` and return it
    fn drain(&self, drainer: &Address) -> Result<Amount>;
}

/// Registry of components or agents
pub trait UnitRegistry: Send + Sync {
    fn total_supply(&self) -> u32;

    fn owner_of(&self, unit_id: u32) -> Option<Address>;
}

/// The protocol token, mintable by a single minter
pub trait ProtocolToken: Send + Sync {
    fn minter(&self) -> Address;

    fn mint(&self, minter: &Address, to: &Address, amount: Amount) -> Result<()>;

    fn total_supply(&self) -> Amount;

    fn balance_of(&self, account: &Address) -> Amount;
}

/// Fungible reserve tokens addressed by token identifier
pub trait ReserveTokens: Send + Sync {
    /// Move `amount` from `from` to `to` using the allowance granted to `spender`
    fn transfer_from(
        &self,
        token: &Address,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> bool;

    fn transfer(&self, token: &Address, from: &Address, to: &Address, amount: Amount) -> bool;

    fn balance_of(&self, token: &Address, account: &Address) -> Amount;
}

/// Native value transfers; reports rejection instead of failing
pub trait NativeBank: Send + Sync {
    fn send_value(&self, from: &Address, to: &Address, amount: Amount) -> bool;

    fn balance_of(&self, account: &Address) -> Amount;
}

/// Staking balances used to share staker rewards
pub trait VotingEscrow: Send + Sync {
    fn balance_of_at(&self, account: &Address, timestamp: Timestamp) -> Amount;

    fn total_supply_at(&self, timestamp: Timestamp) -> Amount;
}

/// What the treasury needs from the tokenomics engine
pub trait RevenueTracker {
    fn track_services_eth_revenue(
        &mut self,
        sender: &Address,
        service_ids: &[u32],
        amounts: &[Amount],
    ) -> Result<()>;
}

/// What the tokenomics engine needs from the treasury
pub trait RewardsAllocator {
    /// Move `amount` of collected service revenue into protocol-owned funds
    fn rebalance_treasury(&self, sender: &Address, amount: Amount) -> Result<bool>;
}
