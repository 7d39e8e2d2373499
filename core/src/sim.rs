//! In-memory collaborators
//!
//! A simulated ledger for tests and the `olas-sim` binary. Every collaborator
//! uses interior mutability so it can be shared behind `Arc` the way the
//! engine holds them.

use crate::address::{Address, Amount, Timestamp};
use crate::error::{ProtocolError, Result};
use crate::interfaces::{
    NativeBank, ProtocolToken, ReserveTokens, ServiceRegistry, UnitRegistry, UnitType,
    VotingEscrow,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Code that runs when an address receives native value
pub trait ValueReceiver: Send + Sync {
    /// Return `false` to reject the payment
    fn on_receive(&self, from: &Address, amount: Amount) -> bool;
}

/// Receiver that refuses every payment
pub struct RejectAll;

impl ValueReceiver for RejectAll {
    fn on_receive(&self, _from: &Address, _amount: Amount) -> bool {
        false
    }
}

/// Native balances with optional receiver hooks
#[derive(Default)]
pub struct SimBank {
    balances: Mutex<HashMap<Address, Amount>>,
    receivers: Mutex<HashMap<Address, Arc<dyn ValueReceiver>>>,
}

impl SimBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create value out of thin air, e.g. funding a test account
    pub fn credit(&self, account: &Address, amount: Amount) {
        *self.balances.lock().entry(*account).or_insert(0) += amount;
    }

    pub fn set_receiver(&self, account: Address, receiver: Arc<dyn ValueReceiver>) {
        self.receivers.lock().insert(account, receiver);
    }

    /// Move value as part of a call, without running the recipient's hook
    pub fn attach_value(&self, from: &Address, to: &Address, amount: Amount) -> bool {
        self.debit_credit(from, to, amount)
    }

    fn debit_credit(&self, from: &Address, to: &Address, amount: Amount) -> bool {
        let mut balances = self.balances.lock();
        let available = balances.get(from).copied().unwrap_or(0);
        if available < amount {
            return false;
        }
        balances.insert(*from, available - amount);
        *balances.entry(*to).or_insert(0) += amount;
        true
    }
}

impl NativeBank for SimBank {
    fn send_value(&self, from: &Address, to: &Address, amount: Amount) -> bool {
        if !self.debit_credit(from, to, amount) {
            return false;
        }
        // The hook runs with no bank lock held so it may call back in
        let receiver = self.receivers.lock().get(to).cloned();
        if let Some(receiver) = receiver {
            if !receiver.on_receive(from, amount) {
                let reverted = self.debit_credit(to, from, amount);
                debug_assert!(reverted, "rejected payment could not be reverted");
                return false;
            }
        }
        true
    }

    fn balance_of(&self, account: &Address) -> Amount {
        self.balances.lock().get(account).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct SimService {
    pub owner: Address,
    pub components: Vec<u32>,
    pub agents: Vec<u32>,
}

/// Service registry holding services and a slashed-funds balance
pub struct SimServiceRegistry {
    address: Address,
    bank: Arc<SimBank>,
    services: Mutex<BTreeMap<u32, SimService>>,
    slashed_funds: Mutex<Amount>,
    drainer: Mutex<Address>,
}

impl SimServiceRegistry {
    pub fn new(address: Address, bank: Arc<SimBank>) -> Self {
        Self {
            address,
            bank,
            services: Mutex::new(BTreeMap::new()),
            slashed_funds: Mutex::new(0),
            drainer: Mutex::new(Address::ZERO),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn register_service(&self, service_id: u32, service: SimService) {
        self.services.lock().insert(service_id, service);
    }

    /// Owners of every registered service, in service id order
    pub fn service_owners(&self) -> Vec<Address> {
        self.services.lock().values().map(|s| s.owner).collect()
    }

    pub fn change_drainer(&self, drainer: Address) {
        *self.drainer.lock() = drainer;
    }

    /// Record slashed collateral, backed by native value held by the registry
    pub fn slash(&self, amount: Amount) {
        self.bank.credit(&self.address, amount);
        *self.slashed_funds.lock() += amount;
    }
}

impl ServiceRegistry for SimServiceRegistry {
    fn exists(&self, service_id: u32) -> bool {
        self.services.lock().contains_key(&service_id)
    }

    fn owner_of(&self, service_id: u32) -> Option<Address> {
        self.services.lock().get(&service_id).map(|s| s.owner)
    }

    fn units(&self, service_id: u32, unit_type: UnitType) -> Vec<u32> {
        self.services
            .lock()
            .get(&service_id)
            .map(|s| match unit_type {
                UnitType::Component => s.components.clone(),
                UnitType::Agent => s.agents.clone(),
            })
            .unwrap_or_default()
    }

    fn slashed_funds(&self) -> Amount {
        *self.slashed_funds.lock()
    }

    fn drain(&self, drainer: &Address) -> Result<Amount> {
        let expected = *self.drainer.lock();
        if expected.is_zero() || *drainer != expected {
            return Err(ProtocolError::ManagerOnly {
                sender: drainer.to_string(),
                manager: expected.to_string(),
                role: "drainer",
            });
        }
        let amount = std::mem::take(&mut *self.slashed_funds.lock());
        if amount == 0 {
            return Ok(0);
        }
        if !self.bank.send_value(&self.address, drainer, amount) {
            *self.slashed_funds.lock() += amount;
            return Err(ProtocolError::TransferFailed {
                from: self.address.to_string(),
                to: drainer.to_string(),
                amount,
            });
        }
        Ok(amount)
    }
}

/// Component or agent registry; unit ids start at 1
#[derive(Default)]
pub struct SimUnitRegistry {
    owners: Mutex<Vec<Address>>,
}

impl SimUnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unit and return its id
    pub fn create(&self, owner: Address) -> u32 {
        let mut owners = self.owners.lock();
        owners.push(owner);
        owners.len() as u32
    }
}

impl UnitRegistry for SimUnitRegistry {
    fn total_supply(&self) -> u32 {
        self.owners.lock().len() as u32
    }

    fn owner_of(&self, unit_id: u32) -> Option<Address> {
        let index = unit_id.checked_sub(1)? as usize;
        self.owners.lock().get(index).copied()
    }
}

/// Protocol token with a single minter
pub struct SimToken {
    minter: Mutex<Address>,
    balances: Mutex<HashMap<Address, Amount>>,
    total_supply: Mutex<Amount>,
}

impl SimToken {
    pub fn new(minter: Address) -> Self {
        Self {
            minter: Mutex::new(minter),
            balances: Mutex::new(HashMap::new()),
            total_supply: Mutex::new(0),
        }
    }

    pub fn change_minter(&self, minter: Address) {
        *self.minter.lock() = minter;
    }
}

impl ProtocolToken for SimToken {
    fn minter(&self) -> Address {
        *self.minter.lock()
    }

    fn mint(&self, minter: &Address, to: &Address, amount: Amount) -> Result<()> {
        let expected = self.minter();
        if *minter != expected {
            return Err(ProtocolError::ManagerOnly {
                sender: minter.to_string(),
                manager: expected.to_string(),
                role: "minter",
            });
        }
        let mut supply = self.total_supply.lock();
        *supply = supply
            .checked_add(amount)
            .ok_or(crate::fixed::ArithmeticError::Overflow)?;
        *self.balances.lock().entry(*to).or_insert(0) += amount;
        Ok(())
    }

    fn total_supply(&self) -> Amount {
        *self.total_supply.lock()
    }

    fn balance_of(&self, account: &Address) -> Amount {
        self.balances.lock().get(account).copied().unwrap_or(0)
    }
}

/// Multi-token balances with allowances
#[derive(Default)]
pub struct SimReserveTokens {
    balances: Mutex<HashMap<(Address, Address), Amount>>,
    allowances: Mutex<HashMap<(Address, Address, Address), Amount>>,
}

impl SimReserveTokens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(&self, token: &Address, to: &Address, amount: Amount) {
        *self.balances.lock().entry((*token, *to)).or_insert(0) += amount;
    }

    pub fn approve(&self, token: &Address, owner: &Address, spender: &Address, amount: Amount) {
        self.allowances
            .lock()
            .insert((*token, *owner, *spender), amount);
    }

    fn move_balance(&self, token: &Address, from: &Address, to: &Address, amount: Amount) -> bool {
        let mut balances = self.balances.lock();
        let available = balances.get(&(*token, *from)).copied().unwrap_or(0);
        if available < amount {
            return false;
        }
        balances.insert((*token, *from), available - amount);
        *balances.entry((*token, *to)).or_insert(0) += amount;
        true
    }
}

impl ReserveTokens for SimReserveTokens {
    fn transfer_from(
        &self,
        token: &Address,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> bool {
        let key = (*token, *from, *spender);
        let allowance = self.allowances.lock().get(&key).copied().unwrap_or(0);
        if allowance < amount || !self.move_balance(token, from, to, amount) {
            return false;
        }
        self.allowances.lock().insert(key, allowance - amount);
        true
    }

    fn transfer(&self, token: &Address, from: &Address, to: &Address, amount: Amount) -> bool {
        self.move_balance(token, from, to, amount)
    }

    fn balance_of(&self, token: &Address, account: &Address) -> Amount {
        self.balances
            .lock()
            .get(&(*token, *account))
            .copied()
            .unwrap_or(0)
    }
}

/// Voting escrow with balances that do not decay over time
#[derive(Default)]
pub struct SimVotingEscrow {
    balances: Mutex<BTreeMap<Address, Amount>>,
}

impl SimVotingEscrow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&self, account: Address, amount: Amount) {
        self.balances.lock().insert(account, amount);
    }
}

impl VotingEscrow for SimVotingEscrow {
    fn balance_of_at(&self, account: &Address, _timestamp: Timestamp) -> Amount {
        self.balances.lock().get(account).copied().unwrap_or(0)
    }

    fn total_supply_at(&self, _timestamp: Timestamp) -> Amount {
        self.balances.lock().values().sum()
    }
}
