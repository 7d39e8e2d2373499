//! Owner / manager role registry
//!
//! Each unit (tokenomics, treasury) keeps its own registry with one owner and
//! a fixed set of manager roles. A zero manager address means the role is
//! disabled.

use crate::address::Address;
use crate::error::{ProtocolError, Result};
use std::collections::BTreeMap;
use std::fmt::Debug;

/// A manager role of a particular unit
pub trait Role: Copy + Eq + Ord + Debug + 'static {
    /// Every role of the unit
    const ALL: &'static [Self];

    fn name(self) -> &'static str;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessControl<R: Role> {
    owner: Address,
    managers: BTreeMap<R, Address>,
}

impl<R: Role> AccessControl<R> {
    /// Create a registry; unspecified roles start disabled
    pub fn new(owner: Address, managers: impl IntoIterator<Item = (R, Address)>) -> Result<Self> {
        if owner.is_zero() {
            return Err(ProtocolError::ZeroAddress);
        }
        let mut all: BTreeMap<R, Address> = R::ALL.iter().map(|r| (*r, Address::ZERO)).collect();
        all.extend(managers);
        Ok(Self {
            owner,
            managers: all,
        })
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn manager(&self, role: R) -> Address {
        self.managers.get(&role).copied().unwrap_or(Address::ZERO)
    }

    pub fn ensure_owner(&self, sender: &Address) -> Result<()> {
        if *sender != self.owner {
            return Err(ProtocolError::OwnerOnly {
                sender: sender.to_string(),
                owner: self.owner.to_string(),
            });
        }
        Ok(())
    }

    /// A disabled (zero) manager can never be matched
    pub fn ensure_manager(&self, role: R, sender: &Address) -> Result<()> {
        let manager = self.manager(role);
        if manager.is_zero() || *sender != manager {
            return Err(ProtocolError::ManagerOnly {
                sender: sender.to_string(),
                manager: manager.to_string(),
                role: role.name(),
            });
        }
        Ok(())
    }

    pub fn change_owner(&mut self, sender: &Address, new_owner: Address) -> Result<()> {
        self.ensure_owner(sender)?;
        if new_owner.is_zero() {
            return Err(ProtocolError::ZeroAddress);
        }
        log::info!("Owner changed from {} to {}", self.owner, new_owner);
        self.owner = new_owner;
        Ok(())
    }

    /// Replace managers; a zero address leaves that role unchanged
    pub fn change_managers(&mut self, sender: &Address, updates: &[(R, Address)]) -> Result<()> {
        self.ensure_owner(sender)?;
        for (role, address) in updates {
            if address.is_zero() {
                continue;
            }
            log::info!("Manager {} set to {}", role.name(), address);
            self.managers.insert(*role, *address);
        }
        Ok(())
    }
}
