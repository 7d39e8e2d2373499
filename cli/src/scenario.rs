//! Scenario files
//!
//! A scenario describes the registries, the economics and the donations of a
//! simulated run. Amounts are written in whole tokens as decimal strings
//! (`"12.5"`), addresses as 0x-prefixed hex.

use crate::error::{Result, SimError};
use olas_core::{Address, Amount, FixedPoint, Timestamp};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;
use tokenomics::{RewardFractions, TokenomicsParameters};

fn default_epochs() -> u32 {
    4
}

fn default_start_time() -> Timestamp {
    1_700_000_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Number of epochs to run
    #[serde(default = "default_epochs")]
    pub epochs: u32,
    /// Launch time of the tokenomics
    #[serde(default = "default_start_time")]
    pub start_time: Timestamp,
    #[serde(default)]
    pub tokenomics: TokenomicsParameters,
    #[serde(default)]
    pub fractions: RewardFractions,
    /// Component owners; component ids are assigned from 1 in order
    #[serde(default)]
    pub components: Vec<UnitSpec>,
    /// Agent owners; agent ids are assigned from 1 in order
    #[serde(default)]
    pub agents: Vec<UnitSpec>,
    #[serde(default)]
    pub services: Vec<ServiceSpec>,
    #[serde(default)]
    pub stakers: Vec<StakerSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnitSpec {
    pub owner: Address,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSpec {
    pub id: u32,
    pub owner: Address,
    #[serde(default)]
    pub components: Vec<u32>,
    #[serde(default)]
    pub agents: Vec<u32>,
    /// Donated in every epoch
    #[serde(default)]
    pub donation: FixedPoint,
    /// Whether the owner is on the service owner whitelist
    #[serde(default)]
    pub whitelisted: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StakerSpec {
    pub account: Address,
    pub balance: FixedPoint,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| SimError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let scenario: Scenario = toml::from_str(&contents)?;
        scenario.validate()?;
        log::debug!(
            "Loaded scenario {:?}: {} services over {} epochs",
            path,
            scenario.services.len(),
            scenario.epochs
        );
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(SimError::Invalid("epochs must be positive".into()));
        }
        self.tokenomics.validate()?;
        self.fractions.validate()?;
        self.end_time()?;
        self.total_donations()?;

        let mut ids = BTreeSet::new();
        for service in &self.services {
            if service.id == 0 || !ids.insert(service.id) {
                return Err(SimError::Invalid(format!(
                    "service id {} is zero or repeated",
                    service.id
                )));
            }
            check_units(service.id, "component", &service.components, self.components.len())?;
            check_units(service.id, "agent", &service.agents, self.agents.len())?;
        }
        Ok(())
    }

    /// Donated by all services in one epoch, in base units
    pub fn donations_per_epoch(&self) -> Result<Amount> {
        self.services
            .iter()
            .try_fold(0u128, |total, s| total.checked_add(s.donation.raw()))
            .ok_or_else(|| SimError::Invalid("donations per epoch overflow".into()))
    }

    /// Donated over the whole run, in base units
    pub fn total_donations(&self) -> Result<Amount> {
        self.donations_per_epoch()?
            .checked_mul(self.epochs as u128)
            .ok_or_else(|| SimError::Invalid("total donations overflow".into()))
    }

    /// Close of the last epoch
    pub fn end_time(&self) -> Result<Timestamp> {
        (self.epochs as u64)
            .checked_mul(self.tokenomics.epoch_len)
            .and_then(|span| self.start_time.checked_add(span))
            .ok_or_else(|| SimError::Invalid("run ends past the last timestamp".into()))
    }
}

fn check_units(service: u32, kind: &str, units: &[u32], registered: usize) -> Result<()> {
    match units.iter().find(|u| **u == 0 || **u as usize > registered) {
        Some(unit) => Err(SimError::Invalid(format!(
            "service {} uses unknown {} {}",
            service, kind, unit
        ))),
        None => Ok(()),
    }
}
