//! Runs a scenario on the simulated ledger
//!
//! Each epoch the donor funds every service, time advances by one epoch
//! length and the engine checkpoints against the treasury. The dispenser then
//! pays out every accrued owner incentive. Staker incentives are claimed once,
//! after the last epoch.

use crate::error::{Result, SimError};
use crate::scenario::Scenario;
use olas_core::sim::{
    SimBank, SimReserveTokens, SimService, SimServiceRegistry, SimToken, SimUnitRegistry,
    SimVotingEscrow,
};
use olas_core::{amount_serde, Address, Amount, CallContext, ProtocolToken, Timestamp};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokenomics::{EpochPoint, Registries, Tokenomics, TokenomicsConfig};
use treasury::{Collaborators, Treasury, TreasuryConfig, TreasuryReport};

/// Well-known actors of a simulated deployment
pub mod actors {
    use olas_core::Address;

    pub const OWNER: Address = Address::from_low_u64(0x0a);
    pub const DEPOSITORY: Address = Address::from_low_u64(0x0b);
    pub const DISPENSER: Address = Address::from_low_u64(0x0c);
    pub const DONOR: Address = Address::from_low_u64(0x0d);
    pub const TREASURY: Address = Address::from_low_u64(0x7ea);
    pub const TOKENOMICS: Address = Address::from_low_u64(0x70c);
    pub const SERVICE_REGISTRY: Address = Address::from_low_u64(0x5e7);
}

/// A payout made by the dispenser
#[derive(Debug, Clone, Serialize)]
pub struct Payout {
    pub account: Address,
    #[serde(with = "amount_serde")]
    pub reward: Amount,
    #[serde(with = "amount_serde")]
    pub top_up: Amount,
}

#[derive(Debug, Clone, Serialize)]
pub struct EpochReport {
    pub point: EpochPoint,
    pub owner_payouts: Vec<Payout>,
    #[serde(with = "amount_serde")]
    pub eth_owned: Amount,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub epochs: Vec<EpochReport>,
    pub staker_payouts: Vec<Payout>,
    pub treasury: TreasuryReport,
    #[serde(with = "amount_serde")]
    pub olas_minted: Amount,
}

pub struct Simulation {
    scenario: Scenario,
    tokenomics: Tokenomics,
    treasury: Treasury,
    bank: Arc<SimBank>,
    olas: Arc<SimToken>,
    unit_owners: BTreeSet<Address>,
}

impl Simulation {
    /// Deploy registries, engine and treasury as the scenario describes
    pub fn new(scenario: Scenario) -> Result<Self> {
        scenario.validate()?;

        let bank = Arc::new(SimBank::new());
        bank.credit(&actors::DONOR, scenario.total_donations()?);
        let olas = Arc::new(SimToken::new(actors::TREASURY));

        let services = Arc::new(SimServiceRegistry::new(
            actors::SERVICE_REGISTRY,
            bank.clone(),
        ));
        services.change_drainer(actors::TREASURY);
        for service in &scenario.services {
            services.register_service(
                service.id,
                SimService {
                    owner: service.owner,
                    components: service.components.clone(),
                    agents: service.agents.clone(),
                },
            );
        }

        let components = Arc::new(SimUnitRegistry::new());
        let agents = Arc::new(SimUnitRegistry::new());
        let mut unit_owners = BTreeSet::new();
        for unit in &scenario.components {
            components.create(unit.owner);
            unit_owners.insert(unit.owner);
        }
        for unit in &scenario.agents {
            agents.create(unit.owner);
            unit_owners.insert(unit.owner);
        }

        let escrow = Arc::new(SimVotingEscrow::new());
        for staker in &scenario.stakers {
            escrow.set_balance(staker.account, staker.balance.raw());
        }

        let treasury = Treasury::new(
            actors::TREASURY,
            TreasuryConfig {
                owner: actors::OWNER,
                tokenomics: actors::TOKENOMICS,
                depository: actors::DEPOSITORY,
                dispenser: actors::DISPENSER,
            },
            Collaborators {
                olas: olas.clone(),
                tokens: Arc::new(SimReserveTokens::new()),
                bank: bank.clone(),
                services: services.clone(),
            },
        )?;

        let mut tokenomics = Tokenomics::new(
            actors::TOKENOMICS,
            TokenomicsConfig {
                owner: actors::OWNER,
                treasury: actors::TREASURY,
                depository: actors::DEPOSITORY,
                dispenser: actors::DISPENSER,
                params: scenario.tokenomics.clone(),
                fractions: scenario.fractions,
            },
            Registries {
                services,
                components,
                agents,
                voting_escrow: escrow,
            },
            scenario.start_time,
        )?;

        let whitelist: Vec<Address> = scenario
            .services
            .iter()
            .filter(|s| s.whitelisted)
            .map(|s| s.owner)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let permissions = vec![true; whitelist.len()];
        tokenomics.change_service_owner_whitelist(&actors::OWNER, &whitelist, &permissions)?;

        Ok(Self {
            scenario,
            tokenomics,
            treasury,
            bank,
            olas,
            unit_owners,
        })
    }

    /// Run every epoch; `new` has checked that the run fits in the timeline
    pub fn run(mut self) -> Result<SimulationReport> {
        let end = self.scenario.end_time()?;
        let epoch_len = self.scenario.tokenomics.epoch_len;
        let start = self.scenario.start_time;
        let mut epochs = Vec::new();

        for epoch in 1..=self.scenario.epochs as u64 {
            let opened = start + (epoch - 1) * epoch_len;
            self.donate(opened + 1)?;

            let now = start + epoch * epoch_len;
            let ctx = CallContext::new(actors::OWNER, now);
            if !self.tokenomics.checkpoint(&ctx, &self.treasury)? {
                log::warn!("Epoch {} did not close at {}", epoch, now);
                continue;
            }

            let owner_payouts = self.pay_owners(now)?;
            epochs.push(EpochReport {
                point: self.tokenomics.get_last_point(),
                owner_payouts,
                eth_owned: self.treasury.eth_owned(),
            });
        }

        let staker_payouts = self.pay_stakers(end)?;

        Ok(SimulationReport {
            epochs,
            staker_payouts,
            treasury: self.treasury.report(),
            olas_minted: self.olas.total_supply(),
        })
    }

    fn donate(&mut self, now: Timestamp) -> Result<()> {
        let (ids, amounts): (Vec<u32>, Vec<Amount>) = self
            .scenario
            .services
            .iter()
            .filter(|s| s.donation.raw() > 0)
            .map(|s| (s.id, s.donation.raw()))
            .unzip();
        if ids.is_empty() {
            return Ok(());
        }

        let total = self.scenario.donations_per_epoch()?;
        if !self
            .bank
            .attach_value(&actors::DONOR, &actors::TREASURY, total)
        {
            return Err(SimError::Invalid("donor ran out of funds".into()));
        }
        let ctx = CallContext::new(actors::DONOR, now).with_value(total);
        self.treasury
            .deposit_service_donations_eth(&ctx, &mut self.tokenomics, &ids, &amounts)?;
        Ok(())
    }

    /// Pay every owner with accrued incentives; an unpaid accrual stays claimable
    fn pay_owners(&mut self, now: Timestamp) -> Result<Vec<Payout>> {
        let ctx = CallContext::new(actors::DISPENSER, now);
        let mut payouts = Vec::new();
        for owner in &self.unit_owners {
            let incentives = self.tokenomics.account_owner_incentives(owner);
            if incentives.is_zero() {
                continue;
            }
            if !self
                .treasury
                .withdraw_to_account(&ctx, owner, incentives.reward, incentives.top_up)?
            {
                log::warn!("Treasury could not cover incentives of {}", owner);
                continue;
            }
            self.tokenomics.take_owner_incentives(&actors::DISPENSER, owner)?;
            payouts.push(Payout {
                account: *owner,
                reward: incentives.reward,
                top_up: incentives.top_up,
            });
        }
        Ok(payouts)
    }

    fn pay_stakers(&mut self, now: Timestamp) -> Result<Vec<Payout>> {
        let ctx = CallContext::new(actors::DISPENSER, now);
        let mut payouts = Vec::new();
        for staker in &self.scenario.stakers {
            let earned = self
                .tokenomics
                .calculate_staking_rewards(&staker.account, 1)?;
            if earned.end_epoch <= self.tokenomics.get_last_point().epoch {
                log::info!(
                    "Staker {} reached the walk limit at epoch {}",
                    staker.account,
                    earned.end_epoch
                );
            }
            if self
                .treasury
                .withdraw_to_account(&ctx, &staker.account, earned.reward, earned.top_up)?
            {
                payouts.push(Payout {
                    account: staker.account,
                    reward: earned.reward,
                    top_up: earned.top_up,
                });
            }
        }
        Ok(payouts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use olas_core::{NativeBank, E18, NATIVE_TOKEN};

    const ONE_SERVICE: &str = r#"
        epochs = 1

        [tokenomics]
        epoch_len = 100

        [[components]]
        owner = "0x00000000000000000000000000000000000000c1"

        [[services]]
        id = 1
        owner = "0x00000000000000000000000000000000000000f1"
        components = [1]
        donation = "10"
        whitelisted = true
    "#;

    #[test]
    fn test_unpaid_owner_keeps_incentives() {
        let scenario: Scenario = toml::from_str(ONE_SERVICE).unwrap();
        let start = scenario.start_time;
        let developer = scenario.components[0].owner;
        let mut sim = Simulation::new(scenario).unwrap();

        sim.donate(start + 1).unwrap();
        let ctx = CallContext::new(actors::OWNER, start + 100);
        assert!(sim.tokenomics.checkpoint(&ctx, &sim.treasury).unwrap());
        let accrued = sim.tokenomics.account_owner_incentives(&developer);
        assert_eq!(accrued.reward, 5 * E18 / 2);

        // Owner empties the treasury before the dispenser runs
        let owned = sim.treasury.eth_owned();
        assert!(sim
            .treasury
            .withdraw(&ctx, &actors::OWNER, owned, NATIVE_TOKEN)
            .unwrap());
        assert!(sim.pay_owners(start + 100).unwrap().is_empty());
        assert_eq!(sim.tokenomics.account_owner_incentives(&developer), accrued);

        sim.bank.credit(&actors::DONOR, owned);
        assert!(sim
            .bank
            .attach_value(&actors::DONOR, &actors::TREASURY, owned));
        sim.treasury
            .receive_eth(&CallContext::new(actors::DONOR, start + 100).with_value(owned))
            .unwrap();

        let payouts = sim.pay_owners(start + 100).unwrap();
        assert_eq!(payouts.len(), 1);
        assert_eq!(payouts[0].reward, accrued.reward);
        assert_eq!(sim.bank.balance_of(&developer), accrued.reward);
        assert!(sim.tokenomics.account_owner_incentives(&developer).is_zero());
    }
}
