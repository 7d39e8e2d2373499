//! The tokenomics epoch engine
//!
//! Revenue tracked by the treasury accumulates in the open epoch. A
//! checkpoint closes the epoch once `epoch_len` seconds have passed: it
//! computes UCF and IDF, partitions the revenue and the epoch's share of
//! inflation, asks the treasury to take the revenue into protocol-owned funds
//! and, only if that succeeds, commits a new [`EpochPoint`].

use crate::coefficients::{aggregate_ucf, distribute, idf, unit_ucf};
use crate::inflation::{year_at, InflationState};
use crate::params::{RewardFractions, TokenomicsParameters};
use crate::point::{EpochPoint, PointHistory, UnitPoint};
use olas_core::{
    amount_serde, mul_div, AccessControl, Address, Amount, ArithmeticError, CallContext,
    FixedPoint, ProtocolError, Result, RevenueTracker, RewardsAllocator, Role, ServiceRegistry,
    Timestamp, UnitRegistry, UnitType, VotingEscrow, ONE_YEAR,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Manager roles of the tokenomics unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TokenomicsRole {
    Treasury,
    Depository,
    Dispenser,
}

impl Role for TokenomicsRole {
    const ALL: &'static [Self] = &[
        TokenomicsRole::Treasury,
        TokenomicsRole::Depository,
        TokenomicsRole::Dispenser,
    ];

    fn name(self) -> &'static str {
        match self {
            TokenomicsRole::Treasury => "treasury",
            TokenomicsRole::Depository => "depository",
            TokenomicsRole::Dispenser => "dispenser",
        }
    }
}

/// Initial roles and economics of a tokenomics instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenomicsConfig {
    pub owner: Address,
    pub treasury: Address,
    pub depository: Address,
    pub dispenser: Address,
    #[serde(default)]
    pub params: TokenomicsParameters,
    #[serde(default)]
    pub fractions: RewardFractions,
}

/// External registries the engine reads from
#[derive(Clone)]
pub struct Registries {
    pub services: Arc<dyn ServiceRegistry>,
    pub components: Arc<dyn UnitRegistry>,
    pub agents: Arc<dyn UnitRegistry>,
    pub voting_escrow: Arc<dyn VotingEscrow>,
}

/// Rewards (native) and top-ups (minted) owed to an account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incentives {
    #[serde(with = "amount_serde")]
    pub reward: Amount,
    #[serde(with = "amount_serde")]
    pub top_up: Amount,
}

impl Incentives {
    pub fn is_zero(&self) -> bool {
        self.reward == 0 && self.top_up == 0
    }
}

/// Result of a staking reward walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StakingIncentives {
    #[serde(with = "amount_serde")]
    pub reward: Amount,
    #[serde(with = "amount_serde")]
    pub top_up: Amount,
    /// First epoch not included in the walk
    pub end_epoch: u32,
}

/// Everything a checkpoint computes before anything is committed
struct Settlement {
    point: EpochPoint,
    incentives: BTreeMap<Address, Incentives>,
    new_units: BTreeMap<UnitType, BTreeSet<u32>>,
    new_owners: BTreeSet<Address>,
    inflation: InflationState,
    effective_bond: Amount,
}

/// Distribution of one unit class
struct ClassSettlement {
    point: UnitPoint,
    new_units: BTreeSet<u32>,
}

pub struct Tokenomics {
    address: Address,
    roles: AccessControl<TokenomicsRole>,
    params: TokenomicsParameters,
    fractions: RewardFractions,
    registries: Registries,
    history: PointHistory,
    launch_time: Timestamp,
    last_checkpoint: Timestamp,
    inflation: InflationState,
    effective_bond: Amount,
    bond_this_epoch: Amount,
    service_revenue: BTreeMap<u32, Amount>,
    whitelist: BTreeSet<Address>,
    seen_units: BTreeMap<UnitType, BTreeSet<u32>>,
    seen_owners: BTreeSet<Address>,
    owner_incentives: BTreeMap<Address, Incentives>,
}

impl Tokenomics {
    /// Create an engine at `address`, launched at `launch_time`
    pub fn new(
        address: Address,
        config: TokenomicsConfig,
        registries: Registries,
        launch_time: Timestamp,
    ) -> Result<Self> {
        config.params.validate()?;
        config.fractions.validate()?;
        let roles = AccessControl::new(
            config.owner,
            [
                (TokenomicsRole::Treasury, config.treasury),
                (TokenomicsRole::Depository, config.depository),
                (TokenomicsRole::Dispenser, config.dispenser),
            ],
        )?;

        Ok(Self {
            address,
            roles,
            effective_bond: config.params.max_bond,
            params: config.params,
            fractions: config.fractions,
            registries,
            history: PointHistory::new(),
            launch_time,
            last_checkpoint: launch_time,
            inflation: InflationState::for_year(0),
            bond_this_epoch: 0,
            service_revenue: BTreeMap::new(),
            whitelist: BTreeSet::new(),
            seen_units: BTreeMap::new(),
            seen_owners: BTreeSet::new(),
            owner_incentives: BTreeMap::new(),
        })
    }

    // ------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------

    pub fn change_owner(&mut self, sender: &Address, new_owner: Address) -> Result<()> {
        self.roles.change_owner(sender, new_owner)
    }

    /// Replace managers; zero addresses leave a role unchanged
    pub fn change_managers(
        &mut self,
        sender: &Address,
        treasury: Address,
        depository: Address,
        dispenser: Address,
    ) -> Result<()> {
        self.roles.change_managers(
            sender,
            &[
                (TokenomicsRole::Treasury, treasury),
                (TokenomicsRole::Depository, depository),
                (TokenomicsRole::Dispenser, dispenser),
            ],
        )
    }

    pub fn change_tokenomics_parameters(
        &mut self,
        sender: &Address,
        params: TokenomicsParameters,
    ) -> Result<()> {
        self.roles.ensure_owner(sender)?;
        params.validate()?;
        log::info!(
            "Tokenomics parameters changed: epoch_len={} epsilon_rate={} max_bond={}",
            params.epoch_len,
            params.epsilon_rate,
            params.max_bond
        );
        if !params.bond_auto_control {
            self.effective_bond = params.max_bond.saturating_sub(self.bond_this_epoch);
        }
        self.params = params;
        Ok(())
    }

    /// Replace the reward fractions; an invalid set leaves the old one intact
    pub fn change_reward_fraction(
        &mut self,
        sender: &Address,
        fractions: RewardFractions,
    ) -> Result<()> {
        self.roles.ensure_owner(sender)?;
        fractions.validate()?;
        log::info!("Reward fractions changed: {:?}", fractions);
        self.fractions = fractions;
        Ok(())
    }

    pub fn change_service_owner_whitelist(
        &mut self,
        sender: &Address,
        accounts: &[Address],
        permissions: &[bool],
    ) -> Result<()> {
        self.roles.ensure_owner(sender)?;
        if accounts.len() != permissions.len() {
            return Err(ProtocolError::WrongArrayLength {
                left: accounts.len(),
                right: permissions.len(),
            });
        }
        if accounts.iter().any(Address::is_zero) {
            return Err(ProtocolError::ZeroAddress);
        }

        for (account, allowed) in accounts.iter().zip(permissions) {
            if *allowed {
                self.whitelist.insert(*account);
            } else {
                self.whitelist.remove(account);
            }
        }
        log::info!("Service owner whitelist now holds {} accounts", self.whitelist.len());
        Ok(())
    }

    // ------------------------------------------------------------------
    // Revenue and checkpoints
    // ------------------------------------------------------------------

    /// Add native revenue donated to services in the open epoch
    pub fn track_services_eth_revenue(
        &mut self,
        sender: &Address,
        service_ids: &[u32],
        amounts: &[Amount],
    ) -> Result<()> {
        self.roles.ensure_manager(TokenomicsRole::Treasury, sender)?;
        if service_ids.len() != amounts.len() {
            return Err(ProtocolError::WrongArrayLength {
                left: service_ids.len(),
                right: amounts.len(),
            });
        }
        if let Some(missing) = service_ids
            .iter()
            .find(|id| !self.registries.services.exists(**id))
        {
            return Err(ProtocolError::ServiceDoesNotExist(*missing));
        }

        // Validate the whole batch before touching the accumulator
        let mut updated = self.service_revenue.clone();
        for (id, amount) in service_ids.iter().zip(amounts) {
            let entry = updated.entry(*id).or_insert(0);
            *entry = entry
                .checked_add(*amount)
                .ok_or(ArithmeticError::Overflow)?;
        }
        self.service_revenue = updated;
        log::debug!(
            "Tracked revenue for {} services in epoch {}",
            service_ids.len(),
            self.epoch_counter()
        );
        Ok(())
    }

    /// Close the open epoch if `epoch_len` has elapsed
    ///
    /// Returns `Ok(false)` without any effect when called too early.
    pub fn checkpoint(
        &mut self,
        ctx: &CallContext,
        treasury: &dyn RewardsAllocator,
    ) -> Result<bool> {
        let now = ctx.timestamp;
        if now.saturating_sub(self.last_checkpoint) < self.params.epoch_len {
            log::debug!(
                "Checkpoint skipped: {}s of {}s elapsed",
                now.saturating_sub(self.last_checkpoint),
                self.params.epoch_len
            );
            return Ok(false);
        }

        let epoch = self.epoch_counter();
        let settlement = self.settle(now)?;

        match treasury.rebalance_treasury(&self.address, settlement.point.total_revenue) {
            Ok(true) => {}
            Ok(false) => {
                log::warn!("Treasury could not rebalance revenue of epoch {}", epoch);
                return Err(ProtocolError::RewardsAllocationFailed(epoch));
            }
            Err(e) => {
                log::warn!("Treasury rejected rebalance of epoch {}: {}", epoch, e);
                return Err(ProtocolError::RewardsAllocationFailed(epoch));
            }
        }

        self.commit(settlement, now);
        Ok(true)
    }

    fn settle(&self, now: Timestamp) -> Result<Settlement> {
        let services = &self.registries.services;
        let total_revenue = self
            .service_revenue
            .values()
            .try_fold(0u128, |acc, r| acc.checked_add(*r))
            .ok_or(ArithmeticError::Overflow)?;

        // Revenue of whitelisted services attributed to each unit they use
        let mut whitelisted_revenue: Amount = 0;
        let mut unit_revenue: BTreeMap<UnitType, BTreeMap<u32, Amount>> = BTreeMap::new();
        for (service_id, revenue) in &self.service_revenue {
            let whitelisted = services
                .owner_of(*service_id)
                .is_some_and(|owner| self.whitelist.contains(&owner));
            if !whitelisted {
                continue;
            }
            whitelisted_revenue += revenue;
            for unit_type in UnitType::ALL {
                let units: BTreeSet<u32> =
                    services.units(*service_id, unit_type).into_iter().collect();
                let per_unit = unit_revenue.entry(unit_type).or_default();
                for unit in units {
                    *per_unit.entry(unit).or_insert(0) += revenue;
                }
            }
        }

        // Revenue partition
        let fractions = &self.fractions;
        let class_rewards = |fraction: u64| mul_div(total_revenue, fraction as u128, 100);
        let component_pool = class_rewards(fractions.reward_component)?;
        let agent_pool = class_rewards(fractions.reward_agent)?;
        let staker_rewards = class_rewards(fractions.reward_staker)?;

        // Inflation share of the elapsed epoch
        let mut inflation = self.inflation.rolled_to(year_at(self.launch_time, now));
        let elapsed = now.saturating_sub(self.last_checkpoint);
        let epoch_inflation = mul_div(
            inflation.inflation_cap_this_year,
            elapsed as u128,
            ONE_YEAR as u128,
        )?
        .min(inflation.remaining());
        let owner_top_up_pool = mul_div(epoch_inflation, fractions.top_up_owner as u128, 100)?;
        let staker_top_ups = mul_div(epoch_inflation, fractions.top_up_staker as u128, 100)?;
        let component_top_up_pool = mul_div(
            owner_top_up_pool,
            self.params.component_weight as u128,
            self.params.component_weight as u128 + self.params.agent_weight as u128,
        )?;
        let agent_top_up_pool = owner_top_up_pool - component_top_up_pool;

        let mut incentives: BTreeMap<Address, Incentives> = BTreeMap::new();
        let mut new_units = BTreeMap::new();
        let mut points = BTreeMap::new();
        for (unit_type, reward_pool, top_up_pool) in [
            (UnitType::Component, component_pool, component_top_up_pool),
            (UnitType::Agent, agent_pool, agent_top_up_pool),
        ] {
            let empty = BTreeMap::new();
            let revenue = unit_revenue.get(&unit_type).unwrap_or(&empty);
            let class = self.settle_class(
                unit_type,
                revenue,
                total_revenue,
                reward_pool,
                top_up_pool,
                &mut incentives,
            )?;
            new_units.insert(unit_type, class.new_units);
            points.insert(unit_type, class.point);
        }
        let ucfc = points.remove(&UnitType::Component).unwrap_or_default();
        let ucfa = points.remove(&UnitType::Agent).unwrap_or_default();

        let new_owners: BTreeSet<Address> = incentives
            .keys()
            .filter(|owner| !self.seen_owners.contains(*owner))
            .copied()
            .collect();

        // Whatever was not handed to owners or stakers stays with the treasury
        let treasury_rewards = total_revenue
            .checked_sub(staker_rewards)
            .and_then(|r| r.checked_sub(ucfc.rewards))
            .and_then(|r| r.checked_sub(ucfa.rewards))
            .ok_or(ArithmeticError::Underflow)?;

        let owner_top_ups = ucfc.top_ups + ucfa.top_ups;
        inflation.charge(owner_top_ups + staker_top_ups)?;

        let ucf = aggregate_ucf(
            ucfc.ucf,
            ucfa.ucf,
            self.params.ucfc_weight,
            self.params.ucfa_weight,
        )?;
        let innovation = self.params.component_weight as u128 * ucfc.num_new_units as u128
            + self.params.agent_weight as u128 * ucfa.num_new_units as u128
            + new_owners.len() as u128;
        let idf = idf(
            ucf,
            self.params.ucf_target,
            self.params.epsilon_rate,
            innovation,
            self.params.devs_per_capital,
        )?;

        let effective_bond = if self.params.bond_auto_control {
            self.params.max_bond.saturating_add(self.effective_bond)
        } else {
            self.params.max_bond
        };

        let point = EpochPoint {
            epoch: 0,
            ucf,
            ucfc,
            ucfa,
            idf,
            total_revenue,
            whitelisted_revenue,
            staker_rewards,
            owner_top_ups,
            staker_top_ups,
            treasury_rewards,
            block_timestamp: now,
            num_new_owners: new_owners.len() as u32,
        };

        Ok(Settlement {
            point,
            incentives,
            new_units,
            new_owners,
            inflation,
            effective_bond,
        })
    }

    /// UCF and owner distribution of one unit class
    fn settle_class(
        &self,
        unit_type: UnitType,
        unit_revenue: &BTreeMap<u32, Amount>,
        total_revenue: Amount,
        reward_pool: Amount,
        top_up_pool: Amount,
        incentives: &mut BTreeMap<Address, Incentives>,
    ) -> Result<ClassSettlement> {
        let registry = match unit_type {
            UnitType::Component => &self.registries.components,
            UnitType::Agent => &self.registries.agents,
        };
        let ucf = unit_ucf(unit_revenue, total_revenue, registry.total_supply())?;

        let mut weights: BTreeMap<Address, Amount> = BTreeMap::new();
        for (unit, revenue) in unit_revenue {
            if let Some(owner) = registry.owner_of(*unit) {
                *weights.entry(owner).or_insert(0) += revenue;
            }
        }
        let (rewards, distributed_rewards) = distribute(reward_pool, &weights)?;
        let (top_ups, distributed_top_ups) = distribute(top_up_pool, &weights)?;
        for (owner, reward) in rewards {
            incentives.entry(owner).or_default().reward += reward;
        }
        for (owner, top_up) in top_ups {
            incentives.entry(owner).or_default().top_up += top_up;
        }

        let seen = self.seen_units.get(&unit_type);
        let new_units: BTreeSet<u32> = unit_revenue
            .keys()
            .filter(|unit| seen.map_or(true, |s| !s.contains(*unit)))
            .copied()
            .collect();

        Ok(ClassSettlement {
            point: UnitPoint {
                ucf,
                rewards: distributed_rewards,
                top_ups: distributed_top_ups,
                num_new_units: new_units.len() as u32,
            },
            new_units,
        })
    }

    fn commit(&mut self, settlement: Settlement, now: Timestamp) {
        let Settlement {
            point,
            incentives,
            new_units,
            new_owners,
            inflation,
            effective_bond,
        } = settlement;

        for (owner, earned) in incentives {
            let entry = self.owner_incentives.entry(owner).or_default();
            entry.reward += earned.reward;
            entry.top_up += earned.top_up;
        }
        for (unit_type, units) in new_units {
            self.seen_units.entry(unit_type).or_default().extend(units);
        }
        self.seen_owners.extend(new_owners);
        self.inflation = inflation;
        self.effective_bond = effective_bond;
        self.bond_this_epoch = 0;
        self.service_revenue.clear();
        self.last_checkpoint = now;

        let epoch = self.history.push(point);
        log::info!(
            "Epoch {} closed: revenue={} ucf={} idf={} treasury_rewards={} staker_top_ups={}",
            epoch,
            point.total_revenue,
            point.ucf,
            point.idf,
            point.treasury_rewards,
            point.staker_top_ups
        );
    }

    // ------------------------------------------------------------------
    // Inflation and bonds
    // ------------------------------------------------------------------

    /// Inflation state as of `now`, rolled into the current year
    pub fn inflation_state(&self, now: Timestamp) -> InflationState {
        self.inflation.rolled_to(year_at(self.launch_time, now))
    }

    /// Whether `amount` fits in what remains of this year's inflation
    pub fn is_allowed_mint(&self, amount: Amount, now: Timestamp) -> bool {
        amount <= self.inflation_state(now).remaining()
    }

    /// Whether a bond of `amount` fits both the epoch allowance and inflation
    pub fn allowed_new_bond(&self, amount: Amount, now: Timestamp) -> bool {
        amount <= self.effective_bond && self.is_allowed_mint(amount, now)
    }

    /// Reserve bond allowance for a depository product
    ///
    /// Returns `false` without effect when the bond is not allowed.
    pub fn reserve_bond(&mut self, sender: &Address, amount: Amount, now: Timestamp) -> Result<bool> {
        self.roles.ensure_manager(TokenomicsRole::Depository, sender)?;
        if !self.allowed_new_bond(amount, now) {
            log::debug!("Bond of {} refused, allowance {}", amount, self.effective_bond);
            return Ok(false);
        }
        let mut inflation = self.inflation_state(now);
        inflation.charge(amount)?;
        self.inflation = inflation;
        self.effective_bond -= amount;
        self.bond_this_epoch += amount;
        Ok(true)
    }

    pub fn effective_bond(&self) -> Amount {
        self.effective_bond
    }

    // ------------------------------------------------------------------
    // Incentives
    // ------------------------------------------------------------------

    /// Staker share of rewards and top-ups from `start_epoch` onwards
    pub fn calculate_staking_rewards(
        &self,
        account: &Address,
        start_epoch: u32,
    ) -> Result<StakingIncentives> {
        let start = start_epoch.max(1);
        let last = self.history.last_epoch();
        if start > last {
            return Ok(StakingIncentives {
                end_epoch: start,
                ..Default::default()
            });
        }
        let end = last.min(start.saturating_add(self.params.max_staking_epochs - 1));

        let escrow = &self.registries.voting_escrow;
        let mut result = StakingIncentives::default();
        for epoch in start..=end {
            let point = self.history.get(epoch);
            let supply = escrow.total_supply_at(point.block_timestamp);
            if supply == 0 {
                continue;
            }
            let balance = escrow.balance_of_at(account, point.block_timestamp);
            result.reward = result
                .reward
                .checked_add(mul_div(point.staker_rewards, balance, supply)?)
                .ok_or(ArithmeticError::Overflow)?;
            result.top_up = result
                .top_up
                .checked_add(mul_div(point.staker_top_ups, balance, supply)?)
                .ok_or(ArithmeticError::Overflow)?;
        }
        result.end_epoch = end + 1;
        Ok(result)
    }

    /// Incentives accrued to a component or agent owner
    pub fn account_owner_incentives(&self, account: &Address) -> Incentives {
        self.owner_incentives
            .get(account)
            .copied()
            .unwrap_or_default()
    }

    /// Hand accrued owner incentives to the dispenser for payout
    pub fn take_owner_incentives(&mut self, sender: &Address, account: &Address) -> Result<Incentives> {
        self.roles.ensure_manager(TokenomicsRole::Dispenser, sender)?;
        let incentives = self.owner_incentives.remove(account).unwrap_or_default();
        if !incentives.is_zero() {
            log::info!(
                "Owner incentives of {} claimed: reward={} top_up={}",
                account,
                incentives.reward,
                incentives.top_up
            );
        }
        Ok(incentives)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn address(&self) -> Address {
        self.address
    }

    /// Number of the open epoch; points exist for every lower epoch
    pub fn epoch_counter(&self) -> u32 {
        self.history.last_epoch() + 1
    }

    pub fn get_point(&self, epoch: u32) -> EpochPoint {
        self.history.get(epoch)
    }

    pub fn get_last_point(&self) -> EpochPoint {
        self.history.last()
    }

    pub fn points(&self) -> &PointHistory {
        &self.history
    }

    pub fn get_ucf(&self, epoch: u32) -> FixedPoint {
        self.history.get(epoch).ucf
    }

    /// IDF of `epoch`, or the `1 + epsilon_rate` baseline if not computed
    pub fn get_idf(&self, epoch: u32) -> FixedPoint {
        let point = self.history.get(epoch);
        if point.is_default() {
            return FixedPoint::ONE.saturating_add(self.params.epsilon_rate);
        }
        point.idf
    }

    pub fn last_checkpoint(&self) -> Timestamp {
        self.last_checkpoint
    }

    /// Revenue tracked for a service in the open epoch
    pub fn service_revenue(&self, service_id: u32) -> Amount {
        self.service_revenue.get(&service_id).copied().unwrap_or(0)
    }

    pub fn is_whitelisted(&self, account: &Address) -> bool {
        self.whitelist.contains(account)
    }

    pub fn params(&self) -> &TokenomicsParameters {
        &self.params
    }

    pub fn fractions(&self) -> RewardFractions {
        self.fractions
    }

    pub fn owner(&self) -> Address {
        self.roles.owner()
    }

    pub fn treasury(&self) -> Address {
        self.roles.manager(TokenomicsRole::Treasury)
    }

    pub fn depository(&self) -> Address {
        self.roles.manager(TokenomicsRole::Depository)
    }

    pub fn dispenser(&self) -> Address {
        self.roles.manager(TokenomicsRole::Dispenser)
    }
}

impl RevenueTracker for Tokenomics {
    fn track_services_eth_revenue(
        &mut self,
        sender: &Address,
        service_ids: &[u32],
        amounts: &[Amount],
    ) -> Result<()> {
        Tokenomics::track_services_eth_revenue(self, sender, service_ids, amounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use olas_core::sim::{SimBank, SimService, SimServiceRegistry, SimUnitRegistry, SimVotingEscrow};
    use olas_core::E18;

    const LAUNCH: Timestamp = 1_000_000;

    struct AcceptAll;

    impl RewardsAllocator for AcceptAll {
        fn rebalance_treasury(&self, _sender: &Address, _amount: Amount) -> Result<bool> {
            Ok(true)
        }
    }

    fn owner() -> Address {
        Address::from_low_u64(1)
    }

    fn engine(params: TokenomicsParameters) -> (Tokenomics, Arc<SimServiceRegistry>) {
        let services = Arc::new(SimServiceRegistry::new(
            Address::from_low_u64(50),
            Arc::new(SimBank::new()),
        ));
        let components = Arc::new(SimUnitRegistry::new());
        let agents = Arc::new(SimUnitRegistry::new());
        let dev = Address::from_low_u64(20);
        components.create(dev);
        agents.create(dev);
        services.register_service(
            1,
            SimService {
                owner: Address::from_low_u64(10),
                components: vec![1],
                agents: vec![1],
            },
        );
        let registries = Registries {
            services: services.clone(),
            components,
            agents,
            voting_escrow: Arc::new(SimVotingEscrow::new()),
        };
        let config = TokenomicsConfig {
            owner: owner(),
            treasury: owner(),
            depository: owner(),
            dispenser: owner(),
            params,
            fractions: RewardFractions::default(),
        };
        let engine = Tokenomics::new(Address::from_low_u64(2), config, registries, LAUNCH).unwrap();
        (engine, services)
    }

    fn params() -> TokenomicsParameters {
        TokenomicsParameters {
            epoch_len: 10,
            ..Default::default()
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut bad = params();
        bad.devs_per_capital = 0;
        let services = Arc::new(SimServiceRegistry::new(Address::ZERO, Arc::new(SimBank::new())));
        let registries = Registries {
            services,
            components: Arc::new(SimUnitRegistry::new()),
            agents: Arc::new(SimUnitRegistry::new()),
            voting_escrow: Arc::new(SimVotingEscrow::new()),
        };
        let config = TokenomicsConfig {
            owner: owner(),
            treasury: owner(),
            depository: owner(),
            dispenser: owner(),
            params: bad,
            fractions: RewardFractions::default(),
        };
        assert!(Tokenomics::new(Address::from_low_u64(2), config, registries, LAUNCH).is_err());
    }

    #[test]
    fn test_new_units_counted_once() {
        let (mut engine, _) = engine(params());
        engine
            .change_service_owner_whitelist(&owner(), &[Address::from_low_u64(10)], &[true])
            .unwrap();

        engine.track_services_eth_revenue(&owner(), &[1], &[E18]).unwrap();
        engine.checkpoint(&CallContext::new(owner(), LAUNCH + 10), &AcceptAll).unwrap();
        let first = engine.get_last_point();
        assert_eq!(first.ucfc.num_new_units, 1);
        assert_eq!(first.ucfa.num_new_units, 1);
        assert_eq!(first.num_new_owners, 1);

        engine.track_services_eth_revenue(&owner(), &[1], &[E18]).unwrap();
        engine.checkpoint(&CallContext::new(owner(), LAUNCH + 20), &AcceptAll).unwrap();
        let second = engine.get_last_point();
        assert_eq!(second.ucfc.num_new_units, 0);
        assert_eq!(second.num_new_owners, 0);
    }

    #[test]
    fn test_owner_incentives_follow_units() {
        let (mut engine, _) = engine(params());
        engine
            .change_service_owner_whitelist(&owner(), &[Address::from_low_u64(10)], &[true])
            .unwrap();
        engine.track_services_eth_revenue(&owner(), &[1], &[100 * E18]).unwrap();
        engine.checkpoint(&CallContext::new(owner(), LAUNCH + 10), &AcceptAll).unwrap();

        let dev = Address::from_low_u64(20);
        let earned = engine.account_owner_incentives(&dev);
        // 25% component + 25% agent rewards both go to the single developer
        assert_eq!(earned.reward, 50 * E18);
        assert!(earned.top_up > 0);

        let stranger = Address::from_low_u64(77);
        assert!(engine.take_owner_incentives(&stranger, &dev).is_err());
        assert_eq!(engine.take_owner_incentives(&owner(), &dev).unwrap(), earned);
        assert!(engine.account_owner_incentives(&dev).is_zero());
    }

    #[test]
    fn test_bond_auto_control_carries_unused_allowance() {
        let mut p = params();
        p.max_bond = 1_000 * E18;
        p.bond_auto_control = true;
        let (mut engine, _) = engine(p);

        assert!(engine.reserve_bond(&owner(), 400 * E18, LAUNCH + 1).unwrap());
        assert_eq!(engine.effective_bond(), 600 * E18);
        assert!(!engine.reserve_bond(&owner(), 700 * E18, LAUNCH + 1).unwrap());

        engine.checkpoint(&CallContext::new(owner(), LAUNCH + 10), &AcceptAll).unwrap();
        assert_eq!(engine.effective_bond(), 1_600 * E18);
    }

    #[test]
    fn test_bond_without_auto_control_resets() {
        let mut p = params();
        p.max_bond = 1_000 * E18;
        let (mut engine, _) = engine(p);

        assert!(engine.reserve_bond(&owner(), 400 * E18, LAUNCH + 1).unwrap());
        engine.checkpoint(&CallContext::new(owner(), LAUNCH + 10), &AcceptAll).unwrap();
        assert_eq!(engine.effective_bond(), 1_000 * E18);
        assert_eq!(
            engine.inflation_state(LAUNCH + 10).minted_this_year,
            400 * E18 + engine.get_last_point().staker_top_ups
        );
    }

    #[test]
    fn test_reserve_bond_requires_depository() {
        let (mut engine, _) = engine(params());
        let result = engine.reserve_bond(&Address::from_low_u64(99), 1, LAUNCH);
        assert!(matches!(result, Err(ProtocolError::ManagerOnly { role: "depository", .. })));
    }
}
