//! Tokenomics parameters and reward fractions

use olas_core::{amount_serde, Amount, FixedPoint, ProtocolError, Result, E18};
use serde::{Deserialize, Serialize};

/// Tunable economic parameters, changed as a whole by the owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenomicsParameters {
    /// Weight of the component UCF in the aggregate UCF
    pub ucfc_weight: u64,
    /// Weight of the agent UCF in the aggregate UCF
    pub ucfa_weight: u64,
    /// Weight of a new component in the IDF innovation term and owner top-ups
    pub component_weight: u64,
    /// Weight of a new agent in the IDF innovation term and owner top-ups
    pub agent_weight: u64,
    /// Innovation units per unit of IDF discount
    pub devs_per_capital: u64,
    /// IDF baseline is `1 + epsilon_rate`
    pub epsilon_rate: FixedPoint,
    /// UCF above which the IDF discount kicks in
    pub ucf_target: FixedPoint,
    /// Bond allowance per epoch
    #[serde(with = "amount_serde")]
    pub max_bond: Amount,
    /// Minimum seconds between checkpoints
    pub epoch_len: u64,
    /// Carry unused bond allowance into the next epoch
    pub bond_auto_control: bool,
    /// Longest walk of a single staking reward calculation
    pub max_staking_epochs: u32,
}

impl Default for TokenomicsParameters {
    fn default() -> Self {
        Self {
            ucfc_weight: 1,
            ucfa_weight: 1,
            component_weight: 1,
            agent_weight: 1,
            devs_per_capital: 100,
            epsilon_rate: FixedPoint::from_percent(10),
            ucf_target: FixedPoint::from_percent(50),
            max_bond: 2_000_000 * E18,
            epoch_len: 7 * 86_400,
            bond_auto_control: false,
            max_staking_epochs: 52,
        }
    }
}

impl TokenomicsParameters {
    pub fn validate(&self) -> Result<()> {
        if self.ucfc_weight.saturating_add(self.ucfa_weight) == 0
            || self.component_weight.saturating_add(self.agent_weight) == 0
            || self.devs_per_capital == 0
            || self.epoch_len == 0
            || self.max_staking_epochs == 0
        {
            return Err(ProtocolError::ZeroValue);
        }
        if self.ucf_target > FixedPoint::ONE {
            return Err(ProtocolError::WrongAmount {
                provided: self.ucf_target.raw(),
                expected: FixedPoint::ONE.raw(),
            });
        }
        Ok(())
    }
}

/// Percent splits of epoch revenue and epoch inflation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardFractions {
    pub reward_component: u64,
    pub reward_agent: u64,
    pub reward_staker: u64,
    pub top_up_owner: u64,
    pub top_up_staker: u64,
}

impl Default for RewardFractions {
    fn default() -> Self {
        Self {
            reward_component: 25,
            reward_agent: 25,
            reward_staker: 40,
            top_up_owner: 40,
            top_up_staker: 50,
        }
    }
}

impl RewardFractions {
    /// Revenue fractions and top-up fractions must each sum to at most 100
    pub fn validate(&self) -> Result<()> {
        let rewards = self.reward_component as u128
            + self.reward_agent as u128
            + self.reward_staker as u128;
        if rewards > 100 {
            return Err(ProtocolError::WrongAmount {
                provided: rewards,
                expected: 100,
            });
        }
        let top_ups = self.top_up_owner as u128 + self.top_up_staker as u128;
        if top_ups > 100 {
            return Err(ProtocolError::WrongAmount {
                provided: top_ups,
                expected: 100,
            });
        }
        Ok(())
    }

    /// Percent of revenue left to the treasury
    pub fn treasury_fraction(&self) -> u64 {
        100u64.saturating_sub(
            self.reward_component
                .saturating_add(self.reward_agent)
                .saturating_add(self.reward_staker),
        )
    }
}
