//! Revenue ledger and disbursement gateway
//!
//! Every mutating entry point takes the reentrancy lock before anything else,
//! finishes its ledger update, and releases the state mutex before value
//! leaves through a collaborator. A recipient hook that calls back into the
//! treasury therefore fails with [`ProtocolError::ReentrancyGuard`] instead of
//! observing a half-updated ledger.

use crate::pool::{TreasuryPool, TreasuryReport};
use olas_core::{
    AccessControl, Address, Amount, ArithmeticError, CallContext, NativeBank, ProtocolError,
    ProtocolToken, ReentrancyLock, ReserveTokens, Result, RevenueTracker, RewardsAllocator, Role,
    ServiceRegistry, NATIVE_TOKEN,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Manager roles of the treasury
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TreasuryRole {
    Tokenomics,
    Depository,
    Dispenser,
}

impl Role for TreasuryRole {
    const ALL: &'static [Self] = &[
        TreasuryRole::Tokenomics,
        TreasuryRole::Depository,
        TreasuryRole::Dispenser,
    ];

    fn name(self) -> &'static str {
        match self {
            TreasuryRole::Tokenomics => "tokenomics",
            TreasuryRole::Depository => "depository",
            TreasuryRole::Dispenser => "dispenser",
        }
    }
}

/// Initial roles of a treasury
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryConfig {
    pub owner: Address,
    pub tokenomics: Address,
    pub depository: Address,
    pub dispenser: Address,
}

/// External systems value moves through
#[derive(Clone)]
pub struct Collaborators {
    pub olas: Arc<dyn ProtocolToken>,
    pub tokens: Arc<dyn ReserveTokens>,
    pub bank: Arc<dyn NativeBank>,
    pub services: Arc<dyn ServiceRegistry>,
}

struct TreasuryState {
    roles: AccessControl<TreasuryRole>,
    pool: TreasuryPool,
    paused: bool,
}

pub struct Treasury {
    address: Address,
    state: Mutex<TreasuryState>,
    lock: ReentrancyLock,
    collaborators: Collaborators,
}

impl Treasury {
    pub fn new(address: Address, config: TreasuryConfig, collaborators: Collaborators) -> Result<Self> {
        if address.is_zero() {
            return Err(ProtocolError::ZeroAddress);
        }
        let roles = AccessControl::new(
            config.owner,
            [
                (TreasuryRole::Tokenomics, config.tokenomics),
                (TreasuryRole::Depository, config.depository),
                (TreasuryRole::Dispenser, config.dispenser),
            ],
        )?;

        Ok(Self {
            address,
            state: Mutex::new(TreasuryState {
                roles,
                pool: TreasuryPool::new(),
                paused: false,
            }),
            lock: ReentrancyLock::new(),
            collaborators,
        })
    }

    // ------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------

    pub fn change_owner(&self, sender: &Address, new_owner: Address) -> Result<()> {
        self.state.lock().roles.change_owner(sender, new_owner)
    }

    /// Replace managers; zero addresses leave a role unchanged
    pub fn change_managers(
        &self,
        sender: &Address,
        tokenomics: Address,
        depository: Address,
        dispenser: Address,
    ) -> Result<()> {
        self.state.lock().roles.change_managers(
            sender,
            &[
                (TreasuryRole::Tokenomics, tokenomics),
                (TreasuryRole::Depository, depository),
                (TreasuryRole::Dispenser, dispenser),
            ],
        )
    }

    pub fn enable_token(&self, sender: &Address, token: Address) -> Result<()> {
        let mut state = self.state.lock();
        state.roles.ensure_owner(sender)?;
        if token.is_zero() {
            return Err(ProtocolError::ZeroAddress);
        }
        if state.pool.enable_token(token) {
            log::info!("Reserve token {} enabled", token);
        }
        Ok(())
    }

    pub fn disable_token(&self, sender: &Address, token: Address) -> Result<()> {
        let mut state = self.state.lock();
        state.roles.ensure_owner(sender)?;
        if state.pool.disable_token(&token)? {
            log::info!("Reserve token {} disabled", token);
        }
        Ok(())
    }

    pub fn pause(&self, sender: &Address) -> Result<()> {
        let mut state = self.state.lock();
        state.roles.ensure_owner(sender)?;
        state.paused = true;
        log::warn!("Treasury paused by {}", sender);
        Ok(())
    }

    pub fn unpause(&self, sender: &Address) -> Result<()> {
        let mut state = self.state.lock();
        state.roles.ensure_owner(sender)?;
        state.paused = false;
        log::info!("Treasury unpaused by {}", sender);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Inflows
    // ------------------------------------------------------------------

    /// Book native donations to services and report them as epoch revenue
    ///
    /// `ctx.value` is the native value that came with the call; it must equal
    /// the sum of `amounts`.
    pub fn deposit_service_donations_eth(
        &self,
        ctx: &CallContext,
        tracker: &mut dyn RevenueTracker,
        service_ids: &[u32],
        amounts: &[Amount],
    ) -> Result<()> {
        let _guard = self.lock.enter()?;
        self.ensure_not_paused()?;
        if ctx.value == 0 {
            return Err(ProtocolError::ZeroValue);
        }
        if service_ids.len() != amounts.len() {
            return Err(ProtocolError::WrongArrayLength {
                left: service_ids.len(),
                right: amounts.len(),
            });
        }
        let mut total: Amount = 0;
        for amount in amounts {
            if *amount == 0 {
                return Err(ProtocolError::ZeroValue);
            }
            total = total.checked_add(*amount).ok_or(ArithmeticError::Overflow)?;
        }
        if total != ctx.value {
            return Err(ProtocolError::WrongAmount {
                provided: total,
                expected: ctx.value,
            });
        }

        // The donation must fit before the engine records it
        if self
            .state
            .lock()
            .pool
            .eth_from_services()
            .checked_add(total)
            .is_none()
        {
            return Err(ArithmeticError::Overflow.into());
        }

        tracker.track_services_eth_revenue(&self.address, service_ids, amounts)?;
        self.state.lock().pool.credit_services(total)?;
        log::info!(
            "Donation of {} from {} for {} services",
            total,
            ctx.sender,
            service_ids.len()
        );
        Ok(())
    }

    /// Take reserve tokens from the depository and mint OLAS to `recipient`
    pub fn deposit_token_for_olas(
        &self,
        ctx: &CallContext,
        recipient: &Address,
        token_amount: Amount,
        token: Address,
        olas_mint_amount: Amount,
    ) -> Result<()> {
        let _guard = self.lock.enter()?;
        {
            let state = self.state.lock();
            state.roles.ensure_manager(TreasuryRole::Depository, &ctx.sender)?;
            if state.paused {
                return Err(ProtocolError::Paused);
            }
            if !state.pool.is_enabled(&token) {
                return Err(ProtocolError::UnauthorizedToken(token.to_string()));
            }
            if state.pool.token_reserve(&token).checked_add(token_amount).is_none() {
                return Err(ArithmeticError::Overflow.into());
            }
        }
        self.ensure_mintable(olas_mint_amount)?;

        let tokens = &self.collaborators.tokens;
        if !tokens.transfer_from(&token, &self.address, &ctx.sender, &self.address, token_amount) {
            return Err(ProtocolError::TransferFailed {
                from: ctx.sender.to_string(),
                to: self.address.to_string(),
                amount: token_amount,
            });
        }
        self.state.lock().pool.credit_reserve(token, token_amount)?;

        self.collaborators
            .olas
            .mint(&self.address, recipient, olas_mint_amount)?;
        log::info!(
            "Deposited {} of token {} from {}, minted {} OLAS to {}",
            token_amount,
            token,
            ctx.sender,
            olas_mint_amount,
            recipient
        );
        Ok(())
    }

    /// Credit native value sent straight to the treasury
    pub fn receive_eth(&self, ctx: &CallContext) -> Result<()> {
        let _guard = self.lock.enter()?;
        self.ensure_not_paused()?;
        self.state.lock().pool.credit_owned(ctx.value)?;
        log::debug!("Received {} from {}", ctx.value, ctx.sender);
        Ok(())
    }

    /// Pull slashed service collateral into protocol-owned funds
    pub fn drain_service_slashed_funds(&self, ctx: &CallContext) -> Result<Amount> {
        let _guard = self.lock.enter()?;
        self.state.lock().roles.ensure_owner(&ctx.sender)?;

        let amount = self.collaborators.services.drain(&self.address)?;
        self.state.lock().pool.credit_owned(amount)?;
        log::info!("Drained {} of slashed funds", amount);
        Ok(amount)
    }

    // ------------------------------------------------------------------
    // Outflows
    // ------------------------------------------------------------------

    /// Owner withdrawal of protocol-owned value or token reserves
    pub fn withdraw(&self, ctx: &CallContext, to: &Address, amount: Amount, token: Address) -> Result<bool> {
        let _guard = self.lock.enter()?;
        let native = token == NATIVE_TOKEN;
        {
            let mut state = self.state.lock();
            state.roles.ensure_owner(&ctx.sender)?;
            if !native && !state.pool.is_enabled(&token) {
                return Err(ProtocolError::UnauthorizedToken(token.to_string()));
            }
            if native {
                state.pool.debit_owned(amount)?;
            } else {
                state.pool.debit_reserve(token, amount)?;
            }
        }

        let sent = if native {
            self.collaborators.bank.send_value(&self.address, to, amount)
        } else {
            self.collaborators
                .tokens
                .transfer(&token, &self.address, to, amount)
        };
        if !sent {
            let mut state = self.state.lock();
            if native {
                state.pool.credit_owned(amount)?;
            } else {
                state.pool.credit_reserve(token, amount)?;
            }
            log::warn!("Withdrawal of {} to {} failed, ledger restored", amount, to);
            return Err(ProtocolError::TransferFailed {
                from: self.address.to_string(),
                to: to.to_string(),
                amount,
            });
        }

        log::info!("Withdrew {} of {} to {}", amount, token, to);
        Ok(true)
    }

    /// Pay claimed incentives: native rewards from owned funds, minted top-ups
    ///
    /// Returns `false` without effect when there is nothing to pay or the
    /// rewards exceed protocol-owned funds.
    pub fn withdraw_to_account(
        &self,
        ctx: &CallContext,
        account: &Address,
        rewards: Amount,
        top_ups: Amount,
    ) -> Result<bool> {
        let _guard = self.lock.enter()?;
        {
            let mut state = self.state.lock();
            state.roles.ensure_manager(TreasuryRole::Dispenser, &ctx.sender)?;
            if state.paused {
                return Err(ProtocolError::Paused);
            }
            if rewards == 0 && top_ups == 0 {
                return Ok(false);
            }
            if rewards > state.pool.eth_owned() {
                log::debug!(
                    "Rewards of {} exceed owned funds {}",
                    rewards,
                    state.pool.eth_owned()
                );
                return Ok(false);
            }
            self.ensure_mintable(top_ups)?;
            state.pool.debit_owned(rewards)?;
        }

        if rewards > 0 && !self.collaborators.bank.send_value(&self.address, account, rewards) {
            self.state.lock().pool.credit_owned(rewards)?;
            log::warn!("Reward payout of {} to {} failed, ledger restored", rewards, account);
            return Err(ProtocolError::TransferFailed {
                from: self.address.to_string(),
                to: account.to_string(),
                amount: rewards,
            });
        }
        if top_ups > 0 {
            self.collaborators.olas.mint(&self.address, account, top_ups)?;
        }

        log::info!("Paid {} rewards and {} top-ups to {}", rewards, top_ups, account);
        Ok(true)
    }

    /// Move a closed epoch's service revenue into protocol-owned funds
    pub fn rebalance_treasury(&self, sender: &Address, amount: Amount) -> Result<bool> {
        let _guard = self.lock.enter()?;
        let mut state = self.state.lock();
        state.roles.ensure_manager(TreasuryRole::Tokenomics, sender)?;
        if state.paused {
            return Err(ProtocolError::Paused);
        }
        if amount == 0 {
            return Ok(true);
        }
        let moved = state.pool.rebalance(amount)?;
        if moved {
            log::info!("Rebalanced {} into owned funds", amount);
        } else {
            log::warn!(
                "Cannot rebalance {}, only {} collected from services",
                amount,
                state.pool.eth_from_services()
            );
        }
        Ok(moved)
    }

    /// Minting must be possible before any value moves
    fn ensure_mintable(&self, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let olas = &self.collaborators.olas;
        let minter = olas.minter();
        if minter != self.address {
            return Err(ProtocolError::ManagerOnly {
                sender: self.address.to_string(),
                manager: minter.to_string(),
                role: "minter",
            });
        }
        if olas.total_supply().checked_add(amount).is_none() {
            return Err(ArithmeticError::Overflow.into());
        }
        Ok(())
    }

    fn ensure_not_paused(&self) -> Result<()> {
        if self.state.lock().paused {
            return Err(ProtocolError::Paused);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn eth_from_services(&self) -> Amount {
        self.state.lock().pool.eth_from_services()
    }

    pub fn eth_owned(&self) -> Amount {
        self.state.lock().pool.eth_owned()
    }

    pub fn token_reserve(&self, token: &Address) -> Amount {
        self.state.lock().pool.token_reserve(token)
    }

    pub fn is_enabled(&self, token: &Address) -> bool {
        self.state.lock().pool.is_enabled(token)
    }

    pub fn paused(&self) -> bool {
        self.state.lock().paused
    }

    pub fn report(&self) -> TreasuryReport {
        self.state.lock().pool.report()
    }

    pub fn owner(&self) -> Address {
        self.state.lock().roles.owner()
    }

    pub fn manager(&self, role: TreasuryRole) -> Address {
        self.state.lock().roles.manager(role)
    }
}

impl RewardsAllocator for Treasury {
    fn rebalance_treasury(&self, sender: &Address, amount: Amount) -> Result<bool> {
        Treasury::rebalance_treasury(self, sender, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use olas_core::sim::{SimBank, SimReserveTokens, SimServiceRegistry, SimToken};

    struct NoopTracker {
        calls: usize,
    }

    impl RevenueTracker for NoopTracker {
        fn track_services_eth_revenue(
            &mut self,
            _sender: &Address,
            _service_ids: &[u32],
            _amounts: &[Amount],
        ) -> Result<()> {
            self.calls += 1;
            Ok(())
        }
    }

    fn owner() -> Address {
        Address::from_low_u64(1)
    }

    fn treasury() -> Treasury {
        let address = Address::from_low_u64(3);
        let bank = Arc::new(SimBank::new());
        let collaborators = Collaborators {
            olas: Arc::new(SimToken::new(address)),
            tokens: Arc::new(SimReserveTokens::new()),
            bank: bank.clone(),
            services: Arc::new(SimServiceRegistry::new(Address::from_low_u64(60), bank)),
        };
        let config = TreasuryConfig {
            owner: owner(),
            tokenomics: owner(),
            depository: owner(),
            dispenser: owner(),
        };
        Treasury::new(address, config, collaborators).unwrap()
    }

    #[test]
    fn test_donation_checks_run_in_order() {
        let treasury = treasury();
        let mut tracker = NoopTracker { calls: 0 };
        let ctx = CallContext::new(owner(), 0);

        assert_eq!(
            treasury.deposit_service_donations_eth(&ctx, &mut tracker, &[1], &[1]),
            Err(ProtocolError::ZeroValue)
        );
        let ctx = ctx.with_value(10);
        assert!(matches!(
            treasury.deposit_service_donations_eth(&ctx, &mut tracker, &[1, 2], &[10]),
            Err(ProtocolError::WrongArrayLength { .. })
        ));
        assert_eq!(
            treasury.deposit_service_donations_eth(&ctx, &mut tracker, &[1, 2], &[10, 0]),
            Err(ProtocolError::ZeroValue)
        );
        assert_eq!(
            treasury.deposit_service_donations_eth(&ctx, &mut tracker, &[1, 2], &[5, 4]),
            Err(ProtocolError::WrongAmount {
                provided: 9,
                expected: 10
            })
        );
        assert_eq!(tracker.calls, 0);

        treasury
            .deposit_service_donations_eth(&ctx, &mut tracker, &[1, 2], &[5, 5])
            .unwrap();
        assert_eq!(tracker.calls, 1);
        assert_eq!(treasury.eth_from_services(), 10);
        assert!(!treasury.lock.is_entered());
    }

    #[test]
    fn test_rebalance_zero_and_shortfall() {
        let treasury = treasury();
        assert!(treasury.rebalance_treasury(&owner(), 0).unwrap());
        assert!(!treasury.rebalance_treasury(&owner(), 1).unwrap());
        assert!(matches!(
            treasury.rebalance_treasury(&Address::from_low_u64(9), 0),
            Err(ProtocolError::ManagerOnly { role: "tokenomics", .. })
        ));
    }

    #[test]
    fn test_enable_token_is_owner_only_and_idempotent() {
        let treasury = treasury();
        let token = Address::from_low_u64(0xda1);
        assert!(treasury.enable_token(&Address::from_low_u64(9), token).is_err());
        treasury.enable_token(&owner(), token).unwrap();
        treasury.enable_token(&owner(), token).unwrap();
        assert!(treasury.is_enabled(&token));
        treasury.disable_token(&owner(), token).unwrap();
        treasury.disable_token(&owner(), token).unwrap();
        assert!(!treasury.is_enabled(&token));
    }

    #[test]
    fn test_zero_incentives_pay_nothing() {
        let treasury = treasury();
        let account = Address::from_low_u64(40);
        assert!(!treasury.withdraw_to_account(&CallContext::new(owner(), 0), &account, 0, 0).unwrap());
        // Top-ups alone are minted
        assert!(treasury.withdraw_to_account(&CallContext::new(owner(), 0), &account, 0, 10).unwrap());
        // Rewards need owned funds
        assert!(!treasury.withdraw_to_account(&CallContext::new(owner(), 0), &account, 10, 0).unwrap());
    }
}
