use olas_core::sim::{
    RejectAll, SimBank, SimReserveTokens, SimService, SimServiceRegistry, SimToken,
    SimUnitRegistry, SimVotingEscrow,
};
use olas_core::{
    Address, ArithmeticError, CallContext, NativeBank, ProtocolToken, ReserveTokens, Timestamp,
    E18, NATIVE_TOKEN,
};
use std::sync::Arc;
use tokenomics::{Registries, Tokenomics, TokenomicsConfig, TokenomicsParameters};
use treasury::{Collaborators, ProtocolError, Treasury, TreasuryConfig, TreasuryRole};

const LAUNCH: Timestamp = 1_700_000_000;
const EPOCH: u64 = 7 * 86_400;

struct Ledger {
    treasury: Treasury,
    tokenomics: Tokenomics,
    bank: Arc<SimBank>,
    olas: Arc<SimToken>,
    tokens: Arc<SimReserveTokens>,
    services: Arc<SimServiceRegistry>,
    owner: Address,
    depository: Address,
    dispenser: Address,
    donor: Address,
    developer: Address,
}

fn ledger() -> Ledger {
    let owner = Address::from_low_u64(1);
    let depository = Address::from_low_u64(2);
    let dispenser = Address::from_low_u64(3);
    let donor = Address::from_low_u64(4);
    let developer = Address::from_low_u64(5);
    let service_owner = Address::from_low_u64(6);
    let treasury_address = Address::from_low_u64(0x7ea);
    let tokenomics_address = Address::from_low_u64(0x70c);

    let bank = Arc::new(SimBank::new());
    bank.credit(&donor, 1_000 * E18);
    let olas = Arc::new(SimToken::new(treasury_address));
    let tokens = Arc::new(SimReserveTokens::new());
    let services = Arc::new(SimServiceRegistry::new(
        Address::from_low_u64(0x5e7),
        bank.clone(),
    ));
    services.change_drainer(treasury_address);
    services.register_service(
        1,
        SimService {
            owner: service_owner,
            components: vec![1],
            agents: vec![1],
        },
    );
    let components = Arc::new(SimUnitRegistry::new());
    let agents = Arc::new(SimUnitRegistry::new());
    components.create(developer);
    agents.create(developer);

    let treasury = Treasury::new(
        treasury_address,
        TreasuryConfig {
            owner,
            tokenomics: tokenomics_address,
            depository,
            dispenser,
        },
        Collaborators {
            olas: olas.clone(),
            tokens: tokens.clone(),
            bank: bank.clone(),
            services: services.clone(),
        },
    )
    .unwrap();

    let mut tokenomics = Tokenomics::new(
        tokenomics_address,
        TokenomicsConfig {
            owner,
            treasury: treasury_address,
            depository,
            dispenser,
            params: TokenomicsParameters {
                epoch_len: EPOCH,
                ..Default::default()
            },
            fractions: Default::default(),
        },
        Registries {
            services: services.clone(),
            components,
            agents,
            voting_escrow: Arc::new(SimVotingEscrow::new()),
        },
        LAUNCH,
    )
    .unwrap();
    tokenomics
        .change_service_owner_whitelist(&owner, &[service_owner], &[true])
        .unwrap();

    Ledger {
        treasury,
        tokenomics,
        bank,
        olas,
        tokens,
        services,
        owner,
        depository,
        dispenser,
        donor,
        developer,
    }
}

impl Ledger {
    /// Send native value with a donation call, as a wallet would
    fn donate(&mut self, amount: u128, ts: Timestamp) -> olas_core::Result<()> {
        assert!(self
            .bank
            .attach_value(&self.donor, &self.treasury.address(), amount));
        let ctx = CallContext::new(self.donor, ts).with_value(amount);
        self.treasury
            .deposit_service_donations_eth(&ctx, &mut self.tokenomics, &[1], &[amount])
    }

    /// Direct native transfer to the treasury
    fn fund(&self, amount: u128) {
        self.bank.credit(&self.owner, amount);
        assert!(self
            .bank
            .attach_value(&self.owner, &self.treasury.address(), amount));
        let ctx = CallContext::new(self.owner, LAUNCH).with_value(amount);
        self.treasury.receive_eth(&ctx).unwrap();
    }
}

#[test]
fn test_donation_to_payout_flow() {
    let mut l = ledger();
    l.donate(100 * E18, LAUNCH + 1).unwrap();
    assert_eq!(l.treasury.eth_from_services(), 100 * E18);
    assert_eq!(l.tokenomics.service_revenue(1), 100 * E18);

    let ctx = CallContext::new(l.owner, LAUNCH + EPOCH);
    assert!(l.tokenomics.checkpoint(&ctx, &l.treasury).unwrap());
    assert_eq!(l.treasury.eth_from_services(), 0);
    assert_eq!(l.treasury.eth_owned(), 100 * E18);

    let incentives = l
        .tokenomics
        .take_owner_incentives(&l.dispenser, &l.developer)
        .unwrap();
    assert_eq!(incentives.reward, 50 * E18);
    assert!(incentives.top_up > 0);

    let dispenser = CallContext::new(l.dispenser, LAUNCH + EPOCH);
    assert!(l
        .treasury
        .withdraw_to_account(&dispenser, &l.developer, incentives.reward, incentives.top_up)
        .unwrap());
    assert_eq!(l.bank.balance_of(&l.developer), 50 * E18);
    assert_eq!(l.olas.balance_of(&l.developer), incentives.top_up);
    assert_eq!(l.treasury.eth_owned(), 50 * E18);
    assert_eq!(l.bank.balance_of(&l.treasury.address()), 50 * E18);
}

#[test]
fn test_donation_for_unknown_service_changes_nothing() {
    let mut l = ledger();
    let ctx = CallContext::new(l.donor, LAUNCH).with_value(E18);
    let result = l
        .treasury
        .deposit_service_donations_eth(&ctx, &mut l.tokenomics, &[9], &[E18]);
    assert_eq!(result, Err(ProtocolError::ServiceDoesNotExist(9)));
    assert_eq!(l.treasury.eth_from_services(), 0);
}

#[test]
fn test_deposit_token_for_olas() {
    let l = ledger();
    let dai = Address::from_low_u64(0xda1);
    let bonder = Address::from_low_u64(0x4d);
    let treasury = l.treasury.address();
    l.tokens.mint(&dai, &l.depository, 10_000 * E18);
    l.tokens.approve(&dai, &l.depository, &treasury, 10_000 * E18);
    let ctx = CallContext::new(l.depository, LAUNCH);

    assert!(matches!(
        l.treasury
            .deposit_token_for_olas(&ctx, &bonder, 10_000 * E18, dai, 1_000 * E18),
        Err(ProtocolError::UnauthorizedToken(_))
    ));
    l.treasury.enable_token(&l.owner, dai).unwrap();

    let stranger = CallContext::new(l.donor, LAUNCH);
    assert!(matches!(
        l.treasury.deposit_token_for_olas(&stranger, &bonder, E18, dai, E18),
        Err(ProtocolError::ManagerOnly { role: "depository", .. })
    ));

    l.treasury
        .deposit_token_for_olas(&ctx, &bonder, 10_000 * E18, dai, 1_000 * E18)
        .unwrap();
    assert_eq!(l.treasury.token_reserve(&dai), 10_000 * E18);
    assert_eq!(l.tokens.balance_of(&dai, &treasury), 10_000 * E18);
    assert_eq!(l.tokens.balance_of(&dai, &l.depository), 0);
    assert_eq!(l.olas.total_supply(), 1_000 * E18);
    assert_eq!(l.olas.balance_of(&bonder), 1_000 * E18);
    assert_eq!(l.olas.balance_of(&l.depository), 0);

    assert_eq!(
        l.treasury.disable_token(&l.owner, dai),
        Err(ProtocolError::NonZeroValue(10_000 * E18))
    );

    let owner = CallContext::new(l.owner, LAUNCH);
    assert!(l
        .treasury
        .withdraw(&owner, &l.owner, 10_000 * E18, dai)
        .unwrap());
    assert_eq!(l.tokens.balance_of(&dai, &l.owner), 10_000 * E18);
    l.treasury.disable_token(&l.owner, dai).unwrap();
    assert!(!l.treasury.is_enabled(&dai));
}

#[test]
fn test_unmintable_top_up_moves_no_value() {
    let l = ledger();
    l.fund(10 * E18);
    let account = Address::from_low_u64(0x4c);
    let dispenser = CallContext::new(l.dispenser, LAUNCH);

    assert_eq!(
        l.treasury
            .withdraw_to_account(&dispenser, &account, 3 * E18, u128::MAX),
        Err(ProtocolError::Arithmetic(ArithmeticError::Overflow))
    );
    assert_eq!(l.treasury.eth_owned(), 10 * E18);
    assert_eq!(l.bank.balance_of(&account), 0);
    assert_eq!(l.bank.balance_of(&l.treasury.address()), 10 * E18);
    assert_eq!(l.olas.total_supply(), 0);
}

#[test]
fn test_withdraw_bounds() {
    let l = ledger();
    l.fund(10 * E18);
    let owner = CallContext::new(l.owner, LAUNCH);
    let to = Address::from_low_u64(77);

    assert!(matches!(
        l.treasury
            .withdraw(&CallContext::new(l.donor, LAUNCH), &to, E18, NATIVE_TOKEN),
        Err(ProtocolError::OwnerOnly { .. })
    ));
    assert!(matches!(
        l.treasury
            .withdraw(&owner, &to, E18, Address::from_low_u64(0xbad)),
        Err(ProtocolError::UnauthorizedToken(_))
    ));
    assert_eq!(
        l.treasury.withdraw(&owner, &to, 10 * E18 + 1, NATIVE_TOKEN),
        Err(ProtocolError::AmountLowerThan {
            requested: 10 * E18 + 1,
            available: 10 * E18
        })
    );

    assert!(l
        .treasury
        .withdraw(&owner, &to, 10 * E18, NATIVE_TOKEN)
        .unwrap());
    assert_eq!(l.treasury.eth_owned(), 0);
    assert_eq!(l.bank.balance_of(&to), 10 * E18);
}

#[test]
fn test_rejected_transfer_restores_ledger() {
    let l = ledger();
    l.fund(5 * E18);
    let wall = Address::from_low_u64(88);
    l.bank.set_receiver(wall, Arc::new(RejectAll));
    let owner = CallContext::new(l.owner, LAUNCH);

    assert!(matches!(
        l.treasury.withdraw(&owner, &wall, 2 * E18, NATIVE_TOKEN),
        Err(ProtocolError::TransferFailed { .. })
    ));
    assert_eq!(l.treasury.eth_owned(), 5 * E18);
    assert_eq!(l.bank.balance_of(&l.treasury.address()), 5 * E18);

    let dispenser = CallContext::new(l.dispenser, LAUNCH);
    assert!(matches!(
        l.treasury.withdraw_to_account(&dispenser, &wall, 2 * E18, 0),
        Err(ProtocolError::TransferFailed { .. })
    ));
    assert_eq!(l.treasury.eth_owned(), 5 * E18);
}

#[test]
fn test_drain_slashed_funds() {
    let l = ledger();
    let owner = CallContext::new(l.owner, LAUNCH);
    assert_eq!(l.treasury.drain_service_slashed_funds(&owner).unwrap(), 0);

    l.services.slash(E18);
    assert!(matches!(
        l.treasury
            .drain_service_slashed_funds(&CallContext::new(l.donor, LAUNCH)),
        Err(ProtocolError::OwnerOnly { .. })
    ));
    assert_eq!(l.treasury.drain_service_slashed_funds(&owner).unwrap(), E18);
    assert_eq!(l.treasury.eth_owned(), E18);
    assert_eq!(l.bank.balance_of(&l.treasury.address()), E18);
}

#[test]
fn test_pause_blocks_non_owner_entry_points() {
    let mut l = ledger();
    l.fund(E18);
    assert!(l.treasury.pause(&l.donor).is_err());
    assert!(l.treasury.unpause(&l.donor).is_err());

    l.treasury.pause(&l.owner).unwrap();
    assert!(l.treasury.paused());

    let dispenser = CallContext::new(l.dispenser, LAUNCH);
    assert_eq!(
        l.treasury.withdraw_to_account(&dispenser, &l.developer, 0, 0),
        Err(ProtocolError::Paused)
    );
    assert_eq!(
        l.treasury
            .rebalance_treasury(&l.tokenomics.address(), E18),
        Err(ProtocolError::Paused)
    );
    assert_eq!(l.donate(E18, LAUNCH), Err(ProtocolError::Paused));

    let dai = Address::from_low_u64(0xda1);
    l.treasury.enable_token(&l.owner, dai).unwrap();
    l.tokens.mint(&dai, &l.depository, E18);
    l.tokens.approve(&dai, &l.depository, &l.treasury.address(), E18);
    let depository = CallContext::new(l.depository, LAUNCH);
    assert_eq!(
        l.treasury
            .deposit_token_for_olas(&depository, &l.developer, E18, dai, E18),
        Err(ProtocolError::Paused)
    );
    assert_eq!(l.treasury.token_reserve(&dai), 0);
    assert_eq!(l.olas.total_supply(), 0);

    let direct = CallContext::new(l.donor, LAUNCH).with_value(E18);
    assert_eq!(l.treasury.receive_eth(&direct), Err(ProtocolError::Paused));
    assert_eq!(l.treasury.eth_owned(), E18);

    // A checkpoint cannot settle while the treasury is paused
    let ctx = CallContext::new(l.owner, LAUNCH + EPOCH);
    assert_eq!(
        l.tokenomics.checkpoint(&ctx, &l.treasury),
        Err(ProtocolError::RewardsAllocationFailed(1))
    );
    assert_eq!(l.tokenomics.epoch_counter(), 1);

    // The owner keeps control of the funds
    let owner = CallContext::new(l.owner, LAUNCH);
    assert!(l
        .treasury
        .withdraw(&owner, &l.owner, E18, NATIVE_TOKEN)
        .unwrap());

    l.treasury.unpause(&l.owner).unwrap();
    assert!(l.tokenomics.checkpoint(&ctx, &l.treasury).unwrap());
}

#[test]
fn test_manager_changes() {
    let l = ledger();
    let new_dispenser = Address::from_low_u64(99);
    l.treasury
        .change_managers(&l.owner, Address::ZERO, Address::ZERO, new_dispenser)
        .unwrap();
    assert_eq!(l.treasury.manager(TreasuryRole::Dispenser), new_dispenser);
    assert_eq!(l.treasury.manager(TreasuryRole::Depository), l.depository);

    assert!(l.treasury.change_owner(&l.donor, l.donor).is_err());
    assert_eq!(
        l.treasury.change_owner(&l.owner, Address::ZERO),
        Err(ProtocolError::ZeroAddress)
    );
    l.treasury.change_owner(&l.owner, l.donor).unwrap();
    assert_eq!(l.treasury.owner(), l.donor);
}
