//! OLAS Treasury Module
//!
//! Holds the protocol's native value and reserve tokens:
//! - Service donations, reported to the tokenomics engine as epoch revenue
//! - Protocol-owned funds, filled by checkpoint rebalances and slashed funds
//! - Reserve tokens deposited by the depository in exchange for minted OLAS
//! - Payouts of claimed incentives on behalf of the dispenser
//!
//! Mutating entry points share one reentrancy lock and honour the pause flag.

pub mod pool;
pub mod treasury;

pub use pool::{TreasuryPool, TreasuryReport};
pub use treasury::{Collaborators, Treasury, TreasuryConfig, TreasuryRole};

pub use olas_core::{ProtocolError, Result};
