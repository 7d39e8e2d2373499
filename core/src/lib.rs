//! OLAS Core Library
//!
//! Shared building blocks for the tokenomics engine and the treasury:
//! fixed-point arithmetic, addresses, role registries, the reentrancy lock,
//! the error taxonomy and the collaborator interfaces.

pub mod access;
pub mod address;
pub mod error;
pub mod fixed;
pub mod guard;
pub mod interfaces;
pub mod sim;

// Re-export main types
pub use access::{AccessControl, Role};
pub use address::{amount_serde, Address, Amount, CallContext, Timestamp, NATIVE_TOKEN};
pub use error::{ProtocolError, Result};
pub use fixed::{mul_div, ArithmeticError, FixedPoint, SCALE};
pub use guard::{LockGuard, ReentrancyLock};
pub use interfaces::{
    NativeBank, ProtocolToken, RevenueTracker, RewardsAllocator, ReserveTokens, ServiceRegistry,
    UnitRegistry, UnitType, VotingEscrow,
};

/// One OLAS / one ETH in base units
pub const E18: Amount = SCALE;

/// Seconds in a (non-leap) year
pub const ONE_YEAR: Timestamp = 365 * 86_400;
