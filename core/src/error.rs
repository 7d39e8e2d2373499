//! Protocol error types

use crate::fixed::ArithmeticError;
use thiserror::Error;

/// Failure kinds shared by the tokenomics engine and the treasury
///
/// Every variant except [`ProtocolError::Arithmetic`] is a recoverable,
/// caller-facing condition: the failing call leaves state unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Only the owner {owner} may call this, caller was {sender}")]
    OwnerOnly { sender: String, owner: String },

    #[error("Only the {role} manager {manager} may call this, caller was {sender}")]
    ManagerOnly {
        sender: String,
        manager: String,
        role: &'static str,
    },

    #[error("Zero address")]
    ZeroAddress,

    #[error("Zero value")]
    ZeroValue,

    #[error("Wrong array length: {left} vs {right}")]
    WrongArrayLength { left: usize, right: usize },

    #[error("Wrong amount: provided {provided}, expected {expected}")]
    WrongAmount { provided: u128, expected: u128 },

    #[error("Unauthorized token: {0}")]
    UnauthorizedToken(String),

    #[error("Non-zero value: {0}")]
    NonZeroValue(u128),

    #[error("Amount {requested} exceeds available {available}")]
    AmountLowerThan { requested: u128, available: u128 },

    #[error("Transfer of {amount} from {from} to {to} failed")]
    TransferFailed { from: String, to: String, amount: u128 },

    #[error("Service does not exist: {0}")]
    ServiceDoesNotExist(u32),

    #[error("Rewards allocation failed for epoch {0}")]
    RewardsAllocationFailed(u32),

    #[error("Contract is paused")]
    Paused,

    #[error("Reentrant call rejected")]
    ReentrancyGuard,

    #[error("Arithmetic invariant violated: {0}")]
    Arithmetic(#[from] ArithmeticError),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
