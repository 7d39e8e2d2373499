//! OLAS tokenomics simulator
//!
//! Loads a scenario, deploys the engine and the treasury on the simulated
//! ledger and runs epochs against them.

pub mod error;
pub mod runner;
pub mod scenario;

pub use error::{Result, SimError};
pub use runner::{EpochReport, Payout, Simulation, SimulationReport};
pub use scenario::Scenario;
