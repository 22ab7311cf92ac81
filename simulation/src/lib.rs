//! Simulation framework for the hedge rebalancing engine
//!
//! Provides an in-memory host implementing every collaborator the engine
//! drives:
//! - Basket index with min/max pricing and stablecoin mint/redeem
//! - Lending market with health-factor checks and interest accrual
//! - Constant-product AMM pools behind a multi-hop router
//! - Flash-loan provider and counterparty tranche
//! - Nested checkpoints for atomic flows
//!
//! plus a seeded price walk and a scenario runner on top of them.

pub mod amm;
pub mod basket;
pub mod config;
pub mod flash;
pub mod host;
pub mod lending;
pub mod scenario_runner;
pub mod tranche;

pub use config::SimulationConfig;
pub use host::{SimState, SimulatedHost};
pub use scenario_runner::{PriceWalk, ScenarioReport, ScenarioRunner, StepOutcome};

use hedge_core::HedgeError;

/// Simulation errors
#[derive(thiserror::Error, Debug)]
pub enum SimulationError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Engine error: {0}")]
    Engine(#[from] HedgeError),
}

/// Simulation result type
pub type SimulationResult<T> = std::result::Result<T, SimulationError>;
