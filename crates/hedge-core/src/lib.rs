//! # Hedge Core - Delta-Neutral Rebalancing Engine
//!
//! This crate contains the hedge rebalancing engine of a basket vault that
//! holds a stablecoin/BTC/ETH liquidity token and neutralizes its exposure
//! to the two volatile assets by borrowing them on a lending market. It
//! provides:
//!
//! - Overflow-checked fixed-point math with explicit rounding
//! - The optimal borrow solver and the capped allocation adjuster
//! - Multi-hop swap quoting with conservative slippage estimates
//! - The two-slope fee-split curve
//! - The rebalance orchestrator and its flash-loan funded flows
//! - Traits describing the external collaborators the engine drives
//!
//! ## Feature Flags
//!
//! - `client`: Enables serde serialization for configuration and positions

// Re-export all modules
pub mod constants;
pub mod engine;
pub mod errors;
pub mod fee_split;
pub mod interfaces;
pub mod math;
pub mod oracle;
pub mod quoter;
pub mod solver;
pub mod types;

// Re-export commonly used items
pub use constants::*;
pub use engine::{FlowPhase, RebalanceEngine};
pub use errors::{HedgeError, HedgeResult};
pub use fee_split::FeeSplitCurve;
pub use interfaces::Host;
pub use types::*;
