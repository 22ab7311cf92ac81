//! # Engine Constants
//!
//! Fundamental constants for the hedge engine including:
//! - Fixed-point scales (basis points, oracle prices, weights, fee split)
//! - Route limits
//! - Default thresholds used by configuration

// ============================================================================
// Mathematical Constants
// ============================================================================

/// Basis points denominator (10,000 = 100%)
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Maximum percentage in basis points (100%)
pub const MAX_BPS: u32 = 10_000;

/// Oracle prices are USD per whole token with this many decimals
pub const PRICE_DECIMALS: u32 = 8;

/// Oracle price scale (1e8)
pub const PRICE_PRECISION: u128 = 100_000_000;

/// Composition weights are fractions scaled by 1e18
pub const WEIGHT_PRECISION: u128 = 1_000_000_000_000_000_000;

/// Fee-split rates and utilization are fractions scaled by 1e30
pub const FEE_SPLIT_PRECISION: u128 = 1_000_000_000_000_000_000_000_000_000_000;

/// Health factor reported when there is no debt at all
pub const HEALTH_FACTOR_NO_DEBT: u128 = u128::MAX;

// ============================================================================
// Route Constants
// ============================================================================

/// Maximum number of hops on a leg's swap route
pub const MAX_ROUTE_HOPS: usize = 3;

/// Seconds an outbound swap stays valid after it is issued
pub const SWAP_DEADLINE_SECS: i64 = 120;

// ============================================================================
// Default Thresholds
// ============================================================================

/// Default per-leg swap slippage bound (1%)
pub const DEFAULT_SWAP_SLIPPAGE_BPS: u32 = 100;

/// Default basket conversion slippage bound (0.5%)
pub const DEFAULT_BASKET_SLIPPAGE_BPS: u32 = 50;

/// Default target health factor (1.5)
pub const DEFAULT_TARGET_HEALTH_FACTOR_BPS: u32 = 15_000;

/// Default acceptance band around the target health factor (0.1)
pub const DEFAULT_HEALTH_FACTOR_BAND_BPS: u32 = 1_000;

/// Default deviation trigger (5% relative move)
pub const DEFAULT_DEVIATION_THRESHOLD_BPS: u32 = 500;

/// Default minimum time between time-triggered rebalances (12 hours)
pub const DEFAULT_MIN_REBALANCE_INTERVAL_SECS: i64 = 12 * 60 * 60;

/// Default dust threshold in stablecoin native units (10 units of a 6-decimal stablecoin)
pub const DEFAULT_DUST_THRESHOLD: u128 = 10_000_000;

/// Default basket dust threshold in basket native units (0.1 of an 18-decimal token)
pub const DEFAULT_BASKET_DUST_THRESHOLD: u128 = 100_000_000_000_000_000;
