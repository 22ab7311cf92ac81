//! # Engine Configuration
//!
//! Configuration is injected into the engine at construction and never
//! changes during a rebalance call.

use crate::constants::*;
use crate::errors::{HedgeError, HedgeResult};
use crate::fee_split::FeeSplitCurve;
use crate::quoter::RouteConfig;
use crate::types::{Leg, TokenDecimals};

/// Identity of the only caller allowed to run mutating flows
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "client", serde(transparent))]
pub struct KeeperId(pub String);

impl KeeperId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for KeeperId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rebalance thresholds
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct Thresholds {
    /// Slippage bound for BTC-leg swaps (basis points)
    pub btc_swap_slippage_bps: u32,
    /// Slippage bound for ETH-leg swaps (basis points)
    pub eth_swap_slippage_bps: u32,
    /// Slippage bound for basket mint/redeem conversions (basis points)
    pub basket_slippage_bps: u32,
    /// Target health factor (basis points, above 10000 means over-collateralized)
    pub target_health_factor_bps: u32,
    /// Accepted distance of the health factor from its target (basis points)
    pub health_factor_band_bps: u32,
    /// Relative move that fires the deviation trigger (basis points)
    pub deviation_threshold_bps: u32,
    /// Minimum seconds between time-triggered rebalances
    pub min_rebalance_interval_secs: i64,
    /// Stablecoin notional below which a leg adjustment is skipped
    #[cfg_attr(feature = "client", serde(with = "amount_u64"))]
    pub dust_threshold: u128,
    /// Basket amount below which an unhedged remainder is left in the basket
    #[cfg_attr(feature = "client", serde(with = "amount_u64"))]
    pub basket_dust_threshold: u128,
    /// Whether a hedge limited by the counterparty's capacity may proceed partially
    pub allow_partial_hedge: bool,
}

impl Thresholds {
    /// Slippage bound of `leg`'s swap route
    pub fn swap_slippage_bps(&self, leg: Leg) -> u32 {
        match leg {
            Leg::Btc => self.btc_swap_slippage_bps,
            Leg::Eth => self.eth_swap_slippage_bps,
        }
    }

    /// Validate thresholds
    pub fn validate(&self) -> HedgeResult<()> {
        for slippage in [
            self.btc_swap_slippage_bps,
            self.eth_swap_slippage_bps,
            self.basket_slippage_bps,
        ] {
            if slippage >= MAX_BPS {
                return Err(HedgeError::InvalidParameter("slippage bound must be below 100%"));
            }
        }

        if self.target_health_factor_bps <= MAX_BPS {
            return Err(HedgeError::InvalidParameter("target health factor must exceed 1.0"));
        }

        if self.health_factor_band_bps >= self.target_health_factor_bps {
            return Err(HedgeError::InvalidParameter(
                "health factor band must be narrower than the target",
            ));
        }

        if self.deviation_threshold_bps == 0 {
            return Err(HedgeError::InvalidParameter("deviation threshold must be positive"));
        }

        if self.min_rebalance_interval_secs < 0 {
            return Err(HedgeError::InvalidParameter("rebalance interval must not be negative"));
        }

        Ok(())
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            btc_swap_slippage_bps: DEFAULT_SWAP_SLIPPAGE_BPS,
            eth_swap_slippage_bps: DEFAULT_SWAP_SLIPPAGE_BPS,
            basket_slippage_bps: DEFAULT_BASKET_SLIPPAGE_BPS,
            target_health_factor_bps: DEFAULT_TARGET_HEALTH_FACTOR_BPS,
            health_factor_band_bps: DEFAULT_HEALTH_FACTOR_BAND_BPS,
            deviation_threshold_bps: DEFAULT_DEVIATION_THRESHOLD_BPS,
            min_rebalance_interval_secs: DEFAULT_MIN_REBALANCE_INTERVAL_SECS,
            dust_threshold: DEFAULT_DUST_THRESHOLD,
            basket_dust_threshold: DEFAULT_BASKET_DUST_THRESHOLD,
            allow_partial_hedge: true,
        }
    }
}

/// Amounts stored as 64-bit integers, the widest TOML carries
#[cfg(feature = "client")]
mod amount_u64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::Error;
        let value = u64::try_from(*value).map_err(|_| S::Error::custom("amount exceeds 64 bits"))?;
        serializer.serialize_u64(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        u64::deserialize(deserializer).map(u128::from)
    }
}

/// Everything the engine needs besides the host
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    /// Caller allowed to run rebalance flows
    pub keeper: KeeperId,
    /// Rebalance thresholds
    pub thresholds: Thresholds,
    /// Token decimals
    #[cfg_attr(feature = "client", serde(default))]
    pub decimals: TokenDecimals,
    /// Swap routes of both legs
    #[cfg_attr(feature = "client", serde(default))]
    pub routes: RouteConfig,
    /// Yield split with the counterparty tranche
    #[cfg_attr(feature = "client", serde(default))]
    pub fee_split: FeeSplitCurve,
}

impl EngineConfig {
    /// Create a configuration with default thresholds, routes and fee split
    pub fn new(keeper: KeeperId) -> Self {
        Self {
            keeper,
            thresholds: Thresholds::default(),
            decimals: TokenDecimals::default(),
            routes: RouteConfig::default(),
            fee_split: FeeSplitCurve::default(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> HedgeResult<()> {
        if self.keeper.0.is_empty() {
            return Err(HedgeError::InvalidParameter("keeper id must not be empty"));
        }
        self.thresholds.validate()?;
        self.routes.validate()?;
        self.fee_split.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::new(KeeperId::new("keeper"));
        assert!(config.validate().is_ok());

        config.thresholds.target_health_factor_bps = 9_000;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::new(KeeperId::new(""));
        assert!(config.validate().is_err());

        config.keeper = KeeperId::new("keeper");
        config.thresholds.basket_slippage_bps = MAX_BPS;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_leg_slippage() {
        let thresholds = Thresholds {
            btc_swap_slippage_bps: 30,
            eth_swap_slippage_bps: 70,
            ..Thresholds::default()
        };
        assert_eq!(thresholds.swap_slippage_bps(Leg::Btc), 30);
        assert_eq!(thresholds.swap_slippage_bps(Leg::Eth), 70);
    }
}
