//! # Asset Types
//!
//! The four tokens the engine touches and the two hedged legs.

use crate::errors::HedgeResult;
use crate::math::pow10;

/// Tokens known to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "client", serde(rename_all = "lowercase"))]
pub enum Asset {
    /// Stablecoin used as collateral and as the quote asset of every route
    Stable,
    /// BTC-leg volatile asset
    Btc,
    /// ETH-leg volatile asset
    Eth,
    /// Basket liquidity token held by the vault
    Basket,
}

/// One of the two hedged volatile-asset positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "client", serde(rename_all = "lowercase"))]
pub enum Leg {
    Btc,
    Eth,
}

impl Leg {
    /// Both legs, in processing order
    pub const ALL: [Leg; 2] = [Leg::Btc, Leg::Eth];

    /// Token borrowed for this leg
    pub fn asset(&self) -> Asset {
        match self {
            Leg::Btc => Asset::Btc,
            Leg::Eth => Asset::Eth,
        }
    }
}

impl std::fmt::Display for Leg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Leg::Btc => write!(f, "BTC"),
            Leg::Eth => write!(f, "ETH"),
        }
    }
}

/// Native decimals of each token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct TokenDecimals {
    pub stable: u32,
    pub btc: u32,
    pub eth: u32,
    pub basket: u32,
}

impl TokenDecimals {
    /// Decimals of `asset`
    pub fn of(&self, asset: Asset) -> u32 {
        match asset {
            Asset::Stable => self.stable,
            Asset::Btc => self.btc,
            Asset::Eth => self.eth,
            Asset::Basket => self.basket,
        }
    }

    /// One whole token of `asset` in native units
    pub fn unit(&self, asset: Asset) -> HedgeResult<u128> {
        pow10(self.of(asset))
    }
}

impl Default for TokenDecimals {
    fn default() -> Self {
        Self {
            stable: 6,
            btc: 8,
            eth: 18,
            basket: 18,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leg_assets() {
        assert_eq!(Leg::Btc.asset(), Asset::Btc);
        assert_eq!(Leg::Eth.asset(), Asset::Eth);
        assert_eq!(Leg::ALL.len(), 2);
    }

    #[test]
    fn test_units() {
        let decimals = TokenDecimals::default();
        assert_eq!(decimals.unit(Asset::Stable).unwrap(), 1_000_000);
        assert_eq!(decimals.unit(Asset::Btc).unwrap(), 100_000_000);
        assert_eq!(decimals.unit(Asset::Basket).unwrap(), 10u128.pow(18));
    }
}
