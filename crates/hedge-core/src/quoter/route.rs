//! # Route Types
//!
//! Swap paths of both legs and the tagged route variant resolved once per
//! operation from `(leg, sign(amount))`.

use crate::constants::MAX_ROUTE_HOPS;
use crate::errors::{HedgeError, HedgeResult};
use crate::types::{Asset, Leg};

/// Multi-hop path in trade order: `tokens[0]` is sold, the last token is bought.
/// `fee_tiers[i]` identifies the pool between `tokens[i]` and `tokens[i + 1]`
/// (hundredths of a basis point).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct SwapPath {
    pub tokens: Vec<Asset>,
    pub fee_tiers: Vec<u32>,
}

impl SwapPath {
    pub fn new(tokens: Vec<Asset>, fee_tiers: Vec<u32>) -> HedgeResult<Self> {
        let path = Self { tokens, fee_tiers };
        path.validate()?;
        Ok(path)
    }

    /// Number of pools crossed
    pub fn hops(&self) -> usize {
        self.fee_tiers.len()
    }

    pub fn input(&self) -> Option<Asset> {
        self.tokens.first().copied()
    }

    pub fn output(&self) -> Option<Asset> {
        self.tokens.last().copied()
    }

    /// The same pools traversed in the opposite direction
    pub fn reversed(&self) -> Self {
        Self {
            tokens: self.tokens.iter().rev().copied().collect(),
            fee_tiers: self.fee_tiers.iter().rev().copied().collect(),
        }
    }

    /// Pools of the path as `(token_in, token_out, fee_tier)`
    pub fn pools(&self) -> impl Iterator<Item = (Asset, Asset, u32)> + '_ {
        self.tokens
            .windows(2)
            .zip(&self.fee_tiers)
            .map(|(pair, fee)| (pair[0], pair[1], *fee))
    }

    /// Check shape: at least one hop, at most `MAX_ROUTE_HOPS`, one fee tier
    /// per hop, no token visited twice
    pub fn validate(&self) -> HedgeResult<()> {
        if self.fee_tiers.is_empty() {
            return Err(HedgeError::InvalidRoute("path needs at least one hop"));
        }
        if self.hops() > MAX_ROUTE_HOPS {
            return Err(HedgeError::InvalidRoute("path has too many hops"));
        }
        if self.tokens.len() != self.fee_tiers.len() + 1 {
            return Err(HedgeError::InvalidRoute("path needs one fee tier per hop"));
        }
        for (i, token) in self.tokens.iter().enumerate() {
            if self.tokens[i + 1..].contains(token) {
                return Err(HedgeError::InvalidRoute("path visits a token twice"));
            }
        }
        Ok(())
    }
}

/// Sell-side paths of both legs, each from the leg token to the stablecoin
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct RouteConfig {
    pub btc_path: SwapPath,
    pub eth_path: SwapPath,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            btc_path: SwapPath {
                tokens: vec![Asset::Btc, Asset::Eth, Asset::Stable],
                fee_tiers: vec![500, 500],
            },
            eth_path: SwapPath {
                tokens: vec![Asset::Eth, Asset::Stable],
                fee_tiers: vec![500],
            },
        }
    }
}

impl RouteConfig {
    /// Sell-side path of `leg`
    pub fn path(&self, leg: Leg) -> &SwapPath {
        match leg {
            Leg::Btc => &self.btc_path,
            Leg::Eth => &self.eth_path,
        }
    }

    pub fn validate(&self) -> HedgeResult<()> {
        for leg in Leg::ALL {
            let path = self.path(leg);
            path.validate()?;
            if path.input() != Some(leg.asset()) {
                return Err(HedgeError::InvalidRoute("path must start at the leg token"));
            }
            if path.output() != Some(Asset::Stable) {
                return Err(HedgeError::InvalidRoute("path must end at the stablecoin"));
            }
            if path.tokens.contains(&Asset::Basket) {
                return Err(HedgeError::InvalidRoute("basket token cannot be routed through"));
            }
        }
        Ok(())
    }
}

/// Route of one leg swap: the leg crossed with the swap kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapRoute {
    /// Sell an exact amount of BTC for stablecoin
    BtcExactIn,
    /// Buy an exact amount of BTC with stablecoin
    BtcExactOut,
    EthExactIn,
    EthExactOut,
}

impl SwapRoute {
    /// Positive amounts sell exact-in, negative amounts buy exact-out; zero needs no route
    pub fn resolve(leg: Leg, amount: i128) -> Option<Self> {
        match (leg, amount.signum()) {
            (_, 0) => None,
            (Leg::Btc, 1) => Some(Self::BtcExactIn),
            (Leg::Btc, _) => Some(Self::BtcExactOut),
            (Leg::Eth, 1) => Some(Self::EthExactIn),
            (Leg::Eth, _) => Some(Self::EthExactOut),
        }
    }

    pub fn leg(&self) -> Leg {
        match self {
            Self::BtcExactIn | Self::BtcExactOut => Leg::Btc,
            Self::EthExactIn | Self::EthExactOut => Leg::Eth,
        }
    }

    pub fn is_exact_input(&self) -> bool {
        matches!(self, Self::BtcExactIn | Self::EthExactIn)
    }

    /// Path in trade order: the sell path for exact-in, reversed for exact-out
    pub fn path(&self, routes: &RouteConfig) -> SwapPath {
        let path = routes.path(self.leg());
        if self.is_exact_input() {
            path.clone()
        } else {
            path.reversed()
        }
    }
}
