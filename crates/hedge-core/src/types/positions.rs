//! # Position Types
//!
//! The vault's stateful entities as the engine sees them. Positions are
//! read from the host; only `RebalanceState` is owned by the engine.

use crate::errors::{HedgeError, HedgeResult};
use crate::types::Leg;

/// Amounts of each volatile asset owed to the lending market
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct BorrowPosition {
    pub btc: u128,
    pub eth: u128,
}

impl BorrowPosition {
    pub fn new(btc: u128, eth: u128) -> Self {
        Self { btc, eth }
    }

    /// Amount owed on `leg`
    pub fn get(&self, leg: Leg) -> u128 {
        match leg {
            Leg::Btc => self.btc,
            Leg::Eth => self.eth,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.btc == 0 && self.eth == 0
    }
}

/// Stablecoin supplied as collateral, split by owner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct CollateralPosition {
    /// Everything supplied on behalf of the vault
    pub total: u128,
    /// Portion funded by borrowing from the counterparty tranche
    pub counterparty_owned: u128,
}

impl CollateralPosition {
    /// Build a position, checking `total >= counterparty_owned`
    pub fn new(total: u128, counterparty_owned: u128) -> HedgeResult<Self> {
        if total < counterparty_owned {
            return Err(HedgeError::InvalidRebalanceState(
                "collateral below counterparty-owned portion",
            ));
        }
        Ok(Self {
            total,
            counterparty_owned,
        })
    }

    /// Portion of the collateral that belongs to the vault itself
    pub fn vault_owned(&self) -> u128 {
        self.total - self.counterparty_owned
    }
}

/// Basket-token holdings of the vault
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct BasketPosition {
    pub amount: u128,
}

/// Volatile-asset weights of the basket, scaled by `WEIGHT_PRECISION`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct Composition {
    pub btc_weight: u128,
    pub eth_weight: u128,
}

impl Composition {
    pub fn weight(&self, leg: Leg) -> u128 {
        match leg {
            Leg::Btc => self.btc_weight,
            Leg::Eth => self.eth_weight,
        }
    }
}

/// What the engine remembers between rebalances
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct RebalanceState {
    pub last_rebalance_timestamp: i64,
    pub last_known_composition: Composition,
    /// Stablecoin collateral redeemed from basket tokens a partial hedge
    /// could not cover. Held apart from the funding hedge collateral.
    #[cfg_attr(feature = "client", serde(default))]
    pub unhedged_collateral: u128,
}
