//! # Price & Composition Oracle Adapter
//!
//! Read-side snapshots of external prices and of the basket's pooled
//! reserves. Snapshots are taken once per flow so every step of a flow
//! values tokens at the same prices.

use crate::constants::WEIGHT_PRECISION;
use crate::errors::{HedgeError, HedgeResult};
use crate::interfaces::{BasketVault, PriceOracle};
use crate::math::{mul_div, mul_mul_div, safe_add_u128, safe_mul_u128, Rounding};
use crate::types::{Asset, Composition, Leg, TokenDecimals};

/// Oracle prices of every token, USD per whole token at `PRICE_PRECISION`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceSheet {
    pub stable: u128,
    pub btc: u128,
    pub eth: u128,
    /// Basket token priced at the basket's minimum internal pricing
    pub basket_min: u128,
    /// Basket token priced at the basket's maximum internal pricing
    pub basket_max: u128,
    /// Which basket price `price(Asset::Basket)` reports
    pub use_min_price: bool,
    pub decimals: TokenDecimals,
}

impl PriceSheet {
    pub fn read<H>(host: &H, decimals: TokenDecimals, use_min_price: bool) -> HedgeResult<Self>
    where
        H: PriceOracle + BasketVault + ?Sized,
    {
        let sheet = Self {
            stable: host.price(Asset::Stable)?,
            btc: host.price(Asset::Btc)?,
            eth: host.price(Asset::Eth)?,
            basket_min: host.basket_price(false)?,
            basket_max: host.basket_price(true)?,
            use_min_price,
            decimals,
        };
        for asset in [Asset::Stable, Asset::Btc, Asset::Eth, Asset::Basket] {
            if sheet.price(asset) == 0 {
                return Err(HedgeError::QuoteUnavailable("zero oracle price"));
            }
        }
        Ok(sheet)
    }

    /// The same prices with the basket token valued at its min or max price
    pub fn with_basket_pricing(mut self, use_min_price: bool) -> Self {
        self.use_min_price = use_min_price;
        self
    }

    pub fn price(&self, asset: Asset) -> u128 {
        match asset {
            Asset::Stable => self.stable,
            Asset::Btc => self.btc,
            Asset::Eth => self.eth,
            Asset::Basket if self.use_min_price => self.basket_min,
            Asset::Basket => self.basket_max,
        }
    }

    /// Value of `amount` of `asset` in stablecoin native units
    pub fn to_stable(&self, asset: Asset, amount: u128, rounding: Rounding) -> HedgeResult<u128> {
        if asset == Asset::Stable {
            return Ok(amount);
        }
        let denominator = safe_mul_u128(self.decimals.unit(asset)?, self.stable)?;
        mul_mul_div(
            amount,
            self.price(asset),
            self.decimals.unit(Asset::Stable)?,
            denominator,
            rounding,
        )
    }

    /// Amount of `asset` worth `value` stablecoin native units
    pub fn from_stable(&self, asset: Asset, value: u128, rounding: Rounding) -> HedgeResult<u128> {
        if asset == Asset::Stable {
            return Ok(value);
        }
        let denominator = safe_mul_u128(self.decimals.unit(Asset::Stable)?, self.price(asset))?;
        mul_mul_div(
            value,
            self.stable,
            self.decimals.unit(asset)?,
            denominator,
            rounding,
        )
    }
}

/// The basket's pooled reserves and internal prices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasketSnapshot {
    pub stable_pool: u128,
    pub btc_pool: u128,
    pub eth_pool: u128,
    pub stable_price: u128,
    pub btc_price: u128,
    pub eth_price: u128,
    pub supply: u128,
    pub decimals: TokenDecimals,
}

impl BasketSnapshot {
    /// Read pools and the basket's min (`use_min_price`) or max internal prices
    pub fn read<H>(host: &H, decimals: TokenDecimals, use_min_price: bool) -> HedgeResult<Self>
    where
        H: BasketVault + ?Sized,
    {
        let maximise = !use_min_price;
        Ok(Self {
            stable_pool: host.pool_amount(Asset::Stable)?,
            btc_pool: host.pool_amount(Asset::Btc)?,
            eth_pool: host.pool_amount(Asset::Eth)?,
            stable_price: host.asset_price(Asset::Stable, maximise)?,
            btc_price: host.asset_price(Asset::Btc, maximise)?,
            eth_price: host.asset_price(Asset::Eth, maximise)?,
            supply: host.basket_supply()?,
            decimals,
        })
    }

    pub fn pool(&self, leg: Leg) -> u128 {
        match leg {
            Leg::Btc => self.btc_pool,
            Leg::Eth => self.eth_pool,
        }
    }

    /// Basket-internal price of `leg`
    pub fn price(&self, leg: Leg) -> u128 {
        match leg {
            Leg::Btc => self.btc_price,
            Leg::Eth => self.eth_price,
        }
    }

    /// USD value of a pool at `PRICE_PRECISION`
    fn pool_value(&self, asset: Asset, amount: u128, price: u128) -> HedgeResult<u128> {
        mul_div(amount, price, self.decimals.unit(asset)?, Rounding::Down)
    }

    /// Assets under management of the basket in USD at `PRICE_PRECISION`
    pub fn aum(&self) -> HedgeResult<u128> {
        let stable = self.pool_value(Asset::Stable, self.stable_pool, self.stable_price)?;
        let btc = self.pool_value(Asset::Btc, self.btc_pool, self.btc_price)?;
        let eth = self.pool_value(Asset::Eth, self.eth_pool, self.eth_price)?;
        safe_add_u128(safe_add_u128(stable, btc)?, eth)
    }

    /// Share of the basket's value held in `leg`, at `WEIGHT_PRECISION`
    pub fn weight(&self, leg: Leg) -> HedgeResult<u128> {
        let aum = self.aum()?;
        if aum == 0 {
            return Ok(0);
        }
        let value = self.pool_value(leg.asset(), self.pool(leg), self.price(leg))?;
        mul_div(value, WEIGHT_PRECISION, aum, Rounding::Down)
    }

    pub fn composition(&self) -> HedgeResult<Composition> {
        Ok(Composition {
            btc_weight: self.weight(Leg::Btc)?,
            eth_weight: self.weight(Leg::Eth)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::PRICE_PRECISION;

    fn sheet() -> PriceSheet {
        PriceSheet {
            stable: PRICE_PRECISION,
            btc: 20_000 * PRICE_PRECISION,
            eth: 1_500 * PRICE_PRECISION,
            basket_min: 99 * PRICE_PRECISION,
            basket_max: 101 * PRICE_PRECISION,
            use_min_price: true,
            decimals: TokenDecimals::default(),
        }
    }

    fn snapshot() -> BasketSnapshot {
        BasketSnapshot {
            stable_pool: 80_000_000 * 1_000_000,
            btc_pool: 600 * 100_000_000,
            eth_pool: 4_000 * 10u128.pow(18),
            stable_price: PRICE_PRECISION,
            btc_price: 20_000 * PRICE_PRECISION,
            eth_price: 2_000 * PRICE_PRECISION,
            supply: 1_000_000 * 10u128.pow(18),
            decimals: TokenDecimals::default(),
        }
    }

    #[test]
    fn test_stable_conversions() {
        let prices = sheet();
        // 0.06 BTC at $20k is $1,200
        assert_eq!(
            prices.to_stable(Asset::Btc, 6_000_000, Rounding::Down).unwrap(),
            1_200_000_000
        );
        // $1,500 buys one ETH
        assert_eq!(
            prices.from_stable(Asset::Eth, 1_500_000_000, Rounding::Down).unwrap(),
            10u128.pow(18)
        );
        assert_eq!(prices.to_stable(Asset::Stable, 42, Rounding::Up).unwrap(), 42);
    }

    #[test]
    fn test_basket_pricing_flag() {
        let prices = sheet();
        let one = 10u128.pow(18);
        assert_eq!(prices.to_stable(Asset::Basket, one, Rounding::Down).unwrap(), 99_000_000);
        let prices = prices.with_basket_pricing(false);
        assert_eq!(prices.to_stable(Asset::Basket, one, Rounding::Down).unwrap(), 101_000_000);
    }

    #[test]
    fn test_rounding_direction() {
        let prices = sheet();
        // One wei of ETH is worth far less than one stablecoin unit
        assert_eq!(prices.to_stable(Asset::Eth, 1, Rounding::Down).unwrap(), 0);
        assert_eq!(prices.to_stable(Asset::Eth, 1, Rounding::Up).unwrap(), 1);
        // One satoshi is worth $0.0002
        assert_eq!(prices.to_stable(Asset::Btc, 1, Rounding::Down).unwrap(), 200);
    }

    #[test]
    fn test_composition() {
        let basket = snapshot();
        assert_eq!(basket.aum().unwrap(), 100_000_000 * PRICE_PRECISION);
        let composition = basket.composition().unwrap();
        assert_eq!(composition.btc_weight, WEIGHT_PRECISION * 12 / 100);
        assert_eq!(composition.eth_weight, WEIGHT_PRECISION * 8 / 100);
    }
}
