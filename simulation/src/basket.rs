//! Basket index: pooled reserves, min/max pricing, stablecoin mint and redeem.

use hedge_core::interfaces::{BasketVault, PriceOracle};
use hedge_core::math::{apply_bps_discount, apply_bps_premium, mul_div, safe_add_u128, safe_sub_u128, Rounding};
use hedge_core::{Asset, HedgeError, HedgeResult, PRICE_PRECISION};
use std::collections::BTreeMap;
use tracing::debug;

use crate::host::SimulatedHost;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasketState {
    /// Pooled reserves in native units
    pub pools: BTreeMap<Asset, u128>,
    pub supply: u128,
    /// Spread between the basket's min and max price of a volatile asset
    pub price_spread_bps: u32,
    pub mint_fee_bps: u32,
    pub redeem_fee_bps: u32,
}

impl BasketState {
    pub fn pool(&self, asset: Asset) -> u128 {
        self.pools.get(&asset).copied().unwrap_or(0)
    }
}

impl SimulatedHost {
    /// Assets under management in USD at `PRICE_PRECISION`
    fn basket_aum(&self, maximise: bool) -> HedgeResult<u128> {
        let decimals = self.state().decimals;
        let mut aum = 0;
        for (asset, amount) in &self.state().basket.pools {
            let value = mul_div(
                *amount,
                self.asset_price(*asset, maximise)?,
                decimals.unit(*asset)?,
                Rounding::Down,
            )?;
            aum = safe_add_u128(aum, value)?;
        }
        Ok(aum)
    }

    fn stable_usd(&self, amount: u128, rounding: Rounding) -> HedgeResult<u128> {
        let unit = self.state().decimals.unit(Asset::Stable)?;
        mul_div(amount, self.asset_price(Asset::Stable, false)?, unit, rounding)
    }

    fn usd_stable(&self, usd: u128, rounding: Rounding) -> HedgeResult<u128> {
        let unit = self.state().decimals.unit(Asset::Stable)?;
        mul_div(usd, unit, self.asset_price(Asset::Stable, true)?, rounding)
    }
}

impl BasketVault for SimulatedHost {
    fn pool_amount(&self, asset: Asset) -> HedgeResult<u128> {
        Ok(self.state().basket.pool(asset))
    }

    fn basket_supply(&self) -> HedgeResult<u128> {
        Ok(self.state().basket.supply)
    }

    fn asset_price(&self, asset: Asset, maximise: bool) -> HedgeResult<u128> {
        if asset == Asset::Basket {
            return Err(HedgeError::InvalidParameter("basket token is not pooled"));
        }
        let price = self.price(asset)?;
        let spread = self.state().basket.price_spread_bps;
        match asset {
            Asset::Btc | Asset::Eth if maximise => apply_bps_premium(price, spread, Rounding::Up),
            Asset::Btc | Asset::Eth => apply_bps_discount(price, spread, Rounding::Down),
            _ => Ok(price),
        }
    }

    fn basket_price(&self, maximise: bool) -> HedgeResult<u128> {
        let supply = self.state().basket.supply;
        if supply == 0 {
            return Ok(PRICE_PRECISION);
        }
        let unit = self.state().decimals.unit(Asset::Basket)?;
        mul_div(self.basket_aum(maximise)?, unit, supply, Rounding::Down)
    }

    fn mint(&mut self, stable_in: u128, min_basket_out: u128) -> HedgeResult<u128> {
        let net = apply_bps_discount(stable_in, self.state().basket.mint_fee_bps, Rounding::Down)?;
        let unit = self.state().decimals.unit(Asset::Basket)?;
        let minted = mul_div(
            self.stable_usd(net, Rounding::Down)?,
            unit,
            self.basket_price(true)?,
            Rounding::Down,
        )?;
        if minted < min_basket_out {
            return Err(HedgeError::slippage(min_basket_out, minted));
        }

        self.debit(Asset::Stable, stable_in)?;
        let basket = &mut self.state_mut().basket;
        let pool = basket.pools.entry(Asset::Stable).or_insert(0);
        *pool = safe_add_u128(*pool, stable_in)?;
        basket.supply = safe_add_u128(basket.supply, minted)?;
        self.credit(Asset::Basket, minted)?;

        debug!(stable_in, minted, "basket minted");
        Ok(minted)
    }

    fn redeem(&mut self, basket_in: u128, min_stable_out: u128) -> HedgeResult<u128> {
        let unit = self.state().decimals.unit(Asset::Basket)?;
        let usd = mul_div(basket_in, self.basket_price(false)?, unit, Rounding::Down)?;
        let gross = self.usd_stable(usd, Rounding::Down)?;
        let out = apply_bps_discount(gross, self.state().basket.redeem_fee_bps, Rounding::Down)?;
        if out < min_stable_out {
            return Err(HedgeError::slippage(min_stable_out, out));
        }
        if out > self.state().basket.pool(Asset::Stable) {
            return Err(HedgeError::InsufficientBalance {
                asset: Asset::Stable,
                required: out,
                available: self.state().basket.pool(Asset::Stable),
            });
        }

        self.debit(Asset::Basket, basket_in)?;
        let basket = &mut self.state_mut().basket;
        basket.supply = safe_sub_u128(basket.supply, basket_in)?;
        let pool = basket.pools.entry(Asset::Stable).or_insert(0);
        *pool -= out;
        self.credit(Asset::Stable, out)?;

        debug!(basket_in, out, "basket redeemed");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;

    const BASKET_UNIT: u128 = 1_000_000_000_000_000_000;

    #[test]
    fn test_default_basket_price() {
        let host = SimulatedHost::new(&SimulationConfig::default()).unwrap();
        let price = host.basket_price(false).unwrap();
        // $100 per token, give or take the ETH pool rounding
        assert!(price.abs_diff(100 * PRICE_PRECISION) <= 1);
        assert_eq!(host.basket_price(true).unwrap(), price);
    }

    #[test]
    fn test_spread_separates_min_and_max() {
        let mut host = SimulatedHost::new(&SimulationConfig::default()).unwrap();
        host.state_mut().basket.price_spread_bps = 100;
        assert!(host.basket_price(true).unwrap() > host.basket_price(false).unwrap());
        assert_eq!(
            host.asset_price(Asset::Stable, true).unwrap(),
            host.asset_price(Asset::Stable, false).unwrap()
        );
    }

    #[test]
    fn test_mint_and_redeem() {
        let mut host = SimulatedHost::new(&SimulationConfig::default()).unwrap();
        host.state_mut().basket.mint_fee_bps = 0;
        host.state_mut().basket.redeem_fee_bps = 0;
        host.state_mut().balances.insert(Asset::Stable, 1_000 * 1_000_000);
        let basket_before = host.balance(Asset::Basket);

        let minted = host.mint(1_000 * 1_000_000, 0).unwrap();
        // ~10 basket tokens at $100
        assert!(minted.abs_diff(10 * BASKET_UNIT) < BASKET_UNIT / 1_000_000);
        assert_eq!(host.balance(Asset::Basket), basket_before + minted);

        assert!(matches!(
            host.redeem(minted, 1_001 * 1_000_000),
            Err(HedgeError::SlippageExceeded { .. })
        ));
        let received = host.redeem(minted, 999 * 1_000_000).unwrap();
        assert!(received <= 1_000 * 1_000_000);
        assert_eq!(host.balance(Asset::Basket), basket_before);
    }
}
