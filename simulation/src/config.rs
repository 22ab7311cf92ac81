//! Initial market state of a simulation, in whole tokens and dollars.

use hedge_core::{Asset, TokenDecimals, PRICE_DECIMALS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::amm::Pool;
use crate::basket::BasketState;
use crate::flash::FlashState;
use crate::host::SimState;
use crate::lending::LendingState;
use crate::tranche::TrancheState;
use crate::{SimulationError, SimulationResult};

/// Simulation configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Unix timestamp the clock starts at
    pub start_timestamp: i64,
    pub prices: PriceConfig,
    pub basket: BasketConfig,
    pub amm: AmmConfig,
    pub lending: LendingConfig,
    pub tranche: TrancheConfig,
    pub flash_fee_bps: u32,
    /// Basket tokens the vault starts with
    pub vault_basket: f64,
    /// Extra loss applied to executed swaps
    pub execution_haircut_bps: u32,
}

/// Oracle prices in USD
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PriceConfig {
    pub stable: f64,
    pub btc: f64,
    pub eth: f64,
}

/// Basket index reserves
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BasketConfig {
    pub supply: f64,
    pub stable_pool: f64,
    pub btc_pool: f64,
    pub eth_pool: f64,
    pub price_spread_bps: u32,
    pub mint_fee_bps: u32,
    pub redeem_fee_bps: u32,
}

/// AMM pools: BTC/ETH, ETH/stable and BTC/stable
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AmmConfig {
    /// USD value of each side of every pool
    pub depth_usd: f64,
    /// Fee tier in hundredths of a basis point
    pub fee_tier: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LendingConfig {
    pub liquidation_threshold_bps: u32,
    /// Annual borrow rate
    pub borrow_rate_bps: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TrancheConfig {
    /// Stablecoin the tranche can lend
    pub liquidity: f64,
    /// Most the vault may owe
    pub vault_cap: f64,
    /// Already lent to other vaults
    pub other_borrowed: f64,
    pub max_utilization_bps: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_timestamp: 1_700_000_000,
            prices: PriceConfig::default(),
            basket: BasketConfig::default(),
            amm: AmmConfig::default(),
            lending: LendingConfig::default(),
            tranche: TrancheConfig::default(),
            flash_fee_bps: 0,
            vault_basket: 100.0,
            execution_haircut_bps: 0,
        }
    }
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            stable: 1.0,
            btc: 20_000.0,
            eth: 1_500.0,
        }
    }
}

impl Default for BasketConfig {
    fn default() -> Self {
        // 80/12/8 stable/BTC/ETH at $100 per basket token
        Self {
            supply: 1_000_000.0,
            stable_pool: 80_000_000.0,
            btc_pool: 600.0,
            eth_pool: 5_333.333_333_333_333,
            price_spread_bps: 0,
            mint_fee_bps: 10,
            redeem_fee_bps: 10,
        }
    }
}

impl Default for AmmConfig {
    fn default() -> Self {
        Self {
            depth_usd: 50_000_000.0,
            fee_tier: 500,
        }
    }
}

impl Default for LendingConfig {
    fn default() -> Self {
        Self {
            liquidation_threshold_bps: 8_000,
            borrow_rate_bps: 500,
        }
    }
}

impl Default for TrancheConfig {
    fn default() -> Self {
        Self {
            liquidity: 1_000_000.0,
            vault_cap: 1_000_000.0,
            other_borrowed: 0.0,
            max_utilization_bps: 9_000,
        }
    }
}

/// Convert a whole-token amount to native units
pub fn to_units(amount: f64, decimals: u32) -> SimulationResult<u128> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(SimulationError::InvalidParameter(format!(
            "amount must be a non-negative number, got {}",
            amount
        )));
    }
    Ok((amount * 10f64.powi(decimals as i32)).round() as u128)
}

fn check_bps(name: &str, bps: u32) -> SimulationResult<()> {
    if bps > 10_000 {
        return Err(SimulationError::InvalidParameter(format!(
            "{} must be at most 10000 bps, got {}",
            name, bps
        )));
    }
    Ok(())
}

impl SimulationConfig {
    /// Validate configuration
    pub fn validate(&self) -> SimulationResult<()> {
        for (name, price) in [
            ("stable price", self.prices.stable),
            ("btc price", self.prices.btc),
            ("eth price", self.prices.eth),
        ] {
            if !(price.is_finite() && price > 0.0) {
                return Err(SimulationError::InvalidParameter(format!(
                    "{} must be positive, got {}",
                    name, price
                )));
            }
        }

        if self.amm.depth_usd <= 0.0 {
            return Err(SimulationError::InvalidParameter("amm depth must be positive".to_string()));
        }
        if self.amm.fee_tier as u128 >= crate::amm::FEE_TIER_DENOMINATOR {
            return Err(SimulationError::InvalidParameter(format!(
                "fee tier {} is not below the denominator",
                self.amm.fee_tier
            )));
        }
        if self.lending.liquidation_threshold_bps == 0 {
            return Err(SimulationError::InvalidParameter(
                "liquidation threshold must be positive".to_string(),
            ));
        }

        check_bps("liquidation threshold", self.lending.liquidation_threshold_bps)?;
        check_bps("basket price spread", self.basket.price_spread_bps)?;
        check_bps("mint fee", self.basket.mint_fee_bps)?;
        check_bps("redeem fee", self.basket.redeem_fee_bps)?;
        check_bps("tranche utilization", self.tranche.max_utilization_bps)?;
        check_bps("flash loan fee", self.flash_fee_bps)?;
        check_bps("execution haircut", self.execution_haircut_bps)?;

        if self.tranche.other_borrowed > self.tranche.liquidity {
            return Err(SimulationError::InvalidParameter(
                "tranche cannot have lent more than its liquidity".to_string(),
            ));
        }
        if self.vault_basket > self.basket.supply {
            return Err(SimulationError::InvalidParameter(
                "vault cannot hold more than the basket supply".to_string(),
            ));
        }

        Ok(())
    }

    /// Build the initial host state
    pub fn build_state(&self) -> SimulationResult<SimState> {
        self.validate()?;
        let decimals = TokenDecimals::default();

        let prices: BTreeMap<Asset, u128> = [
            (Asset::Stable, to_units(self.prices.stable, PRICE_DECIMALS)?),
            (Asset::Btc, to_units(self.prices.btc, PRICE_DECIMALS)?),
            (Asset::Eth, to_units(self.prices.eth, PRICE_DECIMALS)?),
        ]
        .into_iter()
        .collect();

        let depth = |asset: Asset, price: f64| to_units(self.amm.depth_usd / price, decimals.of(asset));
        let pools = [
            (Asset::Btc, self.prices.btc, Asset::Eth, self.prices.eth),
            (Asset::Eth, self.prices.eth, Asset::Stable, self.prices.stable),
            (Asset::Btc, self.prices.btc, Asset::Stable, self.prices.stable),
        ]
        .into_iter()
        .map(|(token_a, price_a, token_b, price_b)| {
            Ok(Pool {
                token_a,
                token_b,
                reserve_a: depth(token_a, price_a)?,
                reserve_b: depth(token_b, price_b)?,
                fee_tier: self.amm.fee_tier,
            })
        })
        .collect::<SimulationResult<Vec<_>>>()?;

        let basket_pools: BTreeMap<Asset, u128> = [
            (Asset::Stable, to_units(self.basket.stable_pool, decimals.stable)?),
            (Asset::Btc, to_units(self.basket.btc_pool, decimals.btc)?),
            (Asset::Eth, to_units(self.basket.eth_pool, decimals.eth)?),
        ]
        .into_iter()
        .collect();

        let liquidity = to_units(self.tranche.liquidity, decimals.stable)?;
        let other_borrowed = to_units(self.tranche.other_borrowed, decimals.stable)?;

        let mut balances = BTreeMap::new();
        balances.insert(Asset::Basket, to_units(self.vault_basket, decimals.basket)?);

        Ok(SimState {
            now: self.start_timestamp,
            decimals,
            prices,
            balances,
            pools,
            lending: LendingState {
                collateral: 0,
                debts: BTreeMap::new(),
                liquidation_threshold_bps: self.lending.liquidation_threshold_bps,
                borrow_rate_bps: self.lending.borrow_rate_bps,
            },
            basket: BasketState {
                pools: basket_pools,
                supply: to_units(self.basket.supply, decimals.basket)?,
                price_spread_bps: self.basket.price_spread_bps,
                mint_fee_bps: self.basket.mint_fee_bps,
                redeem_fee_bps: self.basket.redeem_fee_bps,
            },
            tranche: TrancheState {
                idle: liquidity.saturating_sub(other_borrowed),
                lent_to_vault: 0,
                other_borrowed,
                vault_cap: to_units(self.tranche.vault_cap, decimals.stable)?,
                max_utilization_bps: self.tranche.max_utilization_bps,
                yield_received: 0,
            },
            flash: FlashState {
                fee_bps: self.flash_fee_bps,
                ..FlashState::default()
            },
            execution_haircut_bps: self.execution_haircut_bps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let state = SimulationConfig::default().build_state().unwrap();
        assert_eq!(state.prices[&Asset::Btc], 20_000 * 100_000_000);
        assert_eq!(state.balances[&Asset::Basket], 100 * 10u128.pow(18));
        assert_eq!(state.basket.pool(Asset::Btc), 600 * 100_000_000);
        assert_eq!(state.pools.len(), 3);
        // $50M of BTC at $20,000
        assert_eq!(state.pools[0].reserve_a, 2_500 * 100_000_000);
        assert_eq!(state.tranche.idle, 1_000_000 * 1_000_000);
    }

    #[test]
    fn test_validation() {
        let mut config = SimulationConfig::default();
        config.prices.eth = 0.0;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.execution_haircut_bps = 20_000;
        assert!(config.build_state().is_err());

        assert!(to_units(-1.0, 6).is_err());
        assert_eq!(to_units(1.5, 6).unwrap(), 1_500_000);
    }

    #[test]
    fn test_toml_round_trip_with_partial_sections() {
        let config: SimulationConfig = toml::from_str(
            r#"
            vault_basket = 250.0

            [prices]
            btc = 30000.0
            "#,
        )
        .unwrap();
        assert_eq!(config.vault_basket, 250.0);
        assert_eq!(config.prices.btc, 30_000.0);
        assert_eq!(config.prices.eth, 1_500.0);
        assert_eq!(config.lending, LendingConfig::default());
    }
}
