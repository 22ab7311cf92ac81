//! In-memory host bundling every collaborator the engine drives.

use hedge_core::interfaces::{BasketVault, Checkpoint, CheckpointId, Clock, PriceOracle, VaultLedger};
use hedge_core::math::{mul_div, safe_add_u128, Rounding};
use hedge_core::{Asset, HedgeError, HedgeResult, TokenDecimals, BPS_DENOMINATOR};
use std::collections::BTreeMap;
use tracing::debug;

use crate::amm::Pool;
use crate::basket::BasketState;
use crate::config::SimulationConfig;
use crate::flash::FlashState;
use crate::lending::LendingState;
use crate::tranche::TrancheState;
use crate::SimulationResult;

const SECONDS_PER_YEAR: u128 = 365 * 24 * 60 * 60;

/// Everything the host holds. Cloned wholesale for checkpoints, so two
/// states compare equal exactly when nothing observable changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimState {
    pub now: i64,
    pub decimals: TokenDecimals,
    /// Oracle prices, USD per whole token at `PRICE_PRECISION`
    pub prices: BTreeMap<Asset, u128>,
    /// Token balances held by the vault
    pub balances: BTreeMap<Asset, u128>,
    pub pools: Vec<Pool>,
    pub lending: LendingState,
    pub basket: BasketState,
    pub tranche: TrancheState,
    pub flash: FlashState,
    /// Extra loss applied to every executed swap on top of pool pricing
    pub execution_haircut_bps: u32,
}

/// Simulated host with nested checkpoints
#[derive(Debug, Clone)]
pub struct SimulatedHost {
    state: SimState,
    checkpoints: Vec<SimState>,
}

impl SimulatedHost {
    pub fn new(config: &SimulationConfig) -> SimulationResult<Self> {
        Ok(Self::from_state(config.build_state()?))
    }

    pub fn from_state(state: SimState) -> Self {
        Self {
            state,
            checkpoints: Vec::new(),
        }
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SimState {
        &mut self.state
    }

    /// Number of checkpoints neither committed nor reverted
    pub fn open_checkpoints(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn balance(&self, asset: Asset) -> u128 {
        self.state.balances.get(&asset).copied().unwrap_or(0)
    }

    pub(crate) fn credit(&mut self, asset: Asset, amount: u128) -> HedgeResult<()> {
        let balance = self.state.balances.entry(asset).or_insert(0);
        *balance = safe_add_u128(*balance, amount)?;
        Ok(())
    }

    pub(crate) fn debit(&mut self, asset: Asset, amount: u128) -> HedgeResult<()> {
        let available = self.balance(asset);
        if available < amount {
            return Err(HedgeError::InsufficientBalance {
                asset,
                required: amount,
                available,
            });
        }
        self.state.balances.insert(asset, available - amount);
        Ok(())
    }

    /// Run `op`, restoring the prior state if it fails
    pub(crate) fn all_or_nothing<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> HedgeResult<T>,
    ) -> HedgeResult<T> {
        let before = self.state.clone();
        let result = op(self);
        if result.is_err() {
            self.state = before;
        }
        result
    }

    pub(crate) fn check_deadline(&self, deadline: i64) -> HedgeResult<()> {
        if self.state.now > deadline {
            return Err(HedgeError::DeadlineExpired);
        }
        Ok(())
    }

    pub fn set_execution_haircut_bps(&mut self, bps: u32) {
        self.state.execution_haircut_bps = bps;
    }

    /// Move the clock forward and accrue borrow interest
    pub fn advance_time(&mut self, secs: i64) -> HedgeResult<()> {
        if secs <= 0 {
            return Ok(());
        }
        self.state.now = self.state.now.saturating_add(secs);

        let rate = self.state.lending.borrow_rate_bps as u128;
        let elapsed = secs as u128;
        for debt in self.state.lending.debts.values_mut() {
            let yearly = mul_div(*debt, rate, BPS_DENOMINATOR, Rounding::Up)?;
            let interest = mul_div(yearly, elapsed, SECONDS_PER_YEAR, Rounding::Up)?;
            *debt = safe_add_u128(*debt, interest)?;
        }
        Ok(())
    }

    /// Set an oracle price and let arbitrage pull the pools to it
    pub fn set_price(&mut self, asset: Asset, price: u128) -> HedgeResult<()> {
        if price == 0 {
            return Err(HedgeError::InvalidParameter("price must be positive"));
        }
        self.state.prices.insert(asset, price);
        self.realign_pools()?;
        debug!(?asset, price, "oracle price set");
        Ok(())
    }

    /// Reset every pool to equal USD value on both sides at oracle prices,
    /// keeping its average depth
    pub fn realign_pools(&mut self) -> HedgeResult<()> {
        let decimals = self.state.decimals;
        let prices = self.state.prices.clone();
        let price = |asset: Asset| -> HedgeResult<u128> {
            prices
                .get(&asset)
                .copied()
                .ok_or(HedgeError::QuoteUnavailable("asset has no oracle price"))
        };

        for pool in self.state.pools.iter_mut() {
            let (price_a, price_b) = (price(pool.token_a)?, price(pool.token_b)?);
            let (unit_a, unit_b) = (decimals.unit(pool.token_a)?, decimals.unit(pool.token_b)?);
            let value_a = mul_div(pool.reserve_a, price_a, unit_a, Rounding::Down)?;
            let value_b = mul_div(pool.reserve_b, price_b, unit_b, Rounding::Down)?;
            let depth = safe_add_u128(value_a, value_b)? / 2;
            pool.reserve_a = mul_div(depth, unit_a, price_a, Rounding::Down)?;
            pool.reserve_b = mul_div(depth, unit_b, price_b, Rounding::Down)?;
        }
        Ok(())
    }
}

impl PriceOracle for SimulatedHost {
    fn price(&self, asset: Asset) -> HedgeResult<u128> {
        match asset {
            Asset::Basket => self.basket_price(false),
            _ => self
                .state
                .prices
                .get(&asset)
                .copied()
                .ok_or(HedgeError::QuoteUnavailable("asset has no oracle price")),
        }
    }
}

impl VaultLedger for SimulatedHost {
    fn balance_of(&self, asset: Asset) -> HedgeResult<u128> {
        Ok(self.balance(asset))
    }
}

impl Clock for SimulatedHost {
    fn now(&self) -> i64 {
        self.state.now
    }
}

impl Checkpoint for SimulatedHost {
    fn checkpoint(&mut self) -> CheckpointId {
        self.checkpoints.push(self.state.clone());
        CheckpointId(self.checkpoints.len() - 1)
    }

    fn commit(&mut self, id: CheckpointId) {
        self.checkpoints.truncate(id.0);
    }

    fn revert(&mut self, id: CheckpointId) {
        if let Some(saved) = self.checkpoints.get(id.0).cloned() {
            self.state = saved;
        }
        self.checkpoints.truncate(id.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_checkpoints() {
        let mut host = SimulatedHost::new(&SimulationConfig::default()).unwrap();
        let original = host.state().clone();

        let outer = host.checkpoint();
        host.credit(Asset::Stable, 5).unwrap();
        let inner = host.checkpoint();
        host.credit(Asset::Stable, 7).unwrap();

        host.revert(inner);
        let before = original.balances.get(&Asset::Stable).copied().unwrap_or(0);
        assert_eq!(host.balance(Asset::Stable), before + 5);
        host.revert(outer);
        assert_eq!(host.state(), &original);
        assert_eq!(host.open_checkpoints(), 0);

        let id = host.checkpoint();
        host.credit(Asset::Eth, 1).unwrap();
        host.commit(id);
        assert_eq!(host.open_checkpoints(), 0);
        assert_ne!(host.state(), &original);
    }

    #[test]
    fn test_interest_accrual() {
        let mut host = SimulatedHost::new(&SimulationConfig::default()).unwrap();
        host.state_mut().lending.borrow_rate_bps = 1_000;
        host.state_mut().lending.debts.insert(Asset::Eth, 10u128.pow(18));

        host.advance_time(SECONDS_PER_YEAR as i64).unwrap();
        assert_eq!(host.state().lending.debts[&Asset::Eth], 11 * 10u128.pow(17));
    }

    #[test]
    fn test_debit_checks_balance() {
        let mut host = SimulatedHost::new(&SimulationConfig::default()).unwrap();
        let held = host.balance(Asset::Btc);
        assert!(matches!(
            host.debit(Asset::Btc, held + 1),
            Err(HedgeError::InsufficientBalance { asset: Asset::Btc, .. })
        ));
    }
}
