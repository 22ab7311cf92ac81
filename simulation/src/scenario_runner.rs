//! Drives an engine against a simulated host through a random price walk.

use hedge_core::interfaces::{CounterpartyTranche, LendingMarket, PriceOracle};
use hedge_core::math::{mul_div, Rounding};
use hedge_core::{
    Asset, BorrowPosition, EngineConfig, HedgeError, HedgeResult, KeeperId, RebalanceEngine,
    BPS_DENOMINATOR,
};
use hedge_core::engine::RebalanceReport;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::SimulationConfig;
use crate::host::SimulatedHost;
use crate::SimulationResult;

/// Seeded random walk of the BTC and ETH oracle prices
#[derive(Debug, Clone)]
pub struct PriceWalk {
    rng: StdRng,
    /// Largest single-step move
    volatility_bps: u32,
}

impl PriceWalk {
    pub fn new(seed: u64, volatility_bps: u32) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            volatility_bps: volatility_bps.min(9_999),
        }
    }

    /// Move both leg prices by an independent uniform shock
    pub fn step(&mut self, host: &mut SimulatedHost) -> HedgeResult<()> {
        for asset in [Asset::Btc, Asset::Eth] {
            let volatility = self.volatility_bps as i64;
            let shock = if volatility == 0 {
                0
            } else {
                self.rng.gen_range(-volatility..=volatility)
            };
            let factor = (BPS_DENOMINATOR as i64 + shock) as u128;
            let price = mul_div(host.price(asset)?, factor, BPS_DENOMINATOR, Rounding::Down)?;
            host.set_price(asset, price.max(1))?;
        }
        Ok(())
    }
}

/// What happened on one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Rebalanced(Box<RebalanceReport>),
    /// No trigger fired
    Idle,
    /// The rebalance failed and was rolled back
    Deferred(HedgeError),
}

/// Summary of a scenario run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    pub steps: u64,
    pub rebalances: u64,
    pub idle: u64,
    pub deferred: u64,
    pub final_btc_borrow: u128,
    pub final_eth_borrow: u128,
    pub final_health_factor_bps: u128,
    pub tranche_borrowed: u128,
    pub tranche_yield: u128,
}

/// Engine, host and keeper identity bundled for stepping through time
pub struct ScenarioRunner {
    pub host: SimulatedHost,
    pub engine: RebalanceEngine,
    keeper: KeeperId,
    walk: PriceWalk,
    step_secs: i64,
    report: ScenarioReport,
}

impl ScenarioRunner {
    pub fn new(
        simulation: &SimulationConfig,
        engine_config: EngineConfig,
        walk: PriceWalk,
        step_secs: i64,
    ) -> SimulationResult<Self> {
        let keeper = engine_config.keeper.clone();
        Ok(Self {
            host: SimulatedHost::new(simulation)?,
            engine: RebalanceEngine::new(engine_config)?,
            keeper,
            walk,
            step_secs,
            report: ScenarioReport::default(),
        })
    }

    /// Advance the clock, move prices, and rebalance if a trigger fired
    pub fn step(&mut self) -> SimulationResult<StepOutcome> {
        self.host.advance_time(self.step_secs)?;
        self.walk.step(&mut self.host)?;
        self.report.steps += 1;

        let outcome = match self.engine.rebalance(&mut self.host, &self.keeper) {
            Ok(report) => {
                self.report.rebalances += 1;
                StepOutcome::Rebalanced(Box::new(report))
            }
            Err(HedgeError::InvalidRebalanceState("no rebalance trigger fired")) => {
                self.report.idle += 1;
                StepOutcome::Idle
            }
            Err(err) => {
                warn!(%err, "rebalance deferred");
                self.report.deferred += 1;
                StepOutcome::Deferred(err)
            }
        };
        debug!(step = self.report.steps, ?outcome, "scenario step");
        Ok(outcome)
    }

    /// Run `steps` steps and summarise
    pub fn run(&mut self, steps: u64) -> SimulationResult<ScenarioReport> {
        for _ in 0..steps {
            self.step()?;
        }
        let report = self.report()?;
        info!(
            steps = report.steps,
            rebalances = report.rebalances,
            deferred = report.deferred,
            "scenario finished"
        );
        Ok(report)
    }

    /// Counters so far plus the current position
    pub fn report(&self) -> SimulationResult<ScenarioReport> {
        let borrows: BorrowPosition = self.engine.get_current_borrows(&self.host)?;
        Ok(ScenarioReport {
            final_btc_borrow: borrows.btc,
            final_eth_borrow: borrows.eth,
            final_health_factor_bps: self.host.account_data()?.health_factor_bps,
            tranche_borrowed: self.host.tranche_borrowed()?,
            tranche_yield: self.host.state().tranche.yield_received,
            ..self.report.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_walk_is_seeded() {
        let config = SimulationConfig::default();
        let mut a = SimulatedHost::new(&config).unwrap();
        let mut b = SimulatedHost::new(&config).unwrap();
        let (mut walk_a, mut walk_b) = (PriceWalk::new(7, 300), PriceWalk::new(7, 300));

        for _ in 0..5 {
            walk_a.step(&mut a).unwrap();
            walk_b.step(&mut b).unwrap();
        }
        assert_eq!(a.state(), b.state());

        let start = 20_000 * 100_000_000u128;
        let moved = a.price(Asset::Btc).unwrap();
        // Five 3% steps at most
        assert!(moved > start * 85 / 100 && moved < start * 116 / 100);
    }

    #[test]
    fn test_flat_walk_keeps_prices() {
        let mut host = SimulatedHost::new(&SimulationConfig::default()).unwrap();
        let mut walk = PriceWalk::new(1, 0);
        walk.step(&mut host).unwrap();
        assert_eq!(host.price(Asset::Eth).unwrap(), 1_500 * 100_000_000);
    }
}
