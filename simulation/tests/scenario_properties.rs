//! # Scenario Property Tests
//!
//! Random price shocks followed by a rebalance always land back on target,
//! and a long random walk keeps the vault solvent.

use hedge_core::engine::RebalanceEngine;
use hedge_core::interfaces::{LendingMarket, PriceOracle};
use hedge_core::math::{mul_div, Rounding};
use hedge_core::*;
use hedge_simulation::{PriceWalk, ScenarioRunner, SimulatedHost, SimulationConfig, StepOutcome};
use proptest::prelude::*;

fn keeper() -> KeeperId {
    KeeperId::new("keeper")
}

fn shock(host: &mut SimulatedHost, asset: Asset, bps: i64) {
    let price = host.price(asset).unwrap();
    let factor = (10_000 + bps) as u128;
    host.set_price(asset, mul_div(price, factor, 10_000, Rounding::Down).unwrap())
        .unwrap();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_rebalance_is_idempotent_after_shocks(
        btc_shock in -1_500i64..=1_500,
        eth_shock in -1_500i64..=1_500,
    ) {
        let mut host = SimulatedHost::new(&SimulationConfig::default()).unwrap();
        let mut engine = RebalanceEngine::new(EngineConfig::new(keeper())).unwrap();
        engine.rebalance(&mut host, &keeper()).unwrap();

        shock(&mut host, Asset::Btc, btc_shock);
        shock(&mut host, Asset::Eth, eth_shock);
        // Whether or not a trigger fires, a failed or skipped call changes nothing
        let _ = engine.rebalance(&mut host, &keeper());

        let hf = host.account_data().unwrap().health_factor_bps;
        prop_assert!(hf > 10_000);

        let before = host.state().clone();
        let second = engine.rebalance(&mut host, &keeper());
        prop_assert_eq!(
            second,
            Err(HedgeError::InvalidRebalanceState("no rebalance trigger fired"))
        );
        prop_assert_eq!(host.state(), &before);
    }
}

#[test]
fn test_random_walk_keeps_vault_solvent() {
    let mut runner = ScenarioRunner::new(
        &SimulationConfig::default(),
        EngineConfig::new(keeper()),
        PriceWalk::new(42, 150),
        60 * 60,
    )
    .unwrap();

    let mut rebalances = 0;
    for _ in 0..72 {
        if let StepOutcome::Rebalanced(report) = runner.step().unwrap() {
            rebalances += 1;
            assert!(!report.hedge.partial);
            let hf = runner.host.account_data().unwrap().health_factor_bps;
            assert!(hf > 10_000);
        }
        assert_eq!(runner.host.open_checkpoints(), 0);
        assert!(runner.engine.phase().is_idle());
    }

    let report = runner.report().unwrap();
    assert_eq!(report.steps, 72);
    assert_eq!(report.rebalances, rebalances);
    assert_eq!(report.rebalances + report.idle + report.deferred, 72);
    // The first step always hedges, and 72 hours cover several rebalance windows
    assert!(report.rebalances >= 3);
    assert!(report.final_btc_borrow > 0);
    assert!(report.final_health_factor_bps > 10_000);
}
