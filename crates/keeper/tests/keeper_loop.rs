//! Keeper loop over a simulated day

use std::time::Duration;

use hedge_keeper::{Keeper, KeeperConfig, TickOutcome};
use tokio_test::assert_ok;

#[tokio::test]
async fn test_keeper_runs_through_a_day() {
    let config = KeeperConfig {
        price_volatility_bps: 100,
        ..KeeperConfig::default()
    };
    let mut keeper = Keeper::new(config, false).unwrap();
    let mut interval = tokio::time::interval(Duration::from_millis(1));

    for _ in 0..24 {
        interval.tick().await;
        if let TickOutcome::Rebalanced(report) = assert_ok!(keeper.tick()) {
            assert!(!report.hedge.partial);
        }
        assert!(keeper.engine().phase().is_idle());
    }

    let stats = keeper.stats();
    assert_eq!(stats.ticks, 24);
    assert_eq!(stats.rebalances + stats.idle + stats.deferred, 24);
    // The first tick hedges and the twelve-hour window opens again at tick 13
    assert!(stats.rebalances >= 2);

    let health = assert_ok!(keeper.health_check());
    assert!(health.health_factor_bps.is_some());
}

#[tokio::test]
async fn test_dry_run_keeps_the_vault_unhedged() {
    let mut keeper = Keeper::new(KeeperConfig::default(), true).unwrap();
    for _ in 0..5 {
        assert_ok!(keeper.tick());
    }
    assert!(keeper.stats().rebalances >= 1);
    assert_eq!(keeper.engine().get_current_borrows(keeper.host()).unwrap().btc, 0);
}
