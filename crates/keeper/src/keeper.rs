use std::time::Duration;

use chrono::{DateTime, Utc};
use hedge_core::engine::{RebalanceReport, TriggerReport};
use hedge_core::interfaces::{CounterpartyTranche, LendingMarket};
use hedge_core::{BorrowPosition, HedgeError, KeeperId, RebalanceEngine, HEALTH_FACTOR_NO_DEBT};
use hedge_simulation::{PriceWalk, SimulatedHost};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::KeeperConfig;
use crate::error::KeeperResult;

/// What one keeper tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Rebalanced(Box<RebalanceReport>),
    /// No trigger fired
    Idle,
    /// Dry run: a rebalance would have been attempted
    WouldRebalance(TriggerReport),
    /// The rebalance failed and the engine rolled it back
    Deferred(HedgeError),
}

/// Running counters of the keeper
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeeperStats {
    pub ticks: u64,
    pub rebalances: u64,
    pub idle: u64,
    pub deferred: u64,
    /// Deferrals since the last successful rebalance
    pub consecutive_deferrals: u32,
}

/// Position snapshot reported by health checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub simulated_time: Option<DateTime<Utc>>,
    pub borrows: BorrowSummary,
    /// `None` while the vault has no debt
    pub health_factor_bps: Option<u128>,
    pub tranche_borrowed: u128,
    pub within_band: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BorrowSummary {
    pub btc: u128,
    pub eth: u128,
}

impl From<BorrowPosition> for BorrowSummary {
    fn from(borrows: BorrowPosition) -> Self {
        Self {
            btc: borrows.btc,
            eth: borrows.eth,
        }
    }
}

/// Keeper service driving the rebalance engine of one vault against a
/// simulated market
pub struct Keeper {
    /// Keeper configuration
    config: KeeperConfig,

    /// Simulated collaborators of the vault
    host: SimulatedHost,

    /// Rebalance engine
    engine: RebalanceEngine,

    /// Price path applied each tick
    walk: PriceWalk,

    /// Identity the keeper calls the engine with
    keeper_id: KeeperId,

    stats: KeeperStats,

    /// Dry run mode flag
    dry_run: bool,
}

impl Keeper {
    /// Create a new keeper instance
    pub fn new(config: KeeperConfig, dry_run: bool) -> KeeperResult<Self> {
        config.validate()?;
        let host = SimulatedHost::new(&config.simulation)?;
        let engine = RebalanceEngine::new(config.engine.clone())?;
        let walk = PriceWalk::new(config.seed, config.price_volatility_bps);
        let keeper_id = config.engine.keeper.clone();

        Ok(Self {
            config,
            host,
            engine,
            walk,
            keeper_id,
            stats: KeeperStats::default(),
            dry_run,
        })
    }

    pub fn host(&self) -> &SimulatedHost {
        &self.host
    }

    pub fn engine(&self) -> &RebalanceEngine {
        &self.engine
    }

    pub fn stats(&self) -> &KeeperStats {
        &self.stats
    }

    /// Advance the simulated market by one step, then rebalance if due
    pub fn tick(&mut self) -> KeeperResult<TickOutcome> {
        self.host.advance_time(self.config.simulated_step_secs)?;
        self.walk.step(&mut self.host)?;
        self.stats.ticks += 1;

        let outcome = if self.dry_run {
            self.evaluate_only()
        } else {
            self.rebalance()
        };
        debug!(tick = self.stats.ticks, ?outcome, "keeper tick");
        Ok(outcome)
    }

    fn evaluate_only(&mut self) -> TickOutcome {
        match self.engine.check_triggers(&self.host) {
            Ok(triggers) if triggers.any() => {
                info!(?triggers, "DRY RUN: would rebalance");
                self.stats.rebalances += 1;
                TickOutcome::WouldRebalance(triggers)
            }
            Ok(_) => {
                self.stats.idle += 1;
                TickOutcome::Idle
            }
            Err(err) => self.defer(err),
        }
    }

    fn rebalance(&mut self) -> TickOutcome {
        match self.engine.rebalance(&mut self.host, &self.keeper_id) {
            Ok(report) => {
                info!(
                    btc = report.borrows.btc,
                    eth = report.borrows.eth,
                    partial = report.hedge.partial,
                    profit = ?report.profit,
                    "rebalanced"
                );
                self.stats.rebalances += 1;
                self.stats.consecutive_deferrals = 0;
                TickOutcome::Rebalanced(Box::new(report))
            }
            Err(HedgeError::InvalidRebalanceState("no rebalance trigger fired")) => {
                self.stats.idle += 1;
                TickOutcome::Idle
            }
            Err(err) => self.defer(err),
        }
    }

    fn defer(&mut self, err: HedgeError) -> TickOutcome {
        self.stats.deferred += 1;
        self.stats.consecutive_deferrals += 1;
        let attempts = self.stats.consecutive_deferrals;

        if attempts > self.config.retry.max_retries {
            error!(%err, attempts, "rebalance deferred repeatedly");
        } else {
            warn!(%err, attempts, market_condition = err.is_market_condition(), "rebalance deferred");
        }
        TickOutcome::Deferred(err)
    }

    /// Extra wait before the next tick after deferred rebalances
    pub fn retry_delay(&self) -> Option<Duration> {
        match self.stats.consecutive_deferrals {
            0 => None,
            attempts => Some(Duration::from_millis(
                self.config.retry.delay_for_attempt(attempts - 1),
            )),
        }
    }

    /// Snapshot the vault position
    pub fn health_check(&self) -> KeeperResult<HealthStatus> {
        let account = self.host.account_data()?;
        let health_factor_bps = match account.health_factor_bps {
            HEALTH_FACTOR_NO_DEBT => None,
            hf => Some(hf),
        };
        let thresholds = &self.config.engine.thresholds;
        let within_band = match health_factor_bps {
            Some(hf) => {
                hf.abs_diff(thresholds.target_health_factor_bps as u128)
                    <= thresholds.health_factor_band_bps as u128
            }
            None => true,
        };

        let status = HealthStatus {
            simulated_time: DateTime::from_timestamp(self.host.state().now, 0),
            borrows: self.engine.get_current_borrows(&self.host)?.into(),
            health_factor_bps,
            tranche_borrowed: self.host.tranche_borrowed()?,
            within_band,
        };
        if !status.within_band {
            warn!(hf = ?status.health_factor_bps, "health factor outside target band");
        }
        Ok(status)
    }
}
