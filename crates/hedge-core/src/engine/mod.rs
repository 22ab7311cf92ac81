//! # Rebalance Orchestrator
//!
//! State machine driving the three rebalance flows:
//!
//! ```text
//! Idle -> TriggerCheck -> ProfitReconcile -> HedgeAdjust -> BorrowAdjust
//!                                                              |
//!                                                     AwaitingCallback -> Idle
//! ```
//!
//! Every mutating entry point is keeper-only, requires `Idle`, and runs
//! inside a host checkpoint: a flow either commits in full or leaves the
//! host and the engine exactly as it found them.

mod borrow;
mod flash_loan;
mod hedge;
mod profit;
mod triggers;

pub use borrow::BorrowAdjustment;
pub use flash_loan::{FlashLoanPlan, FlowPhase, LegAction, LegExecution};
pub use hedge::HedgeOutcome;
pub use profit::ProfitOutcome;
pub use triggers::TriggerReport;

use tracing::{info, warn};

use crate::errors::{HedgeError, HedgeResult};
use crate::interfaces::{CounterpartyTranche, Host, LendingMarket, SwapRouter};
use crate::math::Rounding;
use crate::oracle::{BasketSnapshot, PriceSheet};
use crate::quoter::Quoter;
use crate::solver::{self, CappedBorrows};
use crate::types::{
    Asset, BorrowPosition, CollateralPosition, EngineConfig, KeeperId, Leg, RebalanceState,
};

/// Result of a full trigger-driven rebalance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebalanceReport {
    pub triggers: TriggerReport,
    pub profit: ProfitOutcome,
    pub hedge: HedgeOutcome,
    /// Borrows once the rebalance committed
    pub borrows: BorrowPosition,
}

/// The hedge rebalancing engine of one vault
#[derive(Debug, Clone)]
pub struct RebalanceEngine {
    config: EngineConfig,
    state: RebalanceState,
    phase: FlowPhase,
}

impl RebalanceEngine {
    /// Create an engine that has never rebalanced
    pub fn new(config: EngineConfig) -> HedgeResult<Self> {
        Self::with_state(config, RebalanceState::default())
    }

    /// Create an engine resuming from a persisted rebalance state
    pub fn with_state(config: EngineConfig, state: RebalanceState) -> HedgeResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state,
            phase: FlowPhase::Idle,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &RebalanceState {
        &self.state
    }

    pub fn phase(&self) -> &FlowPhase {
        &self.phase
    }

    fn quoter(&self) -> Quoter<'_> {
        Quoter::new(&self.config.routes, &self.config.thresholds)
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// Amounts currently owed to the lending market
    pub fn get_current_borrows<H>(&self, host: &H) -> HedgeResult<BorrowPosition>
    where
        H: LendingMarket + ?Sized,
    {
        Ok(BorrowPosition {
            btc: host.debt_of(Asset::Btc)?,
            eth: host.debt_of(Asset::Eth)?,
        })
    }

    /// Supplied collateral split into vault-owned and counterparty-owned
    pub fn get_collateral_position<H>(&self, host: &H) -> HedgeResult<CollateralPosition>
    where
        H: LendingMarket + CounterpartyTranche + ?Sized,
    {
        CollateralPosition::new(host.collateral()?, host.tranche_borrowed()?)
    }

    /// Vault-owned collateral backing the funding hedge, leaving out the
    /// stablecoin parked from unhedged basket tokens
    pub fn get_hedge_collateral<H>(&self, host: &H) -> HedgeResult<u128>
    where
        H: LendingMarket + CounterpartyTranche + ?Sized,
    {
        let vault_owned = self.get_collateral_position(host)?.vault_owned();
        Ok(vault_owned.saturating_sub(self.state.unhedged_collateral))
    }

    /// Borrows offsetting the exposure of `value` basket tokens
    pub fn get_optimal_borrows<H: Host>(
        &self,
        host: &H,
        value: u128,
        use_min_price: bool,
    ) -> HedgeResult<BorrowPosition> {
        let decimals = self.config.decimals;
        let basket = BasketSnapshot::read(host, decimals, use_min_price)?;
        let prices = PriceSheet::read(host, decimals, use_min_price)?;
        solver::optimal_borrows(value, &basket, &prices)
    }

    /// Optimal borrows for the vault's basket holdings, scaled to fit a
    /// counterparty draw of at most `ceiling`
    pub fn get_optimal_capped_borrows<H: Host>(
        &self,
        host: &H,
        ceiling: u128,
        lt_bps: u32,
    ) -> HedgeResult<CappedBorrows> {
        let value = host.balance_of(Asset::Basket)?;
        let targets = self.get_optimal_borrows(host, value, false)?;
        let borrow_value = self.get_borrow_value(host, targets)?;
        let required = solver::required_draw(
            borrow_value,
            self.config.thresholds.target_health_factor_bps,
            lt_bps,
        )?;
        solver::cap_borrows(targets, value, required, ceiling)
    }

    /// Stablecoin value of `borrows` at oracle prices, rounded up
    pub fn get_borrow_value<H: Host>(&self, host: &H, borrows: BorrowPosition) -> HedgeResult<u128> {
        let prices = PriceSheet::read(host, self.config.decimals, false)?;
        solver::borrow_value(&borrows, &prices, Rounding::Up)
    }

    /// Stablecoin counter-amount of a signed leg amount
    pub fn quote<R>(&self, router: &R, leg: Leg, amount: i128) -> HedgeResult<u128>
    where
        R: SwapRouter + ?Sized,
    {
        self.quoter().quote(router, leg, amount)
    }

    /// Conservative dollar loss of swapping both legs
    pub fn quote_slippage_loss<H: Host>(&self, host: &H, btc: i128, eth: i128) -> HedgeResult<u128> {
        let prices = PriceSheet::read(host, self.config.decimals, false)?;
        self.quoter().quote_slippage_loss(host, &prices, btc, eth)
    }

    // ========================================================================
    // Flows
    // ========================================================================

    /// Run every due flow: profit reconciliation on the current borrow
    /// value, then the hedge adjustment. Fails with `InvalidRebalanceState`
    /// when no trigger fired.
    pub fn rebalance<H: Host>(&mut self, host: &mut H, caller: &KeeperId) -> HedgeResult<RebalanceReport> {
        self.authorize(caller)?;
        self.ensure_idle()?;

        self.phase = FlowPhase::TriggerCheck;
        let triggers = self.check_triggers(&*host);
        self.phase = FlowPhase::Idle;
        let triggers = triggers?;

        if !triggers.any() {
            return Err(HedgeError::InvalidRebalanceState("no rebalance trigger fired"));
        }
        info!(?triggers, "rebalance triggered");

        self.atomically(host, FlowPhase::ProfitReconcile, |engine, host| {
            let current = engine.get_current_borrows(&*host)?;
            let borrow_value = engine.get_borrow_value(&*host, current)?;
            let profit = engine.reconcile_profit(host, borrow_value)?;

            engine.phase = FlowPhase::HedgeAdjust;
            let hedge = engine.adjust_hedge(host, current)?;

            let basket = BasketSnapshot::read(&*host, engine.config.decimals, false)?;
            engine.state.last_known_composition = basket.composition()?;
            if !hedge.partial {
                engine.state.last_rebalance_timestamp = host.now();
            }

            let borrows = engine.get_current_borrows(&*host)?;
            info!(
                btc = borrows.btc,
                eth = borrows.eth,
                partial = hedge.partial,
                "rebalance committed"
            );
            Ok(RebalanceReport {
                triggers,
                profit,
                hedge,
                borrows,
            })
        })
    }

    fn authorize(&self, caller: &KeeperId) -> HedgeResult<()> {
        if caller != &self.config.keeper {
            return Err(HedgeError::Unauthorized);
        }
        Ok(())
    }

    fn ensure_idle(&self) -> HedgeResult<()> {
        if !self.phase.is_idle() {
            return Err(HedgeError::InvalidRebalanceState("another flow is in progress"));
        }
        Ok(())
    }

    /// Run `flow` as one atomic unit against the host
    fn atomically<H, T, F>(&mut self, host: &mut H, phase: FlowPhase, flow: F) -> HedgeResult<T>
    where
        H: Host,
        F: FnOnce(&mut Self, &mut H) -> HedgeResult<T>,
    {
        self.ensure_idle()?;
        let saved_state = self.state;
        let checkpoint = host.checkpoint();
        self.phase = phase;

        let result = flow(self, host);
        let failed_phase = std::mem::take(&mut self.phase);

        match result {
            Ok(value) => {
                host.commit(checkpoint);
                Ok(value)
            }
            Err(err) => {
                host.revert(checkpoint);
                self.state = saved_state;
                warn!(phase = ?failed_phase, %err, "rebalance flow reverted");
                Err(err)
            }
        }
    }
}
