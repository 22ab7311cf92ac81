//! BorrowAdjust: move each leg's borrow toward its target under one flash loan.

use tracing::{debug, info};

use super::flash_loan::{FlashLoanPlan, FlowPhase, LegAction, LegExecution};
use super::RebalanceEngine;
use crate::constants::SWAP_DEADLINE_SECS;
use crate::errors::{HedgeError, HedgeResult};
use crate::interfaces::{ExactInputParams, ExactOutputParams, FlashLoanReceipt, Host};
use crate::math::{safe_add_u128, safe_sub_u128, signed_delta, Rounding};
use crate::oracle::PriceSheet;
use crate::types::{Asset, BorrowPosition, KeeperId, Leg};

/// Outcome of a borrow adjustment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BorrowAdjustment {
    pub executed: Vec<LegExecution>,
    /// Legs whose change was at or below the dust threshold
    pub skipped: Vec<Leg>,
}

impl RebalanceEngine {
    /// Adjust borrows from `current` toward `target` as one atomic flow
    pub fn rebalance_borrow<H: Host>(
        &mut self,
        host: &mut H,
        caller: &KeeperId,
        target: BorrowPosition,
        current: BorrowPosition,
    ) -> HedgeResult<BorrowAdjustment> {
        self.authorize(caller)?;
        self.atomically(host, FlowPhase::BorrowAdjust, |engine, host| {
            engine.adjust_borrows(host, target, current)
        })
    }

    pub(crate) fn adjust_borrows<H: Host>(
        &mut self,
        host: &mut H,
        target: BorrowPosition,
        current: BorrowPosition,
    ) -> HedgeResult<BorrowAdjustment> {
        self.phase = FlowPhase::BorrowAdjust;
        let prices = PriceSheet::read(&*host, self.config.decimals, false)?;
        let dust = self.config.thresholds.dust_threshold;

        let mut plan = FlashLoanPlan::default();
        let mut skipped = Vec::new();
        for leg in Leg::ALL {
            let delta = signed_delta(target.get(leg), current.get(leg))?;
            if delta == 0 {
                continue;
            }
            let notional = prices.to_stable(leg.asset(), delta.unsigned_abs(), Rounding::Down)?;
            if notional <= dust {
                debug!(%leg, delta, notional, "leg change below dust, skipped");
                skipped.push(leg);
                continue;
            }
            plan.actions.push(LegAction { leg, delta });
        }

        if plan.is_empty() {
            return Ok(BorrowAdjustment {
                executed: Vec::new(),
                skipped,
            });
        }

        let receipt = host.flash_loan(&plan.loans())?;
        self.phase = FlowPhase::AwaitingCallback { plan };
        let executed = self.on_flash_loan(host, &receipt)?;
        host.settle(&receipt)?;
        self.phase = FlowPhase::BorrowAdjust;

        info!(legs = executed.len(), "borrows adjusted");
        Ok(BorrowAdjustment { executed, skipped })
    }

    /// Execute the parked flash-loan plan. Only valid while a flash loan
    /// drawn by this engine is awaiting its callback.
    pub fn on_flash_loan<H: Host>(
        &mut self,
        host: &mut H,
        receipt: &FlashLoanReceipt,
    ) -> HedgeResult<Vec<LegExecution>> {
        let plan = match std::mem::replace(&mut self.phase, FlowPhase::BorrowAdjust) {
            FlowPhase::AwaitingCallback { plan } => plan,
            other => {
                self.phase = other;
                return Err(HedgeError::InvalidRebalanceState("no flash loan awaiting callback"));
            }
        };
        if receipt.loans != plan.loans() || receipt.fees.len() != receipt.loans.len() {
            return Err(HedgeError::InvalidRebalanceState("flash loan does not match plan"));
        }

        let prices = PriceSheet::read(&*host, self.config.decimals, false)?;
        let deadline = host.now().saturating_add(SWAP_DEADLINE_SECS);

        plan.actions
            .iter()
            .map(|action| {
                let fee = receipt.fee_for(action.leg.asset());
                if action.delta > 0 {
                    self.increase_leg(host, &prices, action, fee, deadline)
                } else {
                    self.decrease_leg(host, &prices, action, fee, deadline)
                }
            })
            .collect()
    }

    /// Sell the flash-borrowed tokens net of the fee, post the proceeds as
    /// collateral, then borrow the full amount to cover the loan
    fn increase_leg<H: Host>(
        &self,
        host: &mut H,
        prices: &PriceSheet,
        action: &LegAction,
        fee: u128,
        deadline: i64,
    ) -> HedgeResult<LegExecution> {
        let leg = action.leg;
        let amount = action.delta.unsigned_abs();
        let sell = safe_sub_u128(amount, fee)?;

        let quote = self.quoter().bounded_exact_input(&*host, prices, leg, sell)?;
        let received = host.exact_input(&ExactInputParams {
            path: quote.path,
            amount_in: sell,
            amount_out_minimum: quote.bound,
            deadline,
        })?;
        if received < quote.bound {
            return Err(HedgeError::slippage(quote.bound, received));
        }

        host.supply(Asset::Stable, received)?;
        host.borrow(leg.asset(), amount)?;

        debug!(%leg, sold = sell, received, "leg borrow increased");
        Ok(LegExecution {
            leg,
            delta: action.delta,
            tokens_swapped: sell,
            stable_amount: received,
            flash_loan_fee: fee,
        })
    }

    /// Repay debt with the flash-borrowed tokens, then buy back principal
    /// plus fee with stablecoin withdrawn from vault-owned collateral
    fn decrease_leg<H: Host>(
        &self,
        host: &mut H,
        prices: &PriceSheet,
        action: &LegAction,
        fee: u128,
        deadline: i64,
    ) -> HedgeResult<LegExecution> {
        let leg = action.leg;
        let amount = action.delta.unsigned_abs();
        host.repay(leg.asset(), amount)?;

        let buy = safe_add_u128(amount, fee)?;
        let quote = self.quoter().bounded_exact_output(&*host, prices, leg, buy)?;

        let available = self.get_collateral_position(&*host)?.vault_owned();
        if available < quote.amount_in {
            return Err(HedgeError::InsufficientCollateral {
                required: quote.amount_in,
                available,
            });
        }
        host.withdraw(Asset::Stable, quote.amount_in)?;

        let paid = host.exact_output(&ExactOutputParams {
            path: quote.path,
            amount_out: buy,
            amount_in_maximum: quote.amount_in,
            deadline,
        })?;
        if paid > quote.amount_in {
            return Err(HedgeError::slippage(quote.amount_in, paid));
        }

        let leftover = quote.amount_in - paid;
        if leftover > 0 {
            host.supply(Asset::Stable, leftover)?;
        }

        debug!(%leg, bought = buy, paid, "leg borrow decreased");
        Ok(LegExecution {
            leg,
            delta: action.delta,
            tokens_swapped: buy,
            stable_amount: paid,
            flash_loan_fee: fee,
        })
    }
}
