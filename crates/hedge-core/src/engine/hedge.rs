//! HedgeAdjust: size the counterparty draw for the optimal borrows, then
//! move the borrows there.

use tracing::{debug, info, warn};

use super::borrow::BorrowAdjustment;
use super::flash_loan::FlowPhase;
use super::RebalanceEngine;
use crate::errors::{HedgeError, HedgeResult};
use crate::interfaces::Host;
use crate::math::{apply_bps_discount, safe_add_u128, safe_sub_u128, Rounding};
use crate::oracle::{BasketSnapshot, PriceSheet};
use crate::solver;
use crate::types::{Asset, BorrowPosition, KeeperId};

/// Outcome of a hedge adjustment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HedgeOutcome {
    /// Borrows the adjustment aimed for, after any capping
    pub targets: BorrowPosition,
    /// Counterparty draw before and after
    pub draw_before: u128,
    pub draw_after: u128,
    /// Counterparty capacity limited the hedge
    pub partial: bool,
    /// Basket tokens redeemed into collateral because they could not be hedged
    pub basket_redeemed: u128,
    /// Basket tokens minted back from earlier unhedged collateral
    pub basket_restored: u128,
    pub borrows: BorrowAdjustment,
}

impl RebalanceEngine {
    /// Re-hedge the vault's basket holdings as one atomic flow
    pub fn rebalance_hedge<H: Host>(
        &mut self,
        host: &mut H,
        caller: &KeeperId,
        current: BorrowPosition,
    ) -> HedgeResult<HedgeOutcome> {
        self.authorize(caller)?;
        self.atomically(host, FlowPhase::HedgeAdjust, |engine, host| {
            engine.adjust_hedge(host, current)
        })
    }

    pub(crate) fn adjust_hedge<H: Host>(
        &mut self,
        host: &mut H,
        current: BorrowPosition,
    ) -> HedgeResult<HedgeOutcome> {
        let thresholds = self.config.thresholds.clone();
        let decimals = self.config.decimals;

        let basket_restored = self.restore_unhedged(host)?;
        let value = host.balance_of(Asset::Basket)?;
        let basket = BasketSnapshot::read(&*host, decimals, false)?;
        let prices = PriceSheet::read(&*host, decimals, false)?;
        let targets = solver::optimal_borrows(value, &basket, &prices)?;

        let lt_bps = host.reserve_data(Asset::Stable)?.liquidation_threshold_bps;
        let borrow_value = solver::borrow_value(&targets, &prices, Rounding::Up)?;
        let target_draw =
            solver::required_draw(borrow_value, thresholds.target_health_factor_bps, lt_bps)?;
        let current_draw = host.tranche_borrowed()?;

        let mut outcome = HedgeOutcome {
            targets,
            draw_before: current_draw,
            draw_after: current_draw,
            basket_restored,
            ..HedgeOutcome::default()
        };

        if target_draw > current_draw {
            let requested = target_draw - current_draw;
            let available = host.tranche_available()?;
            let ceiling = safe_add_u128(current_draw, available)?;
            let capped = solver::cap_borrows(targets, value, target_draw, ceiling)?;

            if capped.is_capped {
                if !thresholds.allow_partial_hedge {
                    return Err(HedgeError::BorrowCapBreached {
                        requested,
                        available,
                    });
                }
                warn!(requested, available, "counterparty capacity short, hedging partially");
            }

            let draw = safe_sub_u128(capped.target_draw, current_draw)?;
            if draw > 0 {
                host.draw_from_tranche(draw)?;
                host.supply(Asset::Stable, draw)?;
            }

            if capped.unhedged_basket > thresholds.basket_dust_threshold {
                outcome.basket_redeemed =
                    self.redeem_unhedged(host, &prices, capped.unhedged_basket)?;
            }

            outcome.targets = capped.borrows;
            outcome.draw_after = capped.target_draw;
            outcome.partial = capped.is_capped;
            outcome.borrows = self.adjust_borrows(host, capped.borrows, current)?;
        } else if target_draw < current_draw {
            outcome.borrows = self.adjust_borrows(host, targets, current)?;

            let excess = current_draw - target_draw;
            host.withdraw(Asset::Stable, excess)?;
            host.repay_tranche(excess)?;
            outcome.draw_after = target_draw;
        } else {
            outcome.borrows = self.adjust_borrows(host, targets, current)?;
        }

        self.phase = FlowPhase::HedgeAdjust;
        info!(
            btc = outcome.targets.btc,
            eth = outcome.targets.eth,
            draw_before = outcome.draw_before,
            draw_after = outcome.draw_after,
            partial = outcome.partial,
            "hedge adjusted"
        );
        Ok(outcome)
    }

    /// Convert basket tokens that cannot be hedged into stablecoin collateral
    fn redeem_unhedged<H: Host>(
        &mut self,
        host: &mut H,
        prices: &PriceSheet,
        unhedged: u128,
    ) -> HedgeResult<u128> {
        let amount = unhedged.min(host.balance_of(Asset::Basket)?);
        if amount == 0 {
            return Ok(0);
        }
        let prices = prices.with_basket_pricing(true);
        let expected = prices.to_stable(Asset::Basket, amount, Rounding::Down)?;
        let min_out = apply_bps_discount(
            expected,
            self.config.thresholds.basket_slippage_bps,
            Rounding::Up,
        )?;

        let received = host.redeem(amount, min_out)?;
        if received < min_out {
            return Err(HedgeError::slippage(min_out, received));
        }
        host.supply(Asset::Stable, received)?;
        self.state.unhedged_collateral = safe_add_u128(self.state.unhedged_collateral, received)?;

        info!(basket = amount, received, "unhedged basket moved to collateral");
        Ok(amount)
    }

    /// Mint basket tokens back from unhedged collateral once the tranche can
    /// fund the hedge of the whole position. Returns the basket minted.
    fn restore_unhedged<H: Host>(&mut self, host: &mut H) -> HedgeResult<u128> {
        let parked = self.state.unhedged_collateral;
        if parked == 0 {
            return Ok(0);
        }
        let decimals = self.config.decimals;
        let basket = BasketSnapshot::read(&*host, decimals, false)?;
        let prices = PriceSheet::read(&*host, decimals, false)?;

        let full_value = safe_add_u128(
            host.balance_of(Asset::Basket)?,
            prices.from_stable(Asset::Basket, parked, Rounding::Down)?,
        )?;
        let targets = solver::optimal_borrows(full_value, &basket, &prices)?;
        let borrow_value = solver::borrow_value(&targets, &prices, Rounding::Up)?;
        let lt_bps = host.reserve_data(Asset::Stable)?.liquidation_threshold_bps;
        let required = solver::required_draw(
            borrow_value,
            self.config.thresholds.target_health_factor_bps,
            lt_bps,
        )?;
        let ceiling = safe_add_u128(host.tranche_borrowed()?, host.tranche_available()?)?;
        if required > ceiling {
            debug!(required, ceiling, "counterparty capacity still short of a full hedge");
            return Ok(0);
        }

        // Funding losses may already have eaten into the parked amount
        let amount = parked.min(self.get_collateral_position(&*host)?.vault_owned());
        self.state.unhedged_collateral = 0;
        if amount == 0 {
            return Ok(0);
        }
        host.withdraw(Asset::Stable, amount)?;

        let expected = prices.from_stable(Asset::Basket, amount, Rounding::Down)?;
        let min_out = apply_bps_discount(
            expected,
            self.config.thresholds.basket_slippage_bps,
            Rounding::Up,
        )?;
        let minted = host.mint(amount, min_out)?;
        if minted < min_out {
            return Err(HedgeError::slippage(min_out, minted));
        }

        info!(stable = amount, minted, "unhedged collateral returned to the basket");
        Ok(minted)
    }
}
