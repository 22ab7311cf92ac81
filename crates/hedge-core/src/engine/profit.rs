//! ProfitReconcile: settle accumulated funding profit or loss against the basket.
//!
//! The liability is the stablecoin value of the borrows; the asset is the
//! vault-owned collateral backing the hedge. Stablecoin redeemed from
//! unhedged basket tokens is principal and never counts as profit. A loss is covered by redeeming basket tokens, a
//! profit is shared with the counterparty tranche and the vault's part is
//! minted into basket tokens.

use tracing::{debug, info};

use super::flash_loan::FlowPhase;
use super::RebalanceEngine;
use crate::errors::{HedgeError, HedgeResult};
use crate::fee_split::FeeSplitCurve;
use crate::interfaces::Host;
use crate::math::{apply_bps_discount, safe_add_u128, Rounding};
use crate::oracle::PriceSheet;
use crate::types::{Asset, KeeperId};

/// What profit reconciliation did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProfitOutcome {
    /// Liability and asset within dust of each other
    #[default]
    Balanced,
    Loss {
        shortfall: u128,
        basket_redeemed: u128,
        stable_supplied: u128,
    },
    Profit {
        surplus: u128,
        counterparty_share: u128,
        basket_minted: u128,
    },
}

impl RebalanceEngine {
    /// Reconcile `borrow_value` against the hedge collateral as one atomic flow
    pub fn rebalance_profit<H: Host>(
        &mut self,
        host: &mut H,
        caller: &KeeperId,
        borrow_value: u128,
    ) -> HedgeResult<ProfitOutcome> {
        self.authorize(caller)?;
        self.atomically(host, FlowPhase::ProfitReconcile, |engine, host| {
            engine.reconcile_profit(host, borrow_value)
        })
    }

    pub(crate) fn reconcile_profit<H: Host>(
        &mut self,
        host: &mut H,
        borrow_value: u128,
    ) -> HedgeResult<ProfitOutcome> {
        let hedge_collateral = self.get_hedge_collateral(&*host)?;
        let dust = self.config.thresholds.dust_threshold;

        if borrow_value > safe_add_u128(hedge_collateral, dust)? {
            self.cover_loss(host, borrow_value - hedge_collateral)
        } else if hedge_collateral > safe_add_u128(borrow_value, dust)? {
            self.distribute_profit(host, hedge_collateral - borrow_value)
        } else {
            debug!(borrow_value, hedge_collateral, "no profit to reconcile");
            Ok(ProfitOutcome::Balanced)
        }
    }

    fn cover_loss<H: Host>(&self, host: &mut H, shortfall: u128) -> HedgeResult<ProfitOutcome> {
        let prices = PriceSheet::read(&*host, self.config.decimals, true)?;
        let needed = prices.from_stable(Asset::Basket, shortfall, Rounding::Up)?;
        let basket_in = needed.min(host.balance_of(Asset::Basket)?);
        if basket_in == 0 {
            return Err(HedgeError::InsufficientBalance {
                asset: Asset::Basket,
                required: needed,
                available: 0,
            });
        }

        let expected = prices.to_stable(Asset::Basket, basket_in, Rounding::Down)?;
        let min_out = apply_bps_discount(
            expected,
            self.config.thresholds.basket_slippage_bps,
            Rounding::Up,
        )?;
        let received = host.redeem(basket_in, min_out)?;
        if received < min_out {
            return Err(HedgeError::slippage(min_out, received));
        }
        host.supply(Asset::Stable, received)?;

        info!(shortfall, basket_in, received, "funding loss covered from basket");
        Ok(ProfitOutcome::Loss {
            shortfall,
            basket_redeemed: basket_in,
            stable_supplied: received,
        })
    }

    fn distribute_profit<H: Host>(&self, host: &mut H, surplus: u128) -> HedgeResult<ProfitOutcome> {
        host.withdraw(Asset::Stable, surplus)?;

        let rate = self
            .config
            .fee_split
            .fee_split_rate(host.tranche_liquidity()?)?;
        let (counterparty_share, vault_share) = FeeSplitCurve::split(surplus, rate)?;
        if counterparty_share > 0 {
            host.pay_tranche_yield(counterparty_share)?;
        }

        let mut basket_minted = 0;
        if vault_share > 0 {
            let prices = PriceSheet::read(&*host, self.config.decimals, false)?;
            let expected = prices.from_stable(Asset::Basket, vault_share, Rounding::Down)?;
            let min_out = apply_bps_discount(
                expected,
                self.config.thresholds.basket_slippage_bps,
                Rounding::Up,
            )?;
            basket_minted = host.mint(vault_share, min_out)?;
            if basket_minted < min_out {
                return Err(HedgeError::slippage(min_out, basket_minted));
            }
        }

        info!(surplus, counterparty_share, basket_minted, "funding profit distributed");
        Ok(ProfitOutcome::Profit {
            surplus,
            counterparty_share,
            basket_minted,
        })
    }
}
