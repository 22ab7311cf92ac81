//! Rebalance triggers. Any one of them is sufficient.

use tracing::debug;

use super::RebalanceEngine;
use crate::errors::HedgeResult;
use crate::interfaces::{Clock, Host, LendingMarket};
use crate::math::{relative_deviation_bps, Rounding};
use crate::oracle::{BasketSnapshot, PriceSheet};
use crate::solver;
use crate::types::{Asset, Leg};

/// Which triggers fired
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TriggerReport {
    pub time: bool,
    pub deviation: bool,
    pub health_factor: bool,
}

impl TriggerReport {
    pub fn any(&self) -> bool {
        self.time || self.deviation || self.health_factor
    }
}

impl RebalanceEngine {
    /// Enough time passed since the last full rebalance
    pub fn is_valid_rebalance_time<H: Clock + ?Sized>(&self, host: &H) -> bool {
        let elapsed = host.now().saturating_sub(self.state.last_rebalance_timestamp);
        elapsed >= self.config.thresholds.min_rebalance_interval_secs
    }

    /// Either leg's basket weight moved beyond the deviation threshold since
    /// the last rebalance, or a current borrow drifted that far from its
    /// optimal amount
    pub fn is_valid_rebalance_deviation<H: Host>(&self, host: &H) -> HedgeResult<bool> {
        let threshold = self.config.thresholds.deviation_threshold_bps as u128;
        let decimals = self.config.decimals;

        let basket = BasketSnapshot::read(host, decimals, false)?;
        let composition = basket.composition()?;
        for leg in Leg::ALL {
            let deviation = relative_deviation_bps(
                composition.weight(leg),
                self.state.last_known_composition.weight(leg),
            )?;
            if deviation > threshold {
                debug!(%leg, deviation, "basket weight deviated");
                return Ok(true);
            }
        }

        let prices = PriceSheet::read(host, decimals, false)?;
        let value = host.balance_of(Asset::Basket)?;
        let optimal = solver::optimal_borrows(value, &basket, &prices)?;
        let current = self.get_current_borrows(host)?;
        let dust = self.config.thresholds.dust_threshold;
        for leg in Leg::ALL {
            let (current, optimal) = (current.get(leg), optimal.get(leg));
            let gap = prices.to_stable(leg.asset(), current.abs_diff(optimal), Rounding::Down)?;
            if gap <= dust {
                continue;
            }
            let deviation = relative_deviation_bps(current, optimal)?;
            if deviation > threshold {
                debug!(%leg, deviation, current, optimal, "borrow deviated from optimal");
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// The vault has debt and its health factor left the band around target
    pub fn is_valid_rebalance_hf<H: LendingMarket + ?Sized>(&self, host: &H) -> HedgeResult<bool> {
        let account = host.account_data()?;
        if account.total_debt_value == 0 {
            return Ok(false);
        }
        let thresholds = &self.config.thresholds;
        let target = thresholds.target_health_factor_bps as u128;
        let band = thresholds.health_factor_band_bps as u128;
        Ok(account.health_factor_bps.abs_diff(target) > band)
    }

    /// Evaluate all triggers
    pub fn check_triggers<H: Host>(&self, host: &H) -> HedgeResult<TriggerReport> {
        let report = TriggerReport {
            time: self.is_valid_rebalance_time(host),
            deviation: self.is_valid_rebalance_deviation(host)?,
            health_factor: self.is_valid_rebalance_hf(host)?,
        };
        debug!(?report, "triggers evaluated");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_trigger() {
        assert!(!TriggerReport::default().any());
        assert!(TriggerReport {
            health_factor: true,
            ..TriggerReport::default()
        }
        .any());
    }
}
