//! # Fee-Split Curve
//!
//! Two-slope utilization curve deciding which fraction of the funding
//! yield goes to the counterparty tranche. Configured in basis points,
//! evaluated at `FEE_SPLIT_PRECISION`:
//!
//! ```text
//! u <= optimal : base + u * slope1 / optimal
//! u >  optimal : base + slope1 + slope2 * (u - optimal) / (1 - optimal)
//! ```

use crate::constants::{BPS_DENOMINATOR, FEE_SPLIT_PRECISION, MAX_BPS};
use crate::errors::{HedgeError, HedgeResult};
use crate::interfaces::TrancheLiquidity;
use crate::math::{mul_div, safe_add_u128, safe_mul_u128, safe_sub_u128, Rounding};

/// Scale from basis points to `FEE_SPLIT_PRECISION`
const BPS_TO_SPLIT: u128 = FEE_SPLIT_PRECISION / BPS_DENOMINATOR;

/// Curve parameters, all in basis points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct FeeSplitCurve {
    pub optimal_utilization_bps: u32,
    pub base_rate_bps: u32,
    pub slope1_bps: u32,
    pub slope2_bps: u32,
}

impl Default for FeeSplitCurve {
    fn default() -> Self {
        Self {
            optimal_utilization_bps: 8_000,
            base_rate_bps: 1_000,
            slope1_bps: 1_500,
            slope2_bps: 5_000,
        }
    }
}

impl FeeSplitCurve {
    pub fn validate(&self) -> HedgeResult<()> {
        if self.optimal_utilization_bps == 0 || self.optimal_utilization_bps > MAX_BPS {
            return Err(HedgeError::InvalidParameter(
                "optimal utilization must be in (0, 100%]",
            ));
        }
        let max_rate = self.base_rate_bps as u64 + self.slope1_bps as u64 + self.slope2_bps as u64;
        if max_rate > MAX_BPS as u64 {
            return Err(HedgeError::InvalidParameter("fee split rate could exceed 100%"));
        }
        Ok(())
    }

    /// Share of lent-out stablecoin, `used / (available + used)`
    pub fn utilization(available: u128, used: u128) -> HedgeResult<u128> {
        if used == 0 {
            return Ok(0);
        }
        let total = safe_add_u128(available, used)?;
        mul_div(used, FEE_SPLIT_PRECISION, total, Rounding::Down)
    }

    /// Counterparty share of yield at `utilization`, both at `FEE_SPLIT_PRECISION`
    pub fn rate_at(&self, utilization: u128) -> HedgeResult<u128> {
        let optimal = to_split_precision(self.optimal_utilization_bps)?;
        let base = to_split_precision(self.base_rate_bps)?;
        let slope1 = to_split_precision(self.slope1_bps)?;
        let slope2 = to_split_precision(self.slope2_bps)?;

        if utilization <= optimal {
            let rise = mul_div(utilization, slope1, optimal, Rounding::Down)?;
            return safe_add_u128(base, rise);
        }

        // optimal < utilization, so the remaining span is never zero
        let excess = safe_sub_u128(utilization, optimal)?;
        let span = safe_sub_u128(FEE_SPLIT_PRECISION, optimal)?;
        let rise = mul_div(excess, slope2, span, Rounding::Down)?;
        safe_add_u128(safe_add_u128(base, slope1)?, rise)
    }

    /// Counterparty share of yield for the tranche's current liquidity
    pub fn fee_split_rate(&self, liquidity: TrancheLiquidity) -> HedgeResult<u128> {
        let utilization = Self::utilization(liquidity.available, liquidity.used)?;
        self.rate_at(utilization)
    }

    /// Split `amount` into `(counterparty_share, vault_share)`
    pub fn split(amount: u128, rate: u128) -> HedgeResult<(u128, u128)> {
        if rate > FEE_SPLIT_PRECISION {
            return Err(HedgeError::InvalidParameter("fee split rate above 100%"));
        }
        let counterparty = mul_div(amount, rate, FEE_SPLIT_PRECISION, Rounding::Down)?;
        Ok((counterparty, amount - counterparty))
    }
}

fn to_split_precision(bps: u32) -> HedgeResult<u128> {
    safe_mul_u128(bps as u128, BPS_TO_SPLIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PCT: u128 = FEE_SPLIT_PRECISION / 100;

    #[test]
    fn test_utilization() {
        assert_eq!(FeeSplitCurve::utilization(1_000, 0).unwrap(), 0);
        assert_eq!(FeeSplitCurve::utilization(0, 0).unwrap(), 0);
        assert_eq!(FeeSplitCurve::utilization(750, 250).unwrap(), 25 * PCT);
        assert_eq!(FeeSplitCurve::utilization(0, 500).unwrap(), FEE_SPLIT_PRECISION);
    }

    #[test]
    fn test_curve_shape() {
        let curve = FeeSplitCurve::default();

        // Zero utilization pays only the base rate
        assert_eq!(curve.rate_at(0).unwrap(), 10 * PCT);

        // Halfway to the kink: base + slope1 / 2
        assert_eq!(curve.rate_at(40 * PCT).unwrap(), 10 * PCT + 15 * PCT / 2);

        // At the kink: base + slope1
        assert_eq!(curve.rate_at(80 * PCT).unwrap(), 25 * PCT);

        // Halfway through the steep section
        assert_eq!(curve.rate_at(90 * PCT).unwrap(), 25 * PCT + 25 * PCT);

        // Full utilization: base + slope1 + slope2
        assert_eq!(curve.rate_at(FEE_SPLIT_PRECISION).unwrap(), 75 * PCT);
    }

    #[test]
    fn test_full_optimal_utilization() {
        let curve = FeeSplitCurve {
            optimal_utilization_bps: MAX_BPS,
            base_rate_bps: 0,
            slope1_bps: 5_000,
            slope2_bps: 0,
        };
        assert!(curve.validate().is_ok());
        assert_eq!(curve.rate_at(FEE_SPLIT_PRECISION).unwrap(), 50 * PCT);
    }

    #[test]
    fn test_fee_split_rate_from_liquidity() {
        let curve = FeeSplitCurve::default();
        let liquidity = TrancheLiquidity {
            available: 600,
            used: 400,
        };
        // 40% utilization
        assert_eq!(curve.fee_split_rate(liquidity).unwrap(), 10 * PCT + 15 * PCT / 2);
    }

    #[test]
    fn test_split() {
        let (counterparty, vault) = FeeSplitCurve::split(1_000_001, 25 * PCT).unwrap();
        assert_eq!(counterparty, 250_000);
        assert_eq!(vault, 750_001);

        assert_eq!(FeeSplitCurve::split(500, 0).unwrap(), (0, 500));
        assert!(FeeSplitCurve::split(500, FEE_SPLIT_PRECISION + 1).is_err());
    }

    #[test]
    fn test_validation() {
        assert!(FeeSplitCurve::default().validate().is_ok());

        let curve = FeeSplitCurve {
            optimal_utilization_bps: 0,
            ..FeeSplitCurve::default()
        };
        assert!(curve.validate().is_err());

        let curve = FeeSplitCurve {
            slope2_bps: 9_000,
            ..FeeSplitCurve::default()
        };
        assert!(curve.validate().is_err());
    }
}
