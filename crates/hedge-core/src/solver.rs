//! # Optimal Borrow Solver
//!
//! Derives the borrow position that cancels the basket's exposure to
//! each volatile asset, and scales it down uniformly when the
//! counterparty tranche cannot fund the collateral it needs.

use crate::constants::MAX_BPS;
use crate::errors::{HedgeError, HedgeResult};
use crate::math::{mul_div, safe_add_u128, safe_sub_u128, Rounding};
use crate::oracle::{BasketSnapshot, PriceSheet};
use crate::types::{BorrowPosition, Leg};

/// Outcome of the capped allocation adjuster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CappedBorrows {
    /// Borrow targets, each at most its uncapped counterpart
    pub borrows: BorrowPosition,
    /// Counterparty draw the targets need, at most the ceiling
    pub target_draw: u128,
    /// Basket amount left without a borrow-funded hedge
    pub unhedged_basket: u128,
    pub is_capped: bool,
}

/// Borrow of each leg that offsets the exposure of `value` basket tokens.
///
/// `target = value * pool * basket_price / (supply * oracle_price)`, the
/// vault's share of each pooled reserve converted to the leg token at its
/// oracle price. The per-supply factor is computed first so the result is
/// linear in `value` up to one unit of rounding.
pub fn optimal_borrows(
    value: u128,
    basket: &BasketSnapshot,
    prices: &PriceSheet,
) -> HedgeResult<BorrowPosition> {
    if value == 0 || basket.supply == 0 {
        return Ok(BorrowPosition::default());
    }
    Ok(BorrowPosition {
        btc: leg_target(value, Leg::Btc, basket, prices)?,
        eth: leg_target(value, Leg::Eth, basket, prices)?,
    })
}

fn leg_target(
    value: u128,
    leg: Leg,
    basket: &BasketSnapshot,
    prices: &PriceSheet,
) -> HedgeResult<u128> {
    let reserve = mul_div(
        basket.pool(leg),
        basket.price(leg),
        prices.price(leg.asset()),
        Rounding::Down,
    )?;
    mul_div(value, reserve, basket.supply, Rounding::Down)
}

/// Stablecoin value of a borrow position at oracle prices
pub fn borrow_value(
    borrows: &BorrowPosition,
    prices: &PriceSheet,
    rounding: Rounding,
) -> HedgeResult<u128> {
    let btc = prices.to_stable(Leg::Btc.asset(), borrows.btc, rounding)?;
    let eth = prices.to_stable(Leg::Eth.asset(), borrows.eth, rounding)?;
    safe_add_u128(btc, eth)
}

/// Counterparty draw keeping the health factor at target once the borrowed
/// legs are sold into collateral: `borrow_value * (target_hf - lt) / lt`,
/// rounded up
pub fn required_draw(borrow_value: u128, target_hf_bps: u32, lt_bps: u32) -> HedgeResult<u128> {
    if lt_bps == 0 || lt_bps > MAX_BPS {
        return Err(HedgeError::InvalidParameter("liquidation threshold out of range"));
    }
    if target_hf_bps <= lt_bps {
        return Err(HedgeError::InvalidParameter(
            "target health factor must exceed the liquidation threshold",
        ));
    }
    mul_div(
        borrow_value,
        (target_hf_bps - lt_bps) as u128,
        lt_bps as u128,
        Rounding::Up,
    )
}

/// Scale `targets` so that their draw fits under `ceiling`.
///
/// Both legs shrink by the same ratio `ceiling / required_draw`, which
/// keeps the hedge ratio between them. The fraction of `value` left
/// unhedged is rounded up so it is never understated.
pub fn cap_borrows(
    targets: BorrowPosition,
    value: u128,
    required_draw: u128,
    ceiling: u128,
) -> HedgeResult<CappedBorrows> {
    if required_draw <= ceiling {
        return Ok(CappedBorrows {
            borrows: targets,
            target_draw: required_draw,
            unhedged_basket: 0,
            is_capped: false,
        });
    }

    let borrows = BorrowPosition {
        btc: mul_div(targets.btc, ceiling, required_draw, Rounding::Down)?,
        eth: mul_div(targets.eth, ceiling, required_draw, Rounding::Down)?,
    };
    let shortfall = safe_sub_u128(required_draw, ceiling)?;
    let unhedged_basket = mul_div(value, shortfall, required_draw, Rounding::Up)?;

    Ok(CappedBorrows {
        borrows,
        target_draw: ceiling,
        unhedged_basket,
        is_capped: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::PRICE_PRECISION;
    use crate::types::TokenDecimals;

    const BASKET_UNIT: u128 = 1_000_000_000_000_000_000;

    /// 80% stable / 12% BTC / 8% ETH basket worth $100 per token
    fn world() -> (BasketSnapshot, PriceSheet) {
        let basket = BasketSnapshot {
            stable_pool: 80_000_000 * 1_000_000,
            btc_pool: 600 * 100_000_000,
            eth_pool: 4_000 * BASKET_UNIT,
            stable_price: PRICE_PRECISION,
            btc_price: 20_000 * PRICE_PRECISION,
            eth_price: 2_000 * PRICE_PRECISION,
            supply: 1_000_000 * BASKET_UNIT,
            decimals: TokenDecimals::default(),
        };
        let prices = PriceSheet {
            stable: PRICE_PRECISION,
            btc: 20_000 * PRICE_PRECISION,
            eth: 2_000 * PRICE_PRECISION,
            basket_min: 100 * PRICE_PRECISION,
            basket_max: 100 * PRICE_PRECISION,
            use_min_price: false,
            decimals: TokenDecimals::default(),
        };
        (basket, prices)
    }

    #[test]
    fn test_zero_value() {
        let (basket, prices) = world();
        assert_eq!(optimal_borrows(0, &basket, &prices).unwrap(), BorrowPosition::default());
    }

    #[test]
    fn test_targets_match_reserve_share() {
        let (basket, prices) = world();
        let targets = optimal_borrows(100 * BASKET_UNIT, &basket, &prices).unwrap();
        // $10,000 of basket holds $1,200 of BTC and $800 of ETH
        assert_eq!(targets.btc, 6_000_000);
        assert_eq!(targets.eth, 4 * BASKET_UNIT / 10);
        assert_eq!(
            borrow_value(&targets, &prices, Rounding::Up).unwrap(),
            2_000_000_000
        );
    }

    #[test]
    fn test_required_draw() {
        // $2,000 borrowed, HF 1.5, LT 0.8: draw = 2000 * 0.7 / 0.8 = 1750
        assert_eq!(required_draw(2_000_000_000, 15_000, 8_000).unwrap(), 1_750_000_000);
        // Rounds up
        assert_eq!(required_draw(1, 15_000, 8_000).unwrap(), 1);
        assert!(required_draw(1, 8_000, 8_000).is_err());
        assert!(required_draw(1, 15_000, 0).is_err());
    }

    #[test]
    fn test_uncapped_passthrough() {
        let targets = BorrowPosition::new(6_000_000, 400);
        let capped = cap_borrows(targets, 100, 1_750, 1_750).unwrap();
        assert!(!capped.is_capped);
        assert_eq!(capped.borrows, targets);
        assert_eq!(capped.unhedged_basket, 0);
        assert_eq!(capped.target_draw, 1_750);
    }

    #[test]
    fn test_capped_halves_both_legs() {
        let targets = BorrowPosition::new(6_000_000, 4 * BASKET_UNIT / 10);
        let capped = cap_borrows(targets, 100 * BASKET_UNIT, 1_750_000_000, 875_000_000).unwrap();
        assert!(capped.is_capped);
        assert_eq!(capped.borrows.btc, 3_000_000);
        assert_eq!(capped.borrows.eth, 2 * BASKET_UNIT / 10);
        assert_eq!(capped.target_draw, 875_000_000);
        assert_eq!(capped.unhedged_basket, 50 * BASKET_UNIT);
    }

    #[test]
    fn test_zero_ceiling_leaves_everything_unhedged() {
        let targets = BorrowPosition::new(6_000_000, 400);
        let capped = cap_borrows(targets, 100, 1_750, 0).unwrap();
        assert!(capped.borrows.is_zero());
        assert_eq!(capped.unhedged_basket, 100);
    }
}
