//! # Solver Property Tests
//!
//! Zero value, linearity and uniform capping of the optimal borrow solver,
//! plus shape properties of the fee-split curve.

use hedge_core::fee_split::FeeSplitCurve;
use hedge_core::math::{mul_div, Rounding};
use hedge_core::oracle::{BasketSnapshot, PriceSheet};
use hedge_core::solver::{cap_borrows, optimal_borrows};
use hedge_core::*;
use proptest::prelude::*;

const BASKET_UNIT: u128 = 1_000_000_000_000_000_000;

fn world(btc_price: u128, eth_price: u128, btc_pool: u128, eth_pool: u128) -> (BasketSnapshot, PriceSheet) {
    let basket = BasketSnapshot {
        stable_pool: 80_000_000 * 1_000_000,
        btc_pool,
        eth_pool,
        stable_price: PRICE_PRECISION,
        btc_price,
        eth_price,
        supply: 1_000_000 * BASKET_UNIT,
        decimals: TokenDecimals::default(),
    };
    let prices = PriceSheet {
        stable: PRICE_PRECISION,
        btc: btc_price,
        eth: eth_price,
        basket_min: 99 * PRICE_PRECISION,
        basket_max: 101 * PRICE_PRECISION,
        use_min_price: false,
        decimals: TokenDecimals::default(),
    };
    (basket, prices)
}

fn default_world() -> (BasketSnapshot, PriceSheet) {
    world(
        20_000 * PRICE_PRECISION,
        1_500 * PRICE_PRECISION,
        600 * 100_000_000,
        5_333_333_333_333_333_333_333,
    )
}

#[test]
fn test_eighty_twelve_eight_targets() {
    let (basket, prices) = default_world();
    let targets = optimal_borrows(100 * BASKET_UNIT, &basket, &prices).unwrap();

    // 0.06 BTC
    assert_eq!(targets.btc, 6_000_000);
    // ~0.5333 ETH
    let expected_eth = 533_333_333_333_333_333u128;
    assert!(targets.eth.abs_diff(expected_eth) <= 1);
}

proptest! {
    #[test]
    fn prop_zero_value_means_zero_borrows(
        btc_price in 1_000u128..100_000,
        eth_price in 100u128..10_000,
        btc_pool in 0u128..100_000_000_000,
        eth_pool in 0u128..10_000_000_000_000_000_000_000,
    ) {
        let (basket, prices) = world(
            btc_price * PRICE_PRECISION,
            eth_price * PRICE_PRECISION,
            btc_pool,
            eth_pool,
        );
        prop_assert_eq!(
            optimal_borrows(0, &basket, &prices).unwrap(),
            BorrowPosition::default()
        );
    }

    #[test]
    fn prop_solver_is_linear(
        v1 in 0u128..1_000_000 * BASKET_UNIT,
        v2 in 0u128..1_000_000 * BASKET_UNIT,
    ) {
        let (basket, prices) = default_world();
        let a = optimal_borrows(v1, &basket, &prices).unwrap();
        let b = optimal_borrows(v2, &basket, &prices).unwrap();
        let sum = optimal_borrows(v1 + v2, &basket, &prices).unwrap();

        prop_assert!((a.btc + b.btc).abs_diff(sum.btc) <= 1);
        prop_assert!((a.eth + b.eth).abs_diff(sum.eth) <= 1);
    }

    #[test]
    fn prop_capping_never_increases_exposure(
        value in 1u128..1_000_000 * BASKET_UNIT,
        ceiling_fraction in 0u128..=10_000,
    ) {
        let (basket, prices) = default_world();
        let targets = optimal_borrows(value, &basket, &prices).unwrap();
        let borrow_value = solver::borrow_value(&targets, &prices, Rounding::Up).unwrap();
        let required = solver::required_draw(borrow_value, 15_000, 8_000).unwrap();
        let ceiling = mul_div(required, ceiling_fraction, 10_000, Rounding::Down).unwrap();

        let capped = cap_borrows(targets, value, required, ceiling).unwrap();
        prop_assert!(capped.borrows.btc <= targets.btc);
        prop_assert!(capped.borrows.eth <= targets.eth);
        prop_assert!(capped.target_draw <= required);
        prop_assert!(capped.unhedged_basket <= value);

        // Both legs scale by the same ratio: btc_c / btc_t == eth_c / eth_t,
        // checked cross-multiplied within one unit of each leg
        if targets.btc > 0 && targets.eth > 0 {
            let lhs = capped.borrows.btc * targets.eth;
            let rhs = capped.borrows.eth * targets.btc;
            prop_assert!(lhs.abs_diff(rhs) <= targets.btc.max(targets.eth));
        }
    }

    #[test]
    fn prop_fee_split_rate_monotonic(u1 in 0u128..=10_000, u2 in 0u128..=10_000) {
        let curve = FeeSplitCurve::default();
        let scale = FEE_SPLIT_PRECISION / BPS_DENOMINATOR;
        let (lo, hi) = if u1 <= u2 { (u1, u2) } else { (u2, u1) };

        let rate_lo = curve.rate_at(lo * scale).unwrap();
        let rate_hi = curve.rate_at(hi * scale).unwrap();
        prop_assert!(rate_lo <= rate_hi);
        prop_assert!(rate_hi <= FEE_SPLIT_PRECISION);
    }

    #[test]
    fn prop_fee_split_conserves_amount(amount in 0u128..u64::MAX as u128, rate_bps in 0u128..=10_000) {
        let rate = rate_bps * (FEE_SPLIT_PRECISION / BPS_DENOMINATOR);
        let (counterparty, vault) = FeeSplitCurve::split(amount, rate).unwrap();
        prop_assert_eq!(counterparty + vault, amount);
    }
}
