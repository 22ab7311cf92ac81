//! # Quoting Subsystem
//!
//! Read-only swap simulation through the external router. Signed amounts
//! pick the route: positive amounts are exact-input sells of the leg
//! token, negative amounts are exact-output buys. Quotes are always
//! returned as magnitudes.
//!
//! Both legs are quoted independently against current pool state, even
//! when a BTC route crosses the ETH pool the ETH leg also uses.

pub mod route;

pub use route::{RouteConfig, SwapPath, SwapRoute};

use tracing::debug;

use crate::errors::{HedgeError, HedgeResult};
use crate::interfaces::SwapRouter;
use crate::math::{apply_bps_discount, apply_bps_premium, safe_add_u128, Rounding};
use crate::oracle::PriceSheet;
use crate::types::{Asset, Leg, Thresholds};

/// A quoted leg swap together with its oracle-derived slippage bound
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapQuote {
    pub route: SwapRoute,
    pub path: SwapPath,
    pub amount_in: u128,
    pub amount_out: u128,
    /// Minimum output for exact-in, maximum input for exact-out
    pub bound: u128,
}

/// Quotes leg swaps over the configured routes
#[derive(Debug, Clone, Copy)]
pub struct Quoter<'a> {
    routes: &'a RouteConfig,
    thresholds: &'a Thresholds,
}

impl<'a> Quoter<'a> {
    pub fn new(routes: &'a RouteConfig, thresholds: &'a Thresholds) -> Self {
        Self { routes, thresholds }
    }

    /// Counter-amount of a signed leg amount.
    ///
    /// `amount > 0`: stablecoin received for selling `amount` tokens.
    /// `amount < 0`: stablecoin paid for buying `|amount|` tokens.
    pub fn quote<R>(&self, router: &R, leg: Leg, amount: i128) -> HedgeResult<u128>
    where
        R: SwapRouter + ?Sized,
    {
        match SwapRoute::resolve(leg, amount) {
            Some(route) => self.quote_route(router, route, amount.unsigned_abs()),
            None => Ok(0),
        }
    }

    /// Quote a resolved route for `magnitude` tokens of the leg
    pub fn quote_route<R>(&self, router: &R, route: SwapRoute, magnitude: u128) -> HedgeResult<u128>
    where
        R: SwapRouter + ?Sized,
    {
        let path = route.path(self.routes);
        let result = if route.is_exact_input() {
            router.quote_exact_input(&path, magnitude)
        } else {
            router.quote_exact_output(&path, magnitude)
        };
        result.map_err(|err| {
            debug!(?route, magnitude, %err, "route simulation failed");
            HedgeError::QuoteUnavailable("route simulation reverted")
        })
    }

    /// Dollar loss of executing both legs, summed.
    ///
    /// Per leg `max(0, dollars_in - dollars_out)`, with the input valued
    /// rounding up and the output rounding down so the estimate never
    /// understates the loss.
    pub fn quote_slippage_loss<R>(
        &self,
        router: &R,
        prices: &PriceSheet,
        btc_amount: i128,
        eth_amount: i128,
    ) -> HedgeResult<u128>
    where
        R: SwapRouter + ?Sized,
    {
        let btc_loss = self.leg_slippage_loss(router, prices, Leg::Btc, btc_amount)?;
        let eth_loss = self.leg_slippage_loss(router, prices, Leg::Eth, eth_amount)?;
        safe_add_u128(btc_loss, eth_loss)
    }

    /// Dollar loss of executing one leg
    pub fn leg_slippage_loss<R>(
        &self,
        router: &R,
        prices: &PriceSheet,
        leg: Leg,
        amount: i128,
    ) -> HedgeResult<u128>
    where
        R: SwapRouter + ?Sized,
    {
        let Some(route) = SwapRoute::resolve(leg, amount) else {
            return Ok(0);
        };
        let tokens = amount.unsigned_abs();
        let stable = self.quote_route(router, route, tokens)?;

        let (dollars_in, dollars_out) = if route.is_exact_input() {
            (
                prices.to_stable(leg.asset(), tokens, Rounding::Up)?,
                prices.to_stable(Asset::Stable, stable, Rounding::Down)?,
            )
        } else {
            (
                prices.to_stable(Asset::Stable, stable, Rounding::Up)?,
                prices.to_stable(leg.asset(), tokens, Rounding::Down)?,
            )
        };

        Ok(dollars_in.saturating_sub(dollars_out))
    }

    /// Quote selling exactly `amount_in` leg tokens, failing if the quote
    /// already undercuts the slippage floor
    pub fn bounded_exact_input<R>(
        &self,
        router: &R,
        prices: &PriceSheet,
        leg: Leg,
        amount_in: u128,
    ) -> HedgeResult<SwapQuote>
    where
        R: SwapRouter + ?Sized,
    {
        let route = resolve_route(leg, true);
        let amount_out = self.quote_route(router, route, amount_in)?;
        let value = prices.to_stable(leg.asset(), amount_in, Rounding::Down)?;
        let bound = min_amount_out(value, self.thresholds.swap_slippage_bps(leg))?;

        if amount_out < bound {
            debug!(%leg, amount_in, amount_out, bound, "quote below slippage floor");
            return Err(HedgeError::slippage(bound, amount_out));
        }

        Ok(SwapQuote {
            route,
            path: route.path(self.routes),
            amount_in,
            amount_out,
            bound,
        })
    }

    /// Quote buying exactly `amount_out` leg tokens, failing if the quote
    /// already exceeds the slippage ceiling
    pub fn bounded_exact_output<R>(
        &self,
        router: &R,
        prices: &PriceSheet,
        leg: Leg,
        amount_out: u128,
    ) -> HedgeResult<SwapQuote>
    where
        R: SwapRouter + ?Sized,
    {
        let route = resolve_route(leg, false);
        let amount_in = self.quote_route(router, route, amount_out)?;
        let value = prices.to_stable(leg.asset(), amount_out, Rounding::Up)?;
        let bound = max_amount_in(value, self.thresholds.swap_slippage_bps(leg))?;

        if amount_in > bound {
            debug!(%leg, amount_out, amount_in, bound, "quote above slippage ceiling");
            return Err(HedgeError::slippage(bound, amount_in));
        }

        Ok(SwapQuote {
            route,
            path: route.path(self.routes),
            amount_in,
            amount_out,
            bound,
        })
    }
}

fn resolve_route(leg: Leg, exact_input: bool) -> SwapRoute {
    match (leg, exact_input) {
        (Leg::Btc, true) => SwapRoute::BtcExactIn,
        (Leg::Btc, false) => SwapRoute::BtcExactOut,
        (Leg::Eth, true) => SwapRoute::EthExactIn,
        (Leg::Eth, false) => SwapRoute::EthExactOut,
    }
}

/// Exact-in floor: `value * (1 - slippage)`, rounded up
pub fn min_amount_out(value: u128, slippage_bps: u32) -> HedgeResult<u128> {
    apply_bps_discount(value, slippage_bps, Rounding::Up)
}

/// Exact-out ceiling: `value * (1 + slippage)`, rounded down
pub fn max_amount_in(value: u128, slippage_bps: u32) -> HedgeResult<u128> {
    apply_bps_premium(value, slippage_bps, Rounding::Down)
}
