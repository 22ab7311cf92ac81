//! Constant-product pools and the multi-hop router over them.

use hedge_core::interfaces::{ExactInputParams, ExactOutputParams, SwapRouter};
use hedge_core::math::{mul_div, safe_add_u128, safe_sub_u128, Rounding};
use hedge_core::quoter::SwapPath;
use hedge_core::{Asset, HedgeError, HedgeResult, BPS_DENOMINATOR};
use tracing::debug;

use crate::host::SimulatedHost;

/// Fee tiers are expressed in hundredths of a basis point
pub const FEE_TIER_DENOMINATOR: u128 = 1_000_000;

/// Two-token constant-product pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    pub token_a: Asset,
    pub token_b: Asset,
    pub reserve_a: u128,
    pub reserve_b: u128,
    pub fee_tier: u32,
}

impl Pool {
    pub fn connects(&self, token_in: Asset, token_out: Asset, fee_tier: u32) -> bool {
        self.fee_tier == fee_tier
            && ((self.token_a == token_in && self.token_b == token_out)
                || (self.token_a == token_out && self.token_b == token_in))
    }

    fn reserves(&self, token_in: Asset) -> (u128, u128) {
        if token_in == self.token_a {
            (self.reserve_a, self.reserve_b)
        } else {
            (self.reserve_b, self.reserve_a)
        }
    }

    fn fee_factor(&self) -> HedgeResult<u128> {
        safe_sub_u128(FEE_TIER_DENOMINATOR, self.fee_tier as u128)
    }

    /// Output for selling `amount_in` of `token_in`
    pub fn amount_out(&self, token_in: Asset, amount_in: u128) -> HedgeResult<u128> {
        let (reserve_in, reserve_out) = self.reserves(token_in);
        let net_in = mul_div(amount_in, self.fee_factor()?, FEE_TIER_DENOMINATOR, Rounding::Down)?;
        mul_div(reserve_out, net_in, safe_add_u128(reserve_in, net_in)?, Rounding::Down)
    }

    /// Input needed to buy `amount_out` of the other token with `token_in`
    pub fn amount_in(&self, token_in: Asset, amount_out: u128) -> HedgeResult<u128> {
        let (reserve_in, reserve_out) = self.reserves(token_in);
        if amount_out >= reserve_out {
            return Err(HedgeError::QuoteUnavailable("insufficient pool liquidity"));
        }
        let net_in = mul_div(reserve_in, amount_out, reserve_out - amount_out, Rounding::Up)?;
        mul_div(net_in, FEE_TIER_DENOMINATOR, self.fee_factor()?, Rounding::Up)
    }

    /// Apply a trade to the reserves
    pub fn apply(&mut self, token_in: Asset, amount_in: u128, amount_out: u128) -> HedgeResult<()> {
        if token_in == self.token_a {
            self.reserve_a = safe_add_u128(self.reserve_a, amount_in)?;
            self.reserve_b = safe_sub_u128(self.reserve_b, amount_out)?;
        } else {
            self.reserve_b = safe_add_u128(self.reserve_b, amount_in)?;
            self.reserve_a = safe_sub_u128(self.reserve_a, amount_out)?;
        }
        Ok(())
    }
}

fn find_pool(pools: &[Pool], token_in: Asset, token_out: Asset, fee_tier: u32) -> HedgeResult<usize> {
    pools
        .iter()
        .position(|pool| pool.connects(token_in, token_out, fee_tier))
        .ok_or(HedgeError::InvalidRoute("no pool for hop"))
}

/// Run an exact-input trade hop by hop over `pools`, mutating them
fn route_exact_input(pools: &mut [Pool], path: &SwapPath, amount_in: u128) -> HedgeResult<u128> {
    path.validate()?;
    let mut amount = amount_in;
    for (token_in, token_out, fee_tier) in path.pools() {
        let index = find_pool(pools, token_in, token_out, fee_tier)?;
        let out = pools[index].amount_out(token_in, amount)?;
        pools[index].apply(token_in, amount, out)?;
        amount = out;
    }
    Ok(amount)
}

/// Run an exact-output trade backwards from the last hop, mutating `pools`
fn route_exact_output(pools: &mut [Pool], path: &SwapPath, amount_out: u128) -> HedgeResult<u128> {
    path.validate()?;
    let hops: Vec<_> = path.pools().collect();
    let mut amounts = vec![0u128; hops.len() + 1];
    amounts[hops.len()] = amount_out;
    for (i, (token_in, token_out, fee_tier)) in hops.iter().enumerate().rev() {
        let index = find_pool(pools, *token_in, *token_out, *fee_tier)?;
        amounts[i] = pools[index].amount_in(*token_in, amounts[i + 1])?;
    }
    for (i, (token_in, token_out, fee_tier)) in hops.iter().enumerate() {
        let index = find_pool(pools, *token_in, *token_out, *fee_tier)?;
        pools[index].apply(*token_in, amounts[i], amounts[i + 1])?;
    }
    Ok(amounts[0])
}

impl SwapRouter for SimulatedHost {
    fn quote_exact_input(&self, path: &SwapPath, amount_in: u128) -> HedgeResult<u128> {
        let mut pools = self.state().pools.clone();
        route_exact_input(&mut pools, path, amount_in)
    }

    fn quote_exact_output(&self, path: &SwapPath, amount_out: u128) -> HedgeResult<u128> {
        let mut pools = self.state().pools.clone();
        route_exact_output(&mut pools, path, amount_out)
    }

    fn exact_input(&mut self, params: &ExactInputParams) -> HedgeResult<u128> {
        self.check_deadline(params.deadline)?;
        let (token_in, token_out) = endpoints(&params.path)?;

        let mut pools = self.state().pools.clone();
        let pool_out = route_exact_input(&mut pools, &params.path, params.amount_in)?;
        let haircut = self.state().execution_haircut_bps as u128;
        let received = mul_div(pool_out, BPS_DENOMINATOR - haircut, BPS_DENOMINATOR, Rounding::Down)?;
        if received < params.amount_out_minimum {
            return Err(HedgeError::slippage(params.amount_out_minimum, received));
        }

        self.debit(token_in, params.amount_in)?;
        self.credit(token_out, received)?;
        self.state_mut().pools = pools;
        debug!(?token_in, ?token_out, amount_in = params.amount_in, received, "exact input swap");
        Ok(received)
    }

    fn exact_output(&mut self, params: &ExactOutputParams) -> HedgeResult<u128> {
        self.check_deadline(params.deadline)?;
        let (token_in, token_out) = endpoints(&params.path)?;

        let mut pools = self.state().pools.clone();
        let pool_in = route_exact_output(&mut pools, &params.path, params.amount_out)?;
        let haircut = self.state().execution_haircut_bps as u128;
        let paid = mul_div(pool_in, BPS_DENOMINATOR + haircut, BPS_DENOMINATOR, Rounding::Up)?;
        if paid > params.amount_in_maximum {
            return Err(HedgeError::slippage(params.amount_in_maximum, paid));
        }

        self.debit(token_in, paid)?;
        self.credit(token_out, params.amount_out)?;
        self.state_mut().pools = pools;
        debug!(?token_in, ?token_out, paid, amount_out = params.amount_out, "exact output swap");
        Ok(paid)
    }
}

fn endpoints(path: &SwapPath) -> HedgeResult<(Asset, Asset)> {
    match (path.input(), path.output()) {
        (Some(input), Some(output)) => Ok((input, output)),
        _ => Err(HedgeError::InvalidRoute("empty path")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> Pool {
        Pool {
            token_a: Asset::Eth,
            token_b: Asset::Stable,
            reserve_a: 1_000 * 10u128.pow(18),
            reserve_b: 1_500_000 * 1_000_000,
            fee_tier: 3_000,
        }
    }

    #[test]
    fn test_constant_product_with_fee() {
        let pool = pool();
        let out = pool.amount_out(Asset::Eth, 10u128.pow(18)).unwrap();
        // Just under $1,500 after the 0.3% fee and price impact
        assert!(out < 1_495_500_000);
        assert!(out > 1_490_000_000);

        let back = pool.amount_in(Asset::Eth, out).unwrap();
        // The floored output needs at most the original input
        assert!(back <= 10u128.pow(18));
        assert!(back > 10u128.pow(18) - 10u128.pow(9));
    }

    #[test]
    fn test_exact_output_beyond_reserves() {
        let pool = pool();
        assert_eq!(
            pool.amount_in(Asset::Stable, 1_000 * 10u128.pow(18)),
            Err(HedgeError::QuoteUnavailable("insufficient pool liquidity"))
        );
    }

    #[test]
    fn test_multi_hop_routing() {
        let mut pools = vec![
            Pool {
                token_a: Asset::Btc,
                token_b: Asset::Eth,
                reserve_a: 1_000 * 100_000_000,
                reserve_b: 13_333 * 10u128.pow(18),
                fee_tier: 500,
            },
            Pool {
                token_a: Asset::Eth,
                token_b: Asset::Stable,
                reserve_a: 13_333 * 10u128.pow(18),
                reserve_b: 20_000_000 * 1_000_000,
                fee_tier: 500,
            },
        ];
        let path = SwapPath::new(vec![Asset::Btc, Asset::Eth, Asset::Stable], vec![500, 500]).unwrap();
        let out = route_exact_input(&mut pools, &path, 100_000_000).unwrap();
        // One BTC is ~$20,000 before fees and impact
        assert!(out > 19_900_000_000 && out < 20_000_000_000);
        assert_eq!(pools[0].reserve_a, 1_001 * 100_000_000);

        let wrong_tier = SwapPath::new(vec![Asset::Eth, Asset::Stable], vec![3_000]).unwrap();
        assert_eq!(
            route_exact_input(&mut pools, &wrong_tier, 1),
            Err(HedgeError::InvalidRoute("no pool for hop"))
        );
    }
}
