//! Lending market: stablecoin collateral, variable-rate debt, health checks.

use hedge_core::interfaces::{AccountData, LendingMarket, ReserveData};
use hedge_core::math::{mul_div, safe_add_u128, Rounding};
use hedge_core::oracle::PriceSheet;
use hedge_core::{Asset, HedgeError, HedgeResult, HEALTH_FACTOR_NO_DEBT, MAX_BPS};
use std::collections::BTreeMap;
use tracing::debug;

use crate::host::SimulatedHost;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LendingState {
    /// Stablecoin supplied by the vault
    pub collateral: u128,
    pub debts: BTreeMap<Asset, u128>,
    pub liquidation_threshold_bps: u32,
    /// Annual borrow rate applied as time advances
    pub borrow_rate_bps: u32,
}

impl SimulatedHost {
    fn account(&self) -> HedgeResult<AccountData> {
        let lending = &self.state().lending;
        let prices = PriceSheet::read(self, self.state().decimals, false)?;

        let total_collateral_value = prices.to_stable(Asset::Stable, lending.collateral, Rounding::Down)?;
        let mut total_debt_value = 0;
        for (asset, debt) in &lending.debts {
            total_debt_value = safe_add_u128(
                total_debt_value,
                prices.to_stable(*asset, *debt, Rounding::Up)?,
            )?;
        }

        let health_factor_bps = if total_debt_value == 0 {
            HEALTH_FACTOR_NO_DEBT
        } else {
            mul_div(
                total_collateral_value,
                lending.liquidation_threshold_bps as u128,
                total_debt_value,
                Rounding::Down,
            )?
        };

        Ok(AccountData {
            total_collateral_value,
            total_debt_value,
            health_factor_bps,
        })
    }

    /// Reject the operation that just ran if it left the account liquidatable
    fn ensure_healthy(&self) -> HedgeResult<()> {
        let account = self.account()?;
        if account.health_factor_bps >= MAX_BPS as u128 {
            return Ok(());
        }
        let required = mul_div(
            account.total_debt_value,
            MAX_BPS as u128,
            self.state().lending.liquidation_threshold_bps as u128,
            Rounding::Up,
        )?;
        Err(HedgeError::InsufficientCollateral {
            required,
            available: account.total_collateral_value,
        })
    }
}

fn ensure_borrowable(asset: Asset) -> HedgeResult<()> {
    match asset {
        Asset::Btc | Asset::Eth => Ok(()),
        _ => Err(HedgeError::InvalidParameter("only leg tokens can be borrowed")),
    }
}

fn ensure_collateral(asset: Asset) -> HedgeResult<()> {
    match asset {
        Asset::Stable => Ok(()),
        _ => Err(HedgeError::InvalidParameter("only the stablecoin is accepted as collateral")),
    }
}

impl LendingMarket for SimulatedHost {
    fn reserve_data(&self, asset: Asset) -> HedgeResult<ReserveData> {
        let symbol = format!("{:?}", asset);
        Ok(ReserveData {
            variable_debt_token: format!("variableDebt{}", symbol),
            supply_token: format!("supplied{}", symbol),
            liquidation_threshold_bps: match asset {
                Asset::Stable => self.state().lending.liquidation_threshold_bps,
                _ => 0,
            },
        })
    }

    fn account_data(&self) -> HedgeResult<AccountData> {
        self.account()
    }

    fn debt_of(&self, asset: Asset) -> HedgeResult<u128> {
        Ok(self.state().lending.debts.get(&asset).copied().unwrap_or(0))
    }

    fn collateral(&self) -> HedgeResult<u128> {
        Ok(self.state().lending.collateral)
    }

    fn supply(&mut self, asset: Asset, amount: u128) -> HedgeResult<()> {
        ensure_collateral(asset)?;
        self.debit(asset, amount)?;
        let lending = &mut self.state_mut().lending;
        lending.collateral = safe_add_u128(lending.collateral, amount)?;
        debug!(amount, "collateral supplied");
        Ok(())
    }

    fn withdraw(&mut self, asset: Asset, amount: u128) -> HedgeResult<()> {
        ensure_collateral(asset)?;
        let collateral = self.state().lending.collateral;
        if collateral < amount {
            return Err(HedgeError::InsufficientCollateral {
                required: amount,
                available: collateral,
            });
        }
        self.all_or_nothing(|host| {
            host.state_mut().lending.collateral = collateral - amount;
            host.credit(asset, amount)?;
            host.ensure_healthy()
        })?;
        debug!(amount, "collateral withdrawn");
        Ok(())
    }

    fn borrow(&mut self, asset: Asset, amount: u128) -> HedgeResult<()> {
        ensure_borrowable(asset)?;
        self.all_or_nothing(|host| {
            let debt = host.state_mut().lending.debts.entry(asset).or_insert(0);
            *debt = safe_add_u128(*debt, amount)?;
            host.credit(asset, amount)?;
            host.ensure_healthy()
        })?;
        debug!(?asset, amount, "borrowed");
        Ok(())
    }

    fn repay(&mut self, asset: Asset, amount: u128) -> HedgeResult<()> {
        ensure_borrowable(asset)?;
        let owed = self.debt_of(asset)?;
        let repaid = amount.min(owed);
        self.debit(asset, repaid)?;
        self.state_mut().lending.debts.insert(asset, owed - repaid);
        debug!(?asset, repaid, "debt repaid");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;

    fn host() -> SimulatedHost {
        let mut host = SimulatedHost::new(&SimulationConfig::default()).unwrap();
        host.state_mut().balances.insert(Asset::Stable, 10_000 * 1_000_000);
        host
    }

    #[test]
    fn test_borrow_respects_health_factor() {
        let mut host = host();
        host.supply(Asset::Stable, 1_000 * 1_000_000).unwrap();

        // $1,000 at 80% LT supports $800 of debt; 0.05 BTC is $1,000
        let err = host.borrow(Asset::Btc, 5_000_000).unwrap_err();
        assert!(matches!(err, HedgeError::InsufficientCollateral { .. }));
        assert_eq!(host.debt_of(Asset::Btc).unwrap(), 0);
        assert_eq!(host.balance(Asset::Btc), 0);

        // 0.03 BTC is $600
        host.borrow(Asset::Btc, 3_000_000).unwrap();
        let account = host.account_data().unwrap();
        assert_eq!(account.total_debt_value, 600 * 1_000_000);
        assert_eq!(account.health_factor_bps, 13_333);
    }

    #[test]
    fn test_withdraw_and_repay() {
        let mut host = host();
        host.supply(Asset::Stable, 1_000 * 1_000_000).unwrap();
        host.borrow(Asset::Btc, 3_000_000).unwrap();

        assert!(host.withdraw(Asset::Stable, 500 * 1_000_000).is_err());
        host.repay(Asset::Btc, 10_000_000).unwrap();
        assert_eq!(host.debt_of(Asset::Btc).unwrap(), 0);
        assert_eq!(host.account_data().unwrap().health_factor_bps, HEALTH_FACTOR_NO_DEBT);
        host.withdraw(Asset::Stable, 1_000 * 1_000_000).unwrap();
        assert_eq!(host.collateral().unwrap(), 0);
    }

    #[test]
    fn test_only_stable_collateral() {
        let mut host = host();
        assert!(host.supply(Asset::Btc, 1).is_err());
        assert!(host.borrow(Asset::Stable, 1).is_err());
    }
}
