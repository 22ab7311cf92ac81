//! Counterparty tranche lending stablecoin collateral to the vault.

use hedge_core::interfaces::{CounterpartyTranche, TrancheLiquidity};
use hedge_core::math::{bps_of, safe_add_u128, Rounding};
use hedge_core::{Asset, HedgeError, HedgeResult};
use tracing::debug;

use crate::host::SimulatedHost;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrancheState {
    /// Stablecoin the tranche holds and has not lent out
    pub idle: u128,
    pub lent_to_vault: u128,
    /// Lent to other vaults; counts toward utilization
    pub other_borrowed: u128,
    /// Most this vault may owe the tranche
    pub vault_cap: u128,
    /// Utilization above which the tranche stops lending
    pub max_utilization_bps: u32,
    pub yield_received: u128,
}

impl TrancheState {
    pub fn used(&self) -> u128 {
        self.lent_to_vault.saturating_add(self.other_borrowed)
    }

    /// What the vault may still draw
    pub fn available(&self) -> HedgeResult<u128> {
        let used = self.used();
        let total = safe_add_u128(self.idle, used)?;
        let utilization_room = bps_of(total, self.max_utilization_bps, Rounding::Down)?.saturating_sub(used);
        let cap_room = self.vault_cap.saturating_sub(self.lent_to_vault);
        Ok(cap_room.min(utilization_room).min(self.idle))
    }
}

impl CounterpartyTranche for SimulatedHost {
    fn tranche_available(&self) -> HedgeResult<u128> {
        self.state().tranche.available()
    }

    fn tranche_borrowed(&self) -> HedgeResult<u128> {
        Ok(self.state().tranche.lent_to_vault)
    }

    fn tranche_liquidity(&self) -> HedgeResult<TrancheLiquidity> {
        let tranche = &self.state().tranche;
        Ok(TrancheLiquidity {
            available: tranche.idle,
            used: tranche.used(),
        })
    }

    fn draw_from_tranche(&mut self, amount: u128) -> HedgeResult<()> {
        let available = self.state().tranche.available()?;
        if amount > available {
            return Err(HedgeError::BorrowCapBreached {
                requested: amount,
                available,
            });
        }
        let tranche = &mut self.state_mut().tranche;
        tranche.idle -= amount;
        tranche.lent_to_vault = safe_add_u128(tranche.lent_to_vault, amount)?;
        self.credit(Asset::Stable, amount)?;
        debug!(amount, "drew from tranche");
        Ok(())
    }

    fn repay_tranche(&mut self, amount: u128) -> HedgeResult<()> {
        if amount > self.state().tranche.lent_to_vault {
            return Err(HedgeError::InvalidParameter("repayment exceeds tranche debt"));
        }
        self.debit(Asset::Stable, amount)?;
        let tranche = &mut self.state_mut().tranche;
        tranche.lent_to_vault -= amount;
        tranche.idle = safe_add_u128(tranche.idle, amount)?;
        debug!(amount, "repaid tranche");
        Ok(())
    }

    fn pay_tranche_yield(&mut self, amount: u128) -> HedgeResult<()> {
        self.debit(Asset::Stable, amount)?;
        let tranche = &mut self.state_mut().tranche;
        tranche.idle = safe_add_u128(tranche.idle, amount)?;
        tranche.yield_received = safe_add_u128(tranche.yield_received, amount)?;
        Ok(())
    }
}
