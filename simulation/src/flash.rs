//! Flash-loan provider: lends any leg token for the duration of one flow.

use hedge_core::interfaces::{FlashLoan, FlashLoanProvider, FlashLoanReceipt};
use hedge_core::math::{bps_of, safe_add_u128, Rounding};
use hedge_core::{Asset, HedgeError, HedgeResult};
use std::collections::BTreeMap;
use tracing::debug;

use crate::host::SimulatedHost;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlashState {
    pub fee_bps: u32,
    /// Loan drawn and not yet settled
    pub outstanding: Option<FlashLoanReceipt>,
    pub fees_collected: BTreeMap<Asset, u128>,
}

impl FlashLoanProvider for SimulatedHost {
    fn flash_loan(&mut self, loans: &[FlashLoan]) -> HedgeResult<FlashLoanReceipt> {
        if self.state().flash.outstanding.is_some() {
            return Err(HedgeError::InvalidRebalanceState("flash loan already outstanding"));
        }
        if loans.is_empty() {
            return Err(HedgeError::InvalidParameter("empty flash loan"));
        }

        let fee_bps = self.state().flash.fee_bps;
        let fees = loans
            .iter()
            .map(|loan| bps_of(loan.amount, fee_bps, Rounding::Up))
            .collect::<HedgeResult<Vec<_>>>()?;
        for loan in loans {
            self.credit(loan.asset, loan.amount)?;
        }

        let receipt = FlashLoanReceipt {
            loans: loans.to_vec(),
            fees,
        };
        self.state_mut().flash.outstanding = Some(receipt.clone());
        debug!(loans = loans.len(), "flash loan drawn");
        Ok(receipt)
    }

    fn settle(&mut self, receipt: &FlashLoanReceipt) -> HedgeResult<()> {
        if self.state().flash.outstanding.as_ref() != Some(receipt) {
            return Err(HedgeError::InvalidRebalanceState("settling an unknown flash loan"));
        }

        self.all_or_nothing(|host| {
            for (loan, fee) in receipt.loans.iter().zip(&receipt.fees) {
                let owed = safe_add_u128(loan.amount, *fee)?;
                if host.balance(loan.asset) < owed {
                    return Err(HedgeError::FlashLoanUnpaid);
                }
                host.debit(loan.asset, owed)?;
                let collected = host.state_mut().flash.fees_collected.entry(loan.asset).or_insert(0);
                *collected = safe_add_u128(*collected, *fee)?;
            }
            Ok(())
        })?;

        self.state_mut().flash.outstanding = None;
        debug!("flash loan settled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;

    #[test]
    fn test_fee_rounds_up_and_must_be_repaid() {
        let mut host = SimulatedHost::new(&SimulationConfig::default()).unwrap();
        host.state_mut().flash.fee_bps = 9;

        let loan = FlashLoan {
            asset: Asset::Eth,
            amount: 1_001,
        };
        let receipt = host.flash_loan(&[loan]).unwrap();
        assert_eq!(receipt.fees, vec![1]);
        assert_eq!(host.balance(Asset::Eth), 1_001);
        assert!(host.flash_loan(&[loan]).is_err());

        assert_eq!(host.settle(&receipt), Err(HedgeError::FlashLoanUnpaid));
        host.credit(Asset::Eth, 1).unwrap();
        host.settle(&receipt).unwrap();
        assert_eq!(host.balance(Asset::Eth), 0);
        assert_eq!(host.state().flash.fees_collected[&Asset::Eth], 1);
        assert!(host.state().flash.outstanding.is_none());
    }
}
