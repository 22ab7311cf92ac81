//! # Core Error Types
//!
//! Every error aborts the in-flight flow atomically. None of them is caught
//! or retried inside the engine; schedulers treat all of them as
//! "rebalance deferred".

use thiserror::Error;

use crate::types::Asset;

/// Engine errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HedgeError {
    // ========================================================================
    // Quoting and Swap Errors
    // ========================================================================
    #[error("Quote unavailable: {0}")]
    QuoteUnavailable(&'static str),

    #[error("Slippage exceeded: bound {bound}, actual {actual}")]
    SlippageExceeded { bound: u128, actual: u128 },

    #[error("Swap deadline expired")]
    DeadlineExpired,

    #[error("Invalid route: {0}")]
    InvalidRoute(&'static str),

    // ========================================================================
    // Lending and Counterparty Errors
    // ========================================================================
    #[error("Borrow cap breached: requested {requested}, available {available}")]
    BorrowCapBreached { requested: u128, available: u128 },

    #[error("Insufficient collateral: required {required}, available {available}")]
    InsufficientCollateral { required: u128, available: u128 },

    #[error("Insufficient {asset:?} balance: required {required}, available {available}")]
    InsufficientBalance {
        asset: Asset,
        required: u128,
        available: u128,
    },

    #[error("Flash loan not repaid")]
    FlashLoanUnpaid,

    // ========================================================================
    // Orchestration Errors
    // ========================================================================
    #[error("Invalid rebalance state: {0}")]
    InvalidRebalanceState(&'static str),

    #[error("Unauthorized caller")]
    Unauthorized,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(&'static str),

    // ========================================================================
    // Math Errors
    // ========================================================================
    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    #[error("Division by zero")]
    DivisionByZero,
}

/// Result type using engine errors
pub type HedgeResult<T> = Result<T, HedgeError>;

impl HedgeError {
    /// Create a slippage error from the violated bound and the offending amount
    pub fn slippage(bound: u128, actual: u128) -> Self {
        Self::SlippageExceeded { bound, actual }
    }

    /// Whether the error came from market conditions rather than a misuse of the engine
    pub fn is_market_condition(&self) -> bool {
        matches!(
            self,
            Self::QuoteUnavailable(_)
                | Self::SlippageExceeded { .. }
                | Self::BorrowCapBreached { .. }
                | Self::InsufficientCollateral { .. }
                | Self::DeadlineExpired
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HedgeError::slippage(990, 950);
        assert_eq!(format!("{}", err), "Slippage exceeded: bound 990, actual 950");

        let err = HedgeError::BorrowCapBreached {
            requested: 10,
            available: 4,
        };
        assert_eq!(format!("{}", err), "Borrow cap breached: requested 10, available 4");
    }

    #[test]
    fn test_error_classification() {
        assert!(HedgeError::QuoteUnavailable("no liquidity").is_market_condition());
        assert!(!HedgeError::Unauthorized.is_market_condition());
    }
}
