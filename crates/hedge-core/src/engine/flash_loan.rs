//! # Flow Phases and Flash-Loan Plans
//!
//! Flash loans run as an explicit two-phase protocol. The engine draws
//! the loan, parks the plan in `FlowPhase::AwaitingCallback`, executes it
//! in `on_flash_loan`, and settles principal plus fees with the provider.

use crate::interfaces::FlashLoan;
use crate::types::Leg;

/// Where the orchestrator is in a flow
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FlowPhase {
    #[default]
    Idle,
    TriggerCheck,
    ProfitReconcile,
    HedgeAdjust,
    BorrowAdjust,
    /// Flash loan drawn, plan not yet executed
    AwaitingCallback { plan: FlashLoanPlan },
}

impl FlowPhase {
    pub fn is_idle(&self) -> bool {
        matches!(self, FlowPhase::Idle)
    }
}

/// Borrow change of one leg, `delta = target - current`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegAction {
    pub leg: Leg,
    pub delta: i128,
}

impl LegAction {
    /// Flash loan funding this leg: `|delta|` of the leg token
    pub fn loan(&self) -> FlashLoan {
        FlashLoan {
            asset: self.leg.asset(),
            amount: self.delta.unsigned_abs(),
        }
    }
}

/// Legs adjusted under one flash loan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlashLoanPlan {
    pub actions: Vec<LegAction>,
}

impl FlashLoanPlan {
    pub fn loans(&self) -> Vec<FlashLoan> {
        self.actions.iter().map(LegAction::loan).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// What one leg adjustment did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegExecution {
    pub leg: Leg,
    pub delta: i128,
    /// Leg tokens sold (increase) or bought (decrease)
    pub tokens_swapped: u128,
    /// Stablecoin received (increase) or paid (decrease)
    pub stable_amount: u128,
    pub flash_loan_fee: u128,
}
