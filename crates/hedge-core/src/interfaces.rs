//! # External Collaborators
//!
//! Interfaces of the services the engine drives. The engine owns none of
//! them; a host bundles them together and provides the atomicity the
//! flows rely on through [`Checkpoint`].
//!
//! Every mutating call acts on behalf of the vault: tokens are taken from
//! and delivered to the vault's own balances, as reported by
//! [`VaultLedger`].

use crate::errors::HedgeResult;
use crate::quoter::SwapPath;
use crate::types::Asset;

/// Reserve configuration of a lending-market asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveData {
    /// Token tracking variable-rate debt of the asset
    pub variable_debt_token: String,
    /// Token tracking supplied amounts of the asset
    pub supply_token: String,
    /// Liquidation threshold of the asset when used as collateral (basis points)
    pub liquidation_threshold_bps: u32,
}

/// Vault-level lending-market account summary, values in stablecoin units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountData {
    pub total_collateral_value: u128,
    pub total_debt_value: u128,
    /// Health factor in basis points; `HEALTH_FACTOR_NO_DEBT` without debt
    pub health_factor_bps: u128,
}

/// Exact-input swap request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExactInputParams {
    pub path: SwapPath,
    pub amount_in: u128,
    pub amount_out_minimum: u128,
    pub deadline: i64,
}

/// Exact-output swap request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExactOutputParams {
    pub path: SwapPath,
    pub amount_out: u128,
    pub amount_in_maximum: u128,
    pub deadline: i64,
}

/// A single flash-borrowed asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashLoan {
    pub asset: Asset,
    pub amount: u128,
}

/// Proof that a flash loan was drawn; must be settled before the flow ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashLoanReceipt {
    pub loans: Vec<FlashLoan>,
    /// Fee owed per loan, same order as `loans`
    pub fees: Vec<u128>,
}

impl FlashLoanReceipt {
    /// Fee owed on `asset`
    pub fn fee_for(&self, asset: Asset) -> u128 {
        self.loans
            .iter()
            .zip(&self.fees)
            .filter(|(loan, _)| loan.asset == asset)
            .map(|(_, fee)| *fee)
            .sum()
    }
}

/// Counterparty tranche liquidity, in stablecoin units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrancheLiquidity {
    /// Idle stablecoin the tranche still holds
    pub available: u128,
    /// Stablecoin currently lent out
    pub used: u128,
}

/// Spot price feed; USD per whole token with `PRICE_DECIMALS` decimals
pub trait PriceOracle {
    fn price(&self, asset: Asset) -> HedgeResult<u128>;
}

/// The basket token's index manager
pub trait BasketVault {
    /// Amount of `asset` pooled in the basket
    fn pool_amount(&self, asset: Asset) -> HedgeResult<u128>;
    /// Outstanding basket tokens
    fn basket_supply(&self) -> HedgeResult<u128>;
    /// The basket's internal min (`maximise = false`) or max price of `asset`
    fn asset_price(&self, asset: Asset, maximise: bool) -> HedgeResult<u128>;
    /// Price of one whole basket token at min or max internal pricing
    fn basket_price(&self, maximise: bool) -> HedgeResult<u128>;
    /// Mint basket tokens with stablecoin; returns basket minted
    fn mint(&mut self, stable_in: u128, min_basket_out: u128) -> HedgeResult<u128>;
    /// Redeem basket tokens for stablecoin; returns stablecoin received
    fn redeem(&mut self, basket_in: u128, min_stable_out: u128) -> HedgeResult<u128>;
}

/// Lending market where the legs are borrowed against stablecoin collateral
pub trait LendingMarket {
    fn reserve_data(&self, asset: Asset) -> HedgeResult<ReserveData>;
    fn account_data(&self) -> HedgeResult<AccountData>;
    /// Debt of the vault in `asset`
    fn debt_of(&self, asset: Asset) -> HedgeResult<u128>;
    /// Stablecoin supplied by the vault
    fn collateral(&self) -> HedgeResult<u128>;
    fn supply(&mut self, asset: Asset, amount: u128) -> HedgeResult<()>;
    fn withdraw(&mut self, asset: Asset, amount: u128) -> HedgeResult<()>;
    fn borrow(&mut self, asset: Asset, amount: u128) -> HedgeResult<()>;
    fn repay(&mut self, asset: Asset, amount: u128) -> HedgeResult<()>;
}

/// Multi-hop AMM router; `SwapPath` lists tokens in trade order
pub trait SwapRouter {
    fn quote_exact_input(&self, path: &SwapPath, amount_in: u128) -> HedgeResult<u128>;
    fn quote_exact_output(&self, path: &SwapPath, amount_out: u128) -> HedgeResult<u128>;
    /// Returns the amount received
    fn exact_input(&mut self, params: &ExactInputParams) -> HedgeResult<u128>;
    /// Returns the amount paid
    fn exact_output(&mut self, params: &ExactOutputParams) -> HedgeResult<u128>;
}

/// Flash-loan provider, modelled as a two-phase protocol: draw, then settle
pub trait FlashLoanProvider {
    /// Credit the loans to the vault
    fn flash_loan(&mut self, loans: &[FlashLoan]) -> HedgeResult<FlashLoanReceipt>;
    /// Collect principal plus fees from the vault
    fn settle(&mut self, receipt: &FlashLoanReceipt) -> HedgeResult<()>;
}

/// Second, capital-supplying tranche that lends stablecoin collateral to the vault
pub trait CounterpartyTranche {
    /// What the vault may still draw, after per-vault and global utilization caps
    fn tranche_available(&self) -> HedgeResult<u128>;
    /// What the vault currently owes the tranche
    fn tranche_borrowed(&self) -> HedgeResult<u128>;
    fn tranche_liquidity(&self) -> HedgeResult<TrancheLiquidity>;
    fn draw_from_tranche(&mut self, amount: u128) -> HedgeResult<()>;
    fn repay_tranche(&mut self, amount: u128) -> HedgeResult<()>;
    /// Hand the tranche its share of funding profit
    fn pay_tranche_yield(&mut self, amount: u128) -> HedgeResult<()>;
}

/// Token balances held by the vault itself
pub trait VaultLedger {
    fn balance_of(&self, asset: Asset) -> HedgeResult<u128>;
}

/// Host clock, unix seconds
pub trait Clock {
    fn now(&self) -> i64;
}

/// Handle of an open checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointId(pub usize);

/// Atomicity of the host execution model: everything done after
/// `checkpoint` is either committed or reverted as one unit
pub trait Checkpoint {
    fn checkpoint(&mut self) -> CheckpointId;
    fn commit(&mut self, id: CheckpointId);
    fn revert(&mut self, id: CheckpointId);
}

/// Every collaborator the engine needs, bundled
pub trait Host:
    PriceOracle
    + BasketVault
    + LendingMarket
    + SwapRouter
    + FlashLoanProvider
    + CounterpartyTranche
    + VaultLedger
    + Clock
    + Checkpoint
{
}

impl<T> Host for T where
    T: PriceOracle
        + BasketVault
        + LendingMarket
        + SwapRouter
        + FlashLoanProvider
        + CounterpartyTranche
        + VaultLedger
        + Clock
        + Checkpoint
{
}
