// 8.0.2: result types and errors for pool operations.

use crate::config::ConfigError;
use crate::custody::TransferError;
use crate::fixed::MathError;
use crate::ledger::LedgerError;
use crate::position::BookError;
use crate::pricing::PricingError;
use crate::settlement::PoolStatus;
use crate::types::{AccountId, Amount, AssetId, PositionId, Rate, Shares, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositResult {
    pub shares_minted: Shares,
    pub total_assets: Amount,
    pub total_shares: Shares,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawResult {
    pub amount_out: Amount,
    pub from_deposits: Amount,
    pub from_premiums: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuyResult {
    pub position_id: PositionId,
    pub premium: Amount,
    pub locked_spread: Rate,
    pub utilization_after: Rate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseResult {
    pub position_id: PositionId,
    pub earned_premium: Amount,
    pub refund: Amount,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccrualResult {
    pub elapsed_secs: i64,
    pub positions: usize,
    pub gross: Amount,
    pub protocol_fee: Amount, // fee sink cut
    pub net: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementResult {
    pub loss_rate: Rate,
    pub positions_settled: usize,
    pub total_liability: Amount,
    pub total_payout: Amount,
    pub pro_rata: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiryResult {
    pub positions_lapsed: usize,
    pub residual_premium: Amount,
}

/// Coarse failure class. Routing layers use this to decide whether a retry can help.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    Unauthorized,
    WrongState,
    SlippageExceeded,
    InsufficientLiquidity,
    UtilizationCapExceeded,
    Undercollateralized,
    CapacityExceeded,
    NothingToClaim,
    Transfer,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Caller {caller} is not authorized")]
    Unauthorized { caller: AccountId },

    #[error("Cannot {operation} while pool is {status}")]
    WrongState { operation: &'static str, status: PoolStatus },

    #[error("Pool matured at {maturity}")]
    PoolMatured { maturity: Timestamp },

    #[error("Pool matures at {maturity}")]
    NotYetMatured { maturity: Timestamp },

    #[error("Position {0} not found")]
    PositionNotFound(PositionId),

    #[error("Position {0} is not active")]
    PositionInactive(PositionId),

    #[error("Premium {quoted} exceeds maximum {max}")]
    SlippageExceeded { quoted: Amount, max: Amount },

    #[error("Pool has no liquidity")]
    InsufficientLiquidity,

    #[error("Utilization {requested} would exceed cap {max}")]
    UtilizationCapExceeded { requested: Rate, max: Rate },

    #[error("Withdrawal of {requested} exceeds unencumbered assets {max_withdrawable}")]
    Undercollateralized { requested: Amount, max_withdrawable: Amount },

    #[error("Active position limit {max} reached")]
    CapacityExceeded { max: usize },

    #[error("Nothing to claim for {0}")]
    NothingToClaim(AccountId),

    #[error("Insufficient shares: requested {requested}, available {available}")]
    InsufficientShares { requested: Shares, available: Shares },

    #[error("Withdrawal cooldown active for another {remaining_secs}s")]
    CooldownActive { remaining_secs: i64 },

    #[error("No credit event reported for {0}")]
    CreditEventNotReported(AssetId),

    #[error("Another operation is in progress")]
    OperationInProgress,

    #[error("Pool lock poisoned")]
    LockPoisoned,

    #[error("Invariant violated: {0}")]
    InvariantViolated(String),

    #[error("Math error: {0}")]
    Math(#[from] MathError),

    #[error("Pricing error: {0}")]
    Pricing(PricingError),

    #[error("Transfer failed: {0}")]
    Transfer(#[from] TransferError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl PoolError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        PoolError::InvalidInput { reason: reason.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PoolError::InvalidInput { .. }
            | PoolError::InsufficientShares { .. }
            | PoolError::PositionNotFound(_)
            | PoolError::Pricing(_)
            | PoolError::Config(_) => ErrorKind::InvalidInput,
            PoolError::Unauthorized { .. } => ErrorKind::Unauthorized,
            PoolError::WrongState { .. }
            | PoolError::PoolMatured { .. }
            | PoolError::NotYetMatured { .. }
            | PoolError::PositionInactive(_)
            | PoolError::CooldownActive { .. }
            | PoolError::CreditEventNotReported(_)
            | PoolError::OperationInProgress => ErrorKind::WrongState,
            PoolError::SlippageExceeded { .. } => ErrorKind::SlippageExceeded,
            PoolError::InsufficientLiquidity => ErrorKind::InsufficientLiquidity,
            PoolError::UtilizationCapExceeded { .. } => ErrorKind::UtilizationCapExceeded,
            PoolError::Undercollateralized { .. } => ErrorKind::Undercollateralized,
            PoolError::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            PoolError::NothingToClaim(_) => ErrorKind::NothingToClaim,
            PoolError::Transfer(_) => ErrorKind::Transfer,
            PoolError::LockPoisoned | PoolError::InvariantViolated(_) | PoolError::Math(_) => ErrorKind::Internal,
        }
    }
}

impl From<PricingError> for PoolError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::InsufficientLiquidity => PoolError::InsufficientLiquidity,
            PricingError::UtilizationCapExceeded { requested, max } => {
                PoolError::UtilizationCapExceeded { requested, max }
            }
            PricingError::Math(e) => PoolError::Math(e),
            other => PoolError::Pricing(other),
        }
    }
}

impl From<LedgerError> for PoolError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientShares { requested, available } => {
                PoolError::InsufficientShares { requested, available }
            }
            LedgerError::CooldownActive { remaining_secs } => PoolError::CooldownActive { remaining_secs },
            LedgerError::Math(e) => PoolError::Math(e),
            other => PoolError::invalid(other.to_string()),
        }
    }
}

impl From<BookError> for PoolError {
    fn from(err: BookError) -> Self {
        match err {
            BookError::NotFound(id) => PoolError::PositionNotFound(id),
            BookError::NotActive(id) => PoolError::PositionInactive(id),
            BookError::CapacityExceeded { max } => PoolError::CapacityExceeded { max },
            BookError::Math(e) => PoolError::Math(e),
        }
    }
}
