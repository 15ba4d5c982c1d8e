use crate::domain::Status;
use crate::host::TransferError;
use thiserror::Error;

/// Error returned by every presale operation.
///
/// Every variant is raised before any ledger field is written, so a failed
/// call leaves the ledger and the position exactly as they were.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PresaleError {
    #[error("Caller is not authorized for this operation")]
    Unauthorized,
    #[error("Invalid presale configuration: {0}")]
    InvalidConfig(String),
    #[error("Operation {operation} is not allowed while presale is {status}")]
    NotEligible {
        operation: &'static str,
        status: Status,
    },
    #[error("Record already exists")]
    AlreadyExists,
    #[error("Allocation already claimed")]
    AlreadyClaimed,
    #[error("Purchase already refunded")]
    AlreadyRefunded,
    #[error("Tier ladder cannot supply the requested amount")]
    InsufficientSupply,
    #[error("Purchase would exceed the hardcap")]
    ExceedsHardcap,
    #[error("Arithmetic overflow")]
    Overflow,
    #[error("Transfer failed: {0}")]
    TransferFailed(String),
    #[error("Nothing left to withdraw")]
    NothingToWithdraw,
    #[error("Amount must be greater than zero")]
    InvalidAmount,
    #[error("Nothing to claim")]
    NothingToClaim,
    #[error("Deposit {deposited} is below the hardcap {required}")]
    Undercollateralized { deposited: u64, required: u64 },
    #[error("Time {now} is outside the sale window [{start}, {end}]")]
    OutsideSaleWindow { now: i64, start: i64, end: i64 },
    #[error("Sale window is still open and hardcap not reached")]
    SaleNotOver,
    #[error("Vaults not empty: sale={sale_vault}, quote={quote_vault}")]
    OutstandingBalance { sale_vault: u64, quote_vault: u64 },
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<TransferError> for PresaleError {
    fn from(err: TransferError) -> Self {
        PresaleError::TransferFailed(err.to_string())
    }
}
