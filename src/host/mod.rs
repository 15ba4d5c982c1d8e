//! Capabilities the engine consumes from its host: value transfer and time.

use crate::domain::Timestamp;
use crate::engine::Transfer;
use async_trait::async_trait;
use std::fmt;

pub mod mock;

pub use mock::{InMemoryBank, ManualClock};

/// Asset-transfer capability.
///
/// Called only after the engine has accepted an operation. Implementations
/// must either apply the whole transfer or none of it; an error makes the
/// caller discard the ledger mutation that produced the transfer.
#[async_trait]
pub trait AssetTransfer: Send + Sync + fmt::Debug {
    async fn transfer(&self, transfer: &Transfer) -> Result<(), TransferError>;
}

/// Source of the current time, read once per operation.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time in whole seconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::new(chrono::Utc::now().timestamp())
    }
}

/// Error type for transfer operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// Source account holds less than the transfer amount
    InsufficientFunds { available: u64, requested: u64 },
    /// Destination balance would overflow
    Overflow,
    /// Host refused the transfer (frozen account, missing signature, ...)
    Declined(String),
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::InsufficientFunds {
                available,
                requested,
            } => write!(
                f,
                "Insufficient funds: available {}, requested {}",
                available, requested
            ),
            TransferError::Overflow => write!(f, "Balance overflow"),
            TransferError::Declined(msg) => write!(f, "Transfer declined: {}", msg),
        }
    }
}

impl std::error::Error for TransferError {}
