//! Pure presale engine: tier pricing and the lifecycle state machine.

use crate::domain::{AssetId, Identity, PresaleId};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod ladder;
pub mod lifecycle;

pub use ladder::{Quote, TierLadder};
pub use lifecycle::PresaleEngine;

/// A holder of assets the engine moves value between.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Account {
    /// An external wallet (admin or buyer).
    Wallet(Identity),
    /// Sale-token escrow controlled by the ledger.
    SaleVault(PresaleId),
    /// Quote-currency escrow controlled by the ledger.
    QuoteVault(PresaleId),
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Account::Wallet(id) => write!(f, "wallet:{}", id),
            Account::SaleVault(id) => write!(f, "sale-vault:{}", id),
            Account::QuoteVault(id) => write!(f, "quote-vault:{}", id),
        }
    }
}

/// A value movement the host must apply atomically with the ledger mutation
/// that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: Account,
    pub to: Account,
    pub asset: AssetId,
    pub amount: u64,
}

/// Outcome of an operation that moves a single amount.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Settlement {
    pub amount: u64,
    /// None when the amount is zero.
    pub transfer: Option<Transfer>,
}

impl Settlement {
    fn new(amount: u64, transfer: Transfer) -> Self {
        Self {
            amount,
            transfer: Some(transfer),
        }
    }

    fn nothing() -> Self {
        Self::default()
    }
}

/// Outcome of an accepted purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Purchase {
    pub tokens_filled: u64,
    /// Ladder price of `tokens_filled` (per-tier rounded up).
    pub priced_cost: u64,
    /// Quote units taken from the buyer; `quote_paid - priced_cost` is dust.
    pub quote_paid: u64,
    pub transfer: Transfer,
}
