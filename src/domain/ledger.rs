//! The aggregate sale record and its lifecycle status.

use crate::domain::{AssetId, Identity, PresaleId, Tier, Timestamp};
use crate::engine::TierLadder;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How an ended sale resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleOutcome {
    /// Softcap reached: buyers claim, admin sweeps proceeds.
    Success,
    /// Softcap missed: buyers refund, admin reclaims the deposit.
    Failed,
}

impl fmt::Display for SaleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaleOutcome::Success => write!(f, "success"),
            SaleOutcome::Failed => write!(f, "failed"),
        }
    }
}

/// Lifecycle status of a presale ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Configured,
    Active,
    Ended(SaleOutcome),
    Closed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Configured => write!(f, "configured"),
            Status::Active => write!(f, "active"),
            Status::Ended(outcome) => write!(f, "ended({})", outcome),
            Status::Closed => write!(f, "closed"),
        }
    }
}

/// Admin-supplied parameters for a new presale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresaleParams {
    /// Admin-chosen discriminator; one admin may run many sales.
    pub seed: u64,
    pub sale_token_mint: AssetId,
    pub quote_mint: AssetId,
    /// Minimum sale-token units sold for the sale to succeed.
    pub softcap: u64,
    /// Maximum sale-token units sellable.
    pub hardcap: u64,
    /// Tiers in consumption order. Prices are not required to ascend.
    pub tiers: Vec<Tier>,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
}

/// The aggregate presale record.
///
/// `sale_vault` and `quote_vault` are the logical escrow balances; after every
/// accepted operation they equal what the host's vault accounts hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresaleLedger {
    pub id: PresaleId,
    pub seed: u64,
    pub admin: Identity,
    pub sale_token_mint: AssetId,
    pub quote_mint: AssetId,
    pub softcap: u64,
    pub hardcap: u64,
    pub deposited_sale_tokens: u64,
    pub total_sold: u64,
    pub ladder: TierLadder,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub status: Status,

    pub sale_vault: u64,
    pub quote_vault: u64,
    pub total_quote_raised: u64,
    pub total_claimed: u64,
    pub total_refunded: u64,
    pub sale_swept: bool,
    pub quote_swept: bool,
    pub buyer_count: u64,
    pub created_at: Timestamp,
    pub activated_at: Option<Timestamp>,
    pub ended_at: Option<Timestamp>,
}

impl PresaleLedger {
    pub fn is_admin(&self, who: &Identity) -> bool {
        &self.admin == who
    }

    pub fn softcap_reached(&self) -> bool {
        self.total_sold >= self.softcap
    }

    pub fn hardcap_reached(&self) -> bool {
        self.total_sold >= self.hardcap
    }

    /// Sale-token units still sellable before the hardcap.
    pub fn hardcap_headroom(&self) -> u64 {
        self.hardcap.saturating_sub(self.total_sold)
    }

    /// Deposited sale tokens not allocated to any buyer.
    pub fn unsold_tokens(&self) -> u64 {
        self.deposited_sale_tokens.saturating_sub(self.total_sold)
    }

    /// Inclusive `[start_time, end_time]` check.
    pub fn in_sale_window(&self, now: Timestamp) -> bool {
        now >= self.start_time && now <= self.end_time
    }

    pub fn outcome(&self) -> Option<SaleOutcome> {
        match self.status {
            Status::Ended(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Index of the tier the next purchase starts in.
    pub fn current_tier(&self) -> Option<usize> {
        self.ladder.current_tier()
    }

    /// Check the accounting invariants, returning a description of the first
    /// violation found.
    pub fn check_invariants(&self) -> Result<(), String> {
        let tier_sum = self
            .ladder
            .total_sold()
            .map_err(|_| "tier sold counters overflow".to_string())?;
        if tier_sum != self.total_sold {
            return Err(format!(
                "sum of tier sold {} != total_sold {}",
                tier_sum, self.total_sold
            ));
        }
        if self.total_sold > self.hardcap {
            return Err(format!(
                "total_sold {} exceeds hardcap {}",
                self.total_sold, self.hardcap
            ));
        }
        if self.status != Status::Configured && self.deposited_sale_tokens < self.total_sold {
            return Err(format!(
                "deposited {} below total_sold {}",
                self.deposited_sale_tokens, self.total_sold
            ));
        }
        if self.start_time >= self.end_time {
            return Err("start_time must precede end_time".to_string());
        }
        let expected_quote = self
            .total_quote_raised
            .checked_sub(self.total_refunded)
            .ok_or_else(|| "refunded more than raised".to_string())?;
        if !self.quote_swept && self.quote_vault != expected_quote {
            return Err(format!(
                "quote vault {} != raised minus refunded {}",
                self.quote_vault, expected_quote
            ));
        }
        if self.quote_swept && self.quote_vault != 0 {
            return Err(format!("quote vault {} after sweep", self.quote_vault));
        }
        Ok(())
    }
}
