//! Per-buyer purchase, claim and refund record.

use crate::domain::{Identity, PresaleId, Timestamp};
use serde::{Deserialize, Serialize};

/// Cumulative position of one buyer in one presale.
///
/// Claim and refund are mutually exclusive terminal actions: a claimed
/// position is never refunded and a refunded position has no allocation left
/// to claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPosition {
    pub buyer: Identity,
    /// Ledger this position belongs to (non-owning).
    pub presale: PresaleId,
    /// Total quote units transferred in by this buyer.
    pub quote_paid: u64,
    /// Total sale-token base units allocated to this buyer.
    pub tokens_allocated: u64,
    pub first_buy_time: Option<Timestamp>,
    pub last_buy_time: Option<Timestamp>,
    pub purchase_count: u32,
    pub claimed_amount: u64,
    pub claim_time: Option<Timestamp>,
    pub refunded: bool,
    pub created_at: Timestamp,
}

impl UserPosition {
    /// Create a zeroed position.
    pub fn new(presale: PresaleId, buyer: Identity, created_at: Timestamp) -> Self {
        Self {
            buyer,
            presale,
            quote_paid: 0,
            tokens_allocated: 0,
            first_buy_time: None,
            last_buy_time: None,
            purchase_count: 0,
            claimed_amount: 0,
            claim_time: None,
            refunded: false,
            created_at,
        }
    }

    pub fn has_purchased(&self) -> bool {
        self.purchase_count > 0
    }

    pub fn has_claimed(&self) -> bool {
        self.claimed_amount > 0
    }

    /// Allocation not yet delivered to the buyer.
    pub fn claimable(&self) -> u64 {
        self.tokens_allocated.saturating_sub(self.claimed_amount)
    }

    pub fn can_claim(&self) -> bool {
        !self.has_claimed() && !self.refunded && self.tokens_allocated > 0
    }

    pub fn can_refund(&self) -> bool {
        !self.refunded && !self.has_claimed() && self.quote_paid > 0
    }
}
