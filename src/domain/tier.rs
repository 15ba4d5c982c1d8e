//! A single priced capacity band of the sale ladder.

use serde::{Deserialize, Serialize};

/// One pricing tier.
///
/// `capacity == 0` marks the unlimited tail tier, which absorbs any amount at
/// its fixed price. `soft_cap_marker` is advisory and never used in pricing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tier {
    /// Sale-token base units available in this tier (0 = unlimited).
    pub capacity: u64,
    /// Quote units per whole sale token.
    pub price_per_token: u64,
    /// Advisory per-tier soft cap, in quote units.
    pub soft_cap_marker: u64,
    /// Sale-token base units already sold from this tier.
    pub sold: u64,
}

impl Tier {
    /// Create an unsold tier.
    pub fn new(capacity: u64, price_per_token: u64) -> Self {
        Self {
            capacity,
            price_per_token,
            soft_cap_marker: 0,
            sold: 0,
        }
    }

    /// Create the unlimited tail tier.
    pub fn unlimited(price_per_token: u64) -> Self {
        Self::new(0, price_per_token)
    }

    pub fn with_soft_cap_marker(mut self, marker: u64) -> Self {
        self.soft_cap_marker = marker;
        self
    }

    pub fn is_unlimited(&self) -> bool {
        self.capacity == 0
    }

    /// Remaining capacity, or None for the unlimited tier.
    pub fn remaining(&self) -> Option<u64> {
        if self.is_unlimited() {
            None
        } else {
            Some(self.capacity.saturating_sub(self.sold))
        }
    }

    pub fn is_full(&self) -> bool {
        self.remaining() == Some(0)
    }
}
