//! Tier ladder pricing.
//!
//! A purchase may span several tiers at different unit prices. Each tier's
//! contribution is rounded up independently (in the seller's favour), so
//! repeated partial fills never accumulate rounding drift in the buyer's
//! favour.

use crate::domain::Tier;
use crate::error::PresaleError;
use serde::{Deserialize, Serialize};

/// Ordered list of pricing tiers, consumed strictly in listed order.
///
/// Deserialization goes through `TierLadder::new`, so a stored ladder is
/// validated exactly like a freshly configured one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawLadder")]
pub struct TierLadder {
    tiers: Vec<Tier>,
    /// Base units per whole sale token.
    price_scale: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLadder {
    tiers: Vec<Tier>,
    price_scale: u64,
}

impl TryFrom<RawLadder> for TierLadder {
    type Error = PresaleError;

    fn try_from(raw: RawLadder) -> Result<Self, Self::Error> {
        // The tier limit is a configuration policy, not a ladder invariant.
        TierLadder::new(raw.tiers, raw.price_scale, usize::MAX)
    }
}

/// Result of pricing a purchase against the ladder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    /// Sum of the per-tier costs, each rounded up.
    pub quote_cost: u64,
    pub tokens_filled: u64,
    /// The ladder with the purchase applied to each tier's `sold`.
    pub ladder: TierLadder,
}

impl TierLadder {
    /// Build a validated ladder.
    ///
    /// Rejects an empty ladder, more than `max_tiers` tiers, zero prices, an
    /// unlimited tier anywhere but last, and tiers sold past their capacity.
    pub fn new(tiers: Vec<Tier>, price_scale: u64, max_tiers: usize) -> Result<Self, PresaleError> {
        if tiers.is_empty() {
            return Err(PresaleError::InvalidConfig("tier ladder is empty".into()));
        }
        if tiers.len() > max_tiers {
            return Err(PresaleError::InvalidConfig(format!(
                "tier ladder has {} tiers, at most {} allowed",
                tiers.len(),
                max_tiers
            )));
        }
        if price_scale == 0 {
            return Err(PresaleError::InvalidConfig("price scale must be positive".into()));
        }

        let last = tiers.len() - 1;
        let mut finite_capacity: u64 = 0;
        for (i, tier) in tiers.iter().enumerate() {
            if tier.price_per_token == 0 {
                return Err(PresaleError::InvalidConfig(format!("tier {} has zero price", i)));
            }
            if tier.is_unlimited() {
                if i != last {
                    return Err(PresaleError::InvalidConfig(format!(
                        "tier {} is unlimited but not last",
                        i
                    )));
                }
                continue;
            }
            if tier.sold > tier.capacity {
                return Err(PresaleError::InvalidConfig(format!(
                    "tier {} sold {} exceeds capacity {}",
                    i, tier.sold, tier.capacity
                )));
            }
            finite_capacity = finite_capacity
                .checked_add(tier.capacity)
                .ok_or_else(|| PresaleError::InvalidConfig("total tier capacity overflows".into()))?;
        }

        Ok(Self { tiers, price_scale })
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn price_scale(&self) -> u64 {
        self.price_scale
    }

    /// Sum of every tier's `sold`.
    pub fn total_sold(&self) -> Result<u64, PresaleError> {
        self.tiers.iter().try_fold(0u64, |acc, tier| {
            acc.checked_add(tier.sold).ok_or(PresaleError::Overflow)
        })
    }

    /// Total sellable capacity, or None when the ladder ends in an unlimited tier.
    pub fn total_capacity(&self) -> Option<u64> {
        if self.tiers.last().map_or(false, Tier::is_unlimited) {
            return None;
        }
        // Every ladder, deserialized ones included, passed the overflow check in `new`.
        Some(self.tiers.iter().map(|t| t.capacity).sum())
    }

    /// Index of the first tier that still has capacity.
    pub fn current_tier(&self) -> Option<usize> {
        self.tiers.iter().position(|t| !t.is_full())
    }

    /// Quote units owed for `tokens` base units at `tier`'s price.
    pub fn cost_of(&self, tier: &Tier, tokens: u64) -> Result<u64, PresaleError> {
        tier_cost(tier.price_per_token, tokens, self.price_scale)
    }

    /// Locate the tier containing `already_sold` and the offset into it.
    ///
    /// Returns `tiers.len()` when every finite tier is full.
    fn locate(&self, already_sold: u64) -> (usize, u64) {
        let mut before: u64 = 0;
        for (i, tier) in self.tiers.iter().enumerate() {
            if tier.is_unlimited() {
                return (i, already_sold - before);
            }
            let after = before + tier.capacity;
            if already_sold < after {
                return (i, already_sold - before);
            }
            before = after;
        }
        (self.tiers.len(), 0)
    }

    /// Price `tokens_requested` base units starting at `already_sold`.
    ///
    /// All-or-nothing: if the ladder cannot supply the full request the call
    /// fails with `InsufficientSupply` and `self` is untouched.
    pub fn quote(&self, already_sold: u64, tokens_requested: u64) -> Result<Quote, PresaleError> {
        let (start, mut offset) = self.locate(already_sold);
        let scale = self.price_scale;
        let mut ladder = self.clone();
        let mut remaining = tokens_requested;
        let mut quote_cost: u64 = 0;

        for tier in ladder.tiers.iter_mut().skip(start) {
            if remaining == 0 {
                break;
            }
            let available = if tier.is_unlimited() {
                remaining
            } else {
                tier.capacity - offset
            };
            offset = 0;

            let take = available.min(remaining);
            quote_cost = quote_cost
                .checked_add(tier_cost(tier.price_per_token, take, scale)?)
                .ok_or(PresaleError::Overflow)?;
            tier.sold = tier.sold.checked_add(take).ok_or(PresaleError::Overflow)?;
            remaining -= take;
        }

        if remaining > 0 {
            return Err(PresaleError::InsufficientSupply);
        }

        Ok(Quote {
            quote_cost,
            tokens_filled: tokens_requested,
            ladder,
        })
    }

    /// Find the most tokens `budget` quote units can buy starting at
    /// `already_sold`, never filling more than `headroom`.
    ///
    /// Tiers are filled in order; the walk moves to the next tier only once
    /// the current one is exhausted. A remainder smaller than one base unit's
    /// price in the final tier is left unspent in `budget - quote_cost`.
    pub fn fill_budget(
        &self,
        already_sold: u64,
        budget: u64,
        headroom: u64,
    ) -> Result<Quote, PresaleError> {
        if budget == 0 {
            return Err(PresaleError::InvalidAmount);
        }

        let (start, mut offset) = self.locate(already_sold);
        let scale = self.price_scale;
        let mut ladder = self.clone();
        let mut budget_left = budget;
        let mut tokens_filled: u64 = 0;
        let mut quote_cost: u64 = 0;
        let mut stopped_inside_tier = false;

        for tier in ladder.tiers.iter_mut().skip(start) {
            if budget_left == 0 {
                break;
            }
            let affordable = affordable_tokens(tier.price_per_token, budget_left, scale);
            let capacity_left = tier.remaining().map(|_| tier.capacity - offset);
            offset = 0;

            let (take, exhausts_tier) = match capacity_left {
                Some(left) if affordable >= u128::from(left) => (left, true),
                // More than u64 units can never fit under a u64 headroom.
                _ => (
                    u64::try_from(affordable).map_err(|_| PresaleError::ExceedsHardcap)?,
                    false,
                ),
            };

            let filled_after = tokens_filled
                .checked_add(take)
                .ok_or(PresaleError::Overflow)?;
            if filled_after > headroom {
                return Err(PresaleError::ExceedsHardcap);
            }

            let cost = tier_cost(tier.price_per_token, take, scale)?;
            budget_left = budget_left.checked_sub(cost).ok_or(PresaleError::Overflow)?;
            quote_cost = quote_cost.checked_add(cost).ok_or(PresaleError::Overflow)?;
            tier.sold = tier.sold.checked_add(take).ok_or(PresaleError::Overflow)?;
            tokens_filled = filled_after;

            if !exhausts_tier {
                stopped_inside_tier = true;
                break;
            }
        }

        if !stopped_inside_tier && budget_left > 0 {
            // The finite ladder ran out. A remainder that could not buy one
            // more base unit at the final price is dust, as inside a tier.
            let last_price = ladder.tiers.last().map_or(0, |t| t.price_per_token);
            if tokens_filled == 0 || affordable_tokens(last_price, budget_left, scale) > 0 {
                return Err(PresaleError::InsufficientSupply);
            }
        }
        if tokens_filled == 0 {
            return Err(PresaleError::InvalidAmount);
        }

        Ok(Quote {
            quote_cost,
            tokens_filled,
            ladder,
        })
    }
}

/// `ceil(tokens * price / scale)`.
fn tier_cost(price: u64, tokens: u64, scale: u64) -> Result<u64, PresaleError> {
    let scale = u128::from(scale);
    let numerator = u128::from(tokens) * u128::from(price);
    let cost = (numerator + scale - 1) / scale;
    u64::try_from(cost).map_err(|_| PresaleError::Overflow)
}

/// `floor(budget * scale / price)`; the largest amount whose rounded-up cost
/// fits in `budget`.
fn affordable_tokens(price: u64, budget: u64, scale: u64) -> u128 {
    u128::from(budget) * u128::from(scale) / u128::from(price)
}
