//! Presale lifecycle: `Configured -> Active -> Ended(Success|Failed) -> Closed`.
//!
//! Every operation validates all preconditions and computes every new value
//! with checked arithmetic before writing a single field. A returned error
//! therefore guarantees the ledger and position are unchanged.

use crate::config::EngineConfig;
use crate::domain::{
    AssetId, Identity, PresaleId, PresaleLedger, PresaleParams, SaleOutcome, Status, Timestamp,
    UserPosition,
};
use crate::error::PresaleError;
use tracing::info;

use super::{Account, Purchase, Settlement, TierLadder, Transfer};

/// Stateless operation set over `PresaleLedger` and `UserPosition`.
#[derive(Debug, Clone, Default)]
pub struct PresaleEngine {
    config: EngineConfig,
}

impl PresaleEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create a ledger in `Configured`.
    ///
    /// Tier price ordering is not checked: tiers are consumed in listed order,
    /// so a descending ladder sells its expensive tier first.
    pub fn init_presale(
        &self,
        admin: &Identity,
        params: PresaleParams,
        now: Timestamp,
    ) -> Result<PresaleLedger, PresaleError> {
        if params.softcap > params.hardcap {
            return Err(PresaleError::InvalidConfig(format!(
                "softcap {} exceeds hardcap {}",
                params.softcap, params.hardcap
            )));
        }
        if params.hardcap == 0 {
            return Err(PresaleError::InvalidConfig("hardcap must be positive".into()));
        }
        if params.start_time >= params.end_time {
            return Err(PresaleError::InvalidConfig(format!(
                "start time {} must precede end time {}",
                params.start_time, params.end_time
            )));
        }
        if params.sale_token_mint == params.quote_mint {
            return Err(PresaleError::InvalidConfig(
                "sale token and quote currency must differ".into(),
            ));
        }
        if params.tiers.iter().any(|t| t.sold != 0) {
            return Err(PresaleError::InvalidConfig("tiers must start unsold".into()));
        }

        let ladder = TierLadder::new(
            params.tiers,
            self.config.price_scale(),
            self.config.max_tiers,
        )?;
        let id = PresaleId::derive(admin, params.seed);

        info!(presale = %id, admin = %admin, hardcap = params.hardcap, softcap = params.softcap, tiers = ladder.tiers().len(), "presale initialized");

        Ok(PresaleLedger {
            id,
            seed: params.seed,
            admin: admin.clone(),
            sale_token_mint: params.sale_token_mint,
            quote_mint: params.quote_mint,
            softcap: params.softcap,
            hardcap: params.hardcap,
            deposited_sale_tokens: 0,
            total_sold: 0,
            ladder,
            start_time: params.start_time,
            end_time: params.end_time,
            status: Status::Configured,
            sale_vault: 0,
            quote_vault: 0,
            total_quote_raised: 0,
            total_claimed: 0,
            total_refunded: 0,
            sale_swept: false,
            quote_swept: false,
            buyer_count: 0,
            created_at: now,
            activated_at: None,
            ended_at: None,
        })
    }

    /// Move `amount` sale tokens from the admin into escrow. Repeatable.
    pub fn deposit_token(
        &self,
        ledger: &mut PresaleLedger,
        caller: &Identity,
        amount: u64,
    ) -> Result<Settlement, PresaleError> {
        require_admin(ledger, caller)?;
        require_status(ledger, "deposit_token", |s| {
            matches!(s, Status::Configured | Status::Active)
        })?;
        if amount == 0 {
            return Err(PresaleError::InvalidAmount);
        }

        let deposited = checked_add(ledger.deposited_sale_tokens, amount)?;
        let sale_vault = checked_add(ledger.sale_vault, amount)?;

        ledger.deposited_sale_tokens = deposited;
        ledger.sale_vault = sale_vault;

        info!(presale = %ledger.id, amount, deposited, "sale tokens deposited");

        Ok(Settlement::new(
            amount,
            Transfer {
                from: Account::Wallet(caller.clone()),
                to: Account::SaleVault(ledger.id.clone()),
                asset: ledger.sale_token_mint.clone(),
                amount,
            },
        ))
    }

    /// Open the sale. Independent of `start_time`; the window is enforced by
    /// `buy_tokens`.
    pub fn start_presale(
        &self,
        ledger: &mut PresaleLedger,
        caller: &Identity,
        now: Timestamp,
    ) -> Result<(), PresaleError> {
        require_admin(ledger, caller)?;
        require_status(ledger, "start_presale", |s| s == Status::Configured)?;
        if ledger.deposited_sale_tokens < ledger.hardcap {
            return Err(PresaleError::Undercollateralized {
                deposited: ledger.deposited_sale_tokens,
                required: ledger.hardcap,
            });
        }

        ledger.status = Status::Active;
        ledger.activated_at = Some(now);

        info!(presale = %ledger.id, "presale started");
        Ok(())
    }

    /// Create a zeroed position for `buyer`. Uniqueness of the
    /// `(presale, buyer)` pair is enforced by whoever stores positions.
    pub fn init_user(
        &self,
        ledger: &PresaleLedger,
        buyer: &Identity,
        now: Timestamp,
    ) -> Result<UserPosition, PresaleError> {
        require_status(ledger, "init_user", |s| s != Status::Closed)?;
        Ok(UserPosition::new(ledger.id.clone(), buyer.clone(), now))
    }

    /// Spend `quote_amount` on as many tokens as the ladder yields.
    ///
    /// The whole `quote_amount` is taken; a sub-unit remainder in the last
    /// tier touched stays in the quote vault and counts toward `quote_paid`.
    /// Requests that would pass the hardcap or exhaust the ladder are rejected
    /// outright instead of being truncated.
    pub fn buy_tokens(
        &self,
        ledger: &mut PresaleLedger,
        position: &mut UserPosition,
        buyer: &Identity,
        quote_amount: u64,
        now: Timestamp,
    ) -> Result<Purchase, PresaleError> {
        require_owner(ledger, position, buyer)?;
        require_status(ledger, "buy_tokens", |s| s == Status::Active)?;
        if quote_amount == 0 {
            return Err(PresaleError::InvalidAmount);
        }
        if !ledger.in_sale_window(now) {
            return Err(PresaleError::OutsideSaleWindow {
                now: now.as_secs(),
                start: ledger.start_time.as_secs(),
                end: ledger.end_time.as_secs(),
            });
        }

        let headroom = ledger
            .hardcap
            .checked_sub(ledger.total_sold)
            .ok_or(PresaleError::Overflow)?;
        let quote = ledger
            .ladder
            .fill_budget(ledger.total_sold, quote_amount, headroom)?;

        let total_sold = checked_add(ledger.total_sold, quote.tokens_filled)?;
        let quote_vault = checked_add(ledger.quote_vault, quote_amount)?;
        let total_quote_raised = checked_add(ledger.total_quote_raised, quote_amount)?;
        let buyer_count = if position.has_purchased() {
            ledger.buyer_count
        } else {
            checked_add(ledger.buyer_count, 1)?
        };
        let quote_paid = checked_add(position.quote_paid, quote_amount)?;
        let tokens_allocated = checked_add(position.tokens_allocated, quote.tokens_filled)?;
        let purchase_count = position
            .purchase_count
            .checked_add(1)
            .ok_or(PresaleError::Overflow)?;

        ledger.ladder = quote.ladder;
        ledger.total_sold = total_sold;
        ledger.quote_vault = quote_vault;
        ledger.total_quote_raised = total_quote_raised;
        ledger.buyer_count = buyer_count;
        position.quote_paid = quote_paid;
        position.tokens_allocated = tokens_allocated;
        position.purchase_count = purchase_count;
        position.first_buy_time.get_or_insert(now);
        position.last_buy_time = Some(now);

        info!(
            presale = %ledger.id,
            buyer = %buyer,
            quote_amount,
            tokens = quote.tokens_filled,
            priced_cost = quote.quote_cost,
            total_sold,
            "tokens purchased"
        );

        Ok(Purchase {
            tokens_filled: quote.tokens_filled,
            priced_cost: quote.quote_cost,
            quote_paid: quote_amount,
            transfer: Transfer {
                from: Account::Wallet(buyer.clone()),
                to: Account::QuoteVault(ledger.id.clone()),
                asset: ledger.quote_mint.clone(),
                amount: quote_amount,
            },
        })
    }

    /// Close the sale window and fix the outcome.
    ///
    /// Allowed after `end_time` has passed, or earlier once the hardcap is
    /// fully sold. Reaching the softcap exactly counts as success.
    pub fn end_presale(
        &self,
        ledger: &mut PresaleLedger,
        caller: &Identity,
        now: Timestamp,
    ) -> Result<SaleOutcome, PresaleError> {
        require_admin(ledger, caller)?;
        require_status(ledger, "end_presale", |s| s == Status::Active)?;
        if now <= ledger.end_time && !ledger.hardcap_reached() {
            return Err(PresaleError::SaleNotOver);
        }

        let outcome = if ledger.softcap_reached() {
            SaleOutcome::Success
        } else {
            SaleOutcome::Failed
        };
        ledger.status = Status::Ended(outcome);
        ledger.ended_at = Some(now);

        info!(presale = %ledger.id, %outcome, total_sold = ledger.total_sold, softcap = ledger.softcap, "presale ended");
        Ok(outcome)
    }

    /// Deliver the buyer's full allocation. Single claim, no vesting.
    pub fn claim_token(
        &self,
        ledger: &mut PresaleLedger,
        position: &mut UserPosition,
        buyer: &Identity,
        now: Timestamp,
    ) -> Result<Settlement, PresaleError> {
        require_owner(ledger, position, buyer)?;
        require_status(ledger, "claim_token", |s| {
            s == Status::Ended(SaleOutcome::Success)
        })?;
        if position.has_claimed() {
            return Err(PresaleError::AlreadyClaimed);
        }
        if position.refunded {
            return Err(PresaleError::AlreadyRefunded);
        }
        let amount = position.claimable();
        if amount == 0 {
            return Err(PresaleError::NothingToClaim);
        }

        let sale_vault = checked_sub(ledger.sale_vault, amount)?;
        let total_claimed = checked_add(ledger.total_claimed, amount)?;

        ledger.sale_vault = sale_vault;
        ledger.total_claimed = total_claimed;
        position.claimed_amount = position.tokens_allocated;
        position.claim_time = Some(now);

        info!(presale = %ledger.id, buyer = %buyer, amount, "allocation claimed");

        Ok(Settlement::new(
            amount,
            Transfer {
                from: Account::SaleVault(ledger.id.clone()),
                to: Account::Wallet(buyer.clone()),
                asset: ledger.sale_token_mint.clone(),
                amount,
            },
        ))
    }

    /// Return everything the buyer paid and void their allocation.
    pub fn refund(
        &self,
        ledger: &mut PresaleLedger,
        position: &mut UserPosition,
        buyer: &Identity,
    ) -> Result<Settlement, PresaleError> {
        require_owner(ledger, position, buyer)?;
        require_status(ledger, "refund", |s| s == Status::Ended(SaleOutcome::Failed))?;
        if position.refunded {
            return Err(PresaleError::AlreadyRefunded);
        }
        if position.has_claimed() {
            return Err(PresaleError::AlreadyClaimed);
        }
        let amount = position.quote_paid;
        if amount == 0 {
            return Err(PresaleError::NothingToClaim);
        }

        let quote_vault = checked_sub(ledger.quote_vault, amount)?;
        let total_refunded = checked_add(ledger.total_refunded, amount)?;

        ledger.quote_vault = quote_vault;
        ledger.total_refunded = total_refunded;
        position.refunded = true;
        position.tokens_allocated = 0;

        info!(presale = %ledger.id, buyer = %buyer, amount, "purchase refunded");

        Ok(Settlement::new(
            amount,
            Transfer {
                from: Account::QuoteVault(ledger.id.clone()),
                to: Account::Wallet(buyer.clone()),
                asset: ledger.quote_mint.clone(),
                amount,
            },
        ))
    }

    /// Sweep unsold sale tokens to the admin after a successful sale.
    pub fn withdraw_token(
        &self,
        ledger: &mut PresaleLedger,
        caller: &Identity,
    ) -> Result<Settlement, PresaleError> {
        require_admin(ledger, caller)?;
        require_status(ledger, "withdraw_token", |s| {
            s == Status::Ended(SaleOutcome::Success)
        })?;
        if ledger.sale_swept {
            return Err(PresaleError::NothingToWithdraw);
        }

        let amount = checked_sub(ledger.deposited_sale_tokens, ledger.total_sold)?;
        let sale_vault = checked_sub(ledger.sale_vault, amount)?;

        ledger.sale_vault = sale_vault;
        ledger.sale_swept = true;

        info!(presale = %ledger.id, amount, "unsold tokens withdrawn");
        Ok(sweep_to_admin(
            ledger,
            Account::SaleVault(ledger.id.clone()),
            ledger.sale_token_mint.clone(),
            amount,
        ))
    }

    /// Sweep collected quote proceeds to the admin after a successful sale.
    pub fn withdraw_usd(
        &self,
        ledger: &mut PresaleLedger,
        caller: &Identity,
    ) -> Result<Settlement, PresaleError> {
        require_admin(ledger, caller)?;
        require_status(ledger, "withdraw_usd", |s| {
            s == Status::Ended(SaleOutcome::Success)
        })?;
        if ledger.quote_swept {
            return Err(PresaleError::NothingToWithdraw);
        }

        let amount = ledger.quote_vault;
        ledger.quote_vault = 0;
        ledger.quote_swept = true;

        info!(presale = %ledger.id, amount, "proceeds withdrawn");
        Ok(sweep_to_admin(
            ledger,
            Account::QuoteVault(ledger.id.clone()),
            ledger.quote_mint.clone(),
            amount,
        ))
    }

    /// Return the whole sale-token deposit to the admin after a failed sale.
    pub fn reclaim_deposit(
        &self,
        ledger: &mut PresaleLedger,
        caller: &Identity,
    ) -> Result<Settlement, PresaleError> {
        require_admin(ledger, caller)?;
        require_status(ledger, "reclaim_deposit", |s| {
            s == Status::Ended(SaleOutcome::Failed)
        })?;
        if ledger.sale_swept {
            return Err(PresaleError::NothingToWithdraw);
        }

        let amount = ledger.sale_vault;
        ledger.sale_vault = 0;
        ledger.sale_swept = true;

        info!(presale = %ledger.id, amount, "deposit reclaimed");
        Ok(sweep_to_admin(
            ledger,
            Account::SaleVault(ledger.id.clone()),
            ledger.sale_token_mint.clone(),
            amount,
        ))
    }

    /// Mark an ended sale `Closed` once both vaults are empty. Terminal.
    pub fn close_presale(
        &self,
        ledger: &mut PresaleLedger,
        caller: &Identity,
    ) -> Result<(), PresaleError> {
        require_admin(ledger, caller)?;
        require_status(ledger, "close_presale", |s| matches!(s, Status::Ended(_)))?;
        if ledger.sale_vault != 0 || ledger.quote_vault != 0 {
            return Err(PresaleError::OutstandingBalance {
                sale_vault: ledger.sale_vault,
                quote_vault: ledger.quote_vault,
            });
        }

        ledger.status = Status::Closed;

        info!(presale = %ledger.id, "presale closed");
        Ok(())
    }
}

fn sweep_to_admin(ledger: &PresaleLedger, from: Account, asset: AssetId, amount: u64) -> Settlement {
    if amount == 0 {
        return Settlement::nothing();
    }
    Settlement::new(
        amount,
        Transfer {
            from,
            to: Account::Wallet(ledger.admin.clone()),
            asset,
            amount,
        },
    )
}

fn require_admin(ledger: &PresaleLedger, caller: &Identity) -> Result<(), PresaleError> {
    if ledger.is_admin(caller) {
        Ok(())
    } else {
        Err(PresaleError::Unauthorized)
    }
}

fn require_owner(
    ledger: &PresaleLedger,
    position: &UserPosition,
    buyer: &Identity,
) -> Result<(), PresaleError> {
    if &position.buyer == buyer && position.presale == ledger.id {
        Ok(())
    } else {
        Err(PresaleError::Unauthorized)
    }
}

fn require_status(
    ledger: &PresaleLedger,
    operation: &'static str,
    allowed: impl Fn(Status) -> bool,
) -> Result<(), PresaleError> {
    if allowed(ledger.status) {
        Ok(())
    } else {
        Err(PresaleError::NotEligible {
            operation,
            status: ledger.status,
        })
    }
}

fn checked_add(a: u64, b: u64) -> Result<u64, PresaleError> {
    a.checked_add(b).ok_or(PresaleError::Overflow)
}

fn checked_sub(a: u64, b: u64) -> Result<u64, PresaleError> {
    a.checked_sub(b).ok_or(PresaleError::Overflow)
}
