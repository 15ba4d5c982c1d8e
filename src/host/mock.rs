//! In-memory host capabilities for tests and simulations.

use super::{AssetTransfer, Clock, TransferError};
use crate::domain::{AssetId, Timestamp};
use crate::engine::{Account, Transfer};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

/// Balance book keyed by `(account, asset)`.
///
/// Vault accounts start empty; wallets are funded with `with_balance`.
/// `decline_next` makes the following transfer fail without moving anything.
#[derive(Debug, Default)]
pub struct InMemoryBank {
    balances: Mutex<HashMap<(Account, AssetId), u64>>,
    declined: Mutex<Option<String>>,
    transfers: Mutex<Vec<Transfer>>,
}

impl InMemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` of `asset` to `account`.
    pub fn with_balance(self, account: Account, asset: AssetId, amount: u64) -> Self {
        self.credit(account, asset, amount);
        self
    }

    pub fn credit(&self, account: Account, asset: AssetId, amount: u64) {
        let mut balances = self.balances.lock().unwrap_or_else(|e| e.into_inner());
        let entry = balances.entry((account, asset)).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    pub fn balance_of(&self, account: &Account, asset: &AssetId) -> u64 {
        let balances = self.balances.lock().unwrap_or_else(|e| e.into_inner());
        balances
            .get(&(account.clone(), asset.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Refuse the next transfer with `reason`.
    pub fn decline_next(&self, reason: impl Into<String>) {
        *self.declined.lock().unwrap_or_else(|e| e.into_inner()) = Some(reason.into());
    }

    /// Every transfer applied so far, in order.
    pub fn applied_transfers(&self) -> Vec<Transfer> {
        self.transfers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl AssetTransfer for InMemoryBank {
    async fn transfer(&self, transfer: &Transfer) -> Result<(), TransferError> {
        if let Some(reason) = self
            .declined
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            return Err(TransferError::Declined(reason));
        }

        let mut balances = self.balances.lock().unwrap_or_else(|e| e.into_inner());
        let from_key = (transfer.from.clone(), transfer.asset.clone());
        let to_key = (transfer.to.clone(), transfer.asset.clone());

        let available = balances.get(&from_key).copied().unwrap_or(0);
        if available < transfer.amount {
            return Err(TransferError::InsufficientFunds {
                available,
                requested: transfer.amount,
            });
        }
        let credited = balances
            .get(&to_key)
            .copied()
            .unwrap_or(0)
            .checked_add(transfer.amount)
            .ok_or(TransferError::Overflow)?;

        balances.insert(from_key, available - transfer.amount);
        balances.insert(to_key, credited);
        drop(balances);

        self.transfers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(transfer.clone());
        Ok(())
    }
}

/// Clock whose time is set explicitly.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: AtomicI64::new(now.as_secs()),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.now.store(now.as_secs(), Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.now.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Identity;

    fn wallet(name: &str) -> Account {
        Account::Wallet(Identity::new(name))
    }

    fn usdc() -> AssetId {
        AssetId::new("USDC")
    }

    #[tokio::test]
    async fn test_transfer_moves_balance() {
        let bank = InMemoryBank::new().with_balance(wallet("alice"), usdc(), 100);
        let t = Transfer {
            from: wallet("alice"),
            to: wallet("bob"),
            asset: usdc(),
            amount: 40,
        };
        bank.transfer(&t).await.unwrap();
        assert_eq!(bank.balance_of(&wallet("alice"), &usdc()), 60);
        assert_eq!(bank.balance_of(&wallet("bob"), &usdc()), 40);
        assert_eq!(bank.applied_transfers(), vec![t]);
    }

    #[tokio::test]
    async fn test_transfer_insufficient_funds_moves_nothing() {
        let bank = InMemoryBank::new().with_balance(wallet("alice"), usdc(), 10);
        let t = Transfer {
            from: wallet("alice"),
            to: wallet("bob"),
            asset: usdc(),
            amount: 11,
        };
        let err = bank.transfer(&t).await.unwrap_err();
        assert_eq!(
            err,
            TransferError::InsufficientFunds {
                available: 10,
                requested: 11
            }
        );
        assert_eq!(bank.balance_of(&wallet("alice"), &usdc()), 10);
        assert!(bank.applied_transfers().is_empty());
    }

    #[tokio::test]
    async fn test_decline_next_applies_once() {
        let bank = InMemoryBank::new().with_balance(wallet("alice"), usdc(), 10);
        let t = Transfer {
            from: wallet("alice"),
            to: wallet("bob"),
            asset: usdc(),
            amount: 1,
        };
        bank.decline_next("frozen");
        assert!(matches!(
            bank.transfer(&t).await,
            Err(TransferError::Declined(_))
        ));
        bank.transfer(&t).await.unwrap();
        assert_eq!(bank.balance_of(&wallet("bob"), &usdc()), 1);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(Timestamp::new(100));
        clock.advance(50);
        assert_eq!(clock.now(), Timestamp::new(150));
        clock.set(Timestamp::new(10));
        assert_eq!(clock.now(), Timestamp::new(10));
    }
}
