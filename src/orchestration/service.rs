use crate::domain::{
    Identity, PresaleId, PresaleLedger, PresaleParams, SaleOutcome, Timestamp, UserPosition,
};
use crate::engine::{PresaleEngine, Purchase, Settlement, Transfer};
use crate::error::PresaleError;
use crate::host::{AssetTransfer, Clock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// A ledger together with every position scoped to it.
///
/// Positions live next to their ledger so that buyer updates and the shared
/// ledger counters serialize on the same lock.
#[derive(Debug)]
struct LedgerSlot {
    ledger: PresaleLedger,
    positions: HashMap<Identity, UserPosition>,
}

/// Registry of presale ledgers with commit-or-abort execution.
///
/// Each operation holds its ledger's mutex for its whole duration, runs the
/// engine on a working copy, performs the resulting transfer and only then
/// writes the copy back. A rejected operation or a failed transfer leaves the
/// stored ledger and positions untouched. Different ledgers never contend.
pub struct PresaleService {
    engine: PresaleEngine,
    bank: Arc<dyn AssetTransfer>,
    clock: Arc<dyn Clock>,
    ledgers: RwLock<HashMap<PresaleId, Arc<Mutex<LedgerSlot>>>>,
}

impl PresaleService {
    pub fn new(engine: PresaleEngine, bank: Arc<dyn AssetTransfer>, clock: Arc<dyn Clock>) -> Self {
        Self {
            engine,
            bank,
            clock,
            ledgers: RwLock::new(HashMap::new()),
        }
    }

    /// Create a ledger addressed by `(admin, params.seed)`.
    pub async fn create_presale(
        &self,
        admin: &Identity,
        params: PresaleParams,
    ) -> Result<PresaleId, PresaleError> {
        let ledger = self
            .engine
            .init_presale(admin, params, self.clock.now())
            .map_err(|e| rejected("init_presale", None, e))?;

        let mut ledgers = self.ledgers.write().await;
        if ledgers.contains_key(&ledger.id) {
            return Err(rejected(
                "init_presale",
                Some(&ledger.id),
                PresaleError::AlreadyExists,
            ));
        }
        let id = ledger.id.clone();
        ledgers.insert(
            id.clone(),
            Arc::new(Mutex::new(LedgerSlot {
                ledger,
                positions: HashMap::new(),
            })),
        );
        Ok(id)
    }

    pub async fn deposit_token(
        &self,
        id: &PresaleId,
        caller: &Identity,
        amount: u64,
    ) -> Result<Settlement, PresaleError> {
        self.commit_ledger(id, "deposit_token", |engine, ledger, _now| {
            let settlement = engine.deposit_token(ledger, caller, amount)?;
            let transfer = settlement.transfer.clone();
            Ok((settlement, transfer))
        })
        .await
    }

    pub async fn start_presale(&self, id: &PresaleId, caller: &Identity) -> Result<(), PresaleError> {
        self.commit_ledger(id, "start_presale", |engine, ledger, now| {
            engine.start_presale(ledger, caller, now)?;
            Ok(((), None))
        })
        .await
    }

    /// Create the position for `(id, buyer)`; a second call fails `AlreadyExists`.
    pub async fn init_user(
        &self,
        id: &PresaleId,
        buyer: &Identity,
    ) -> Result<UserPosition, PresaleError> {
        let slot = self.slot(id).await?;
        let mut slot = slot.lock().await;
        if slot.positions.contains_key(buyer) {
            return Err(rejected("init_user", Some(id), PresaleError::AlreadyExists));
        }
        let position = self
            .engine
            .init_user(&slot.ledger, buyer, self.clock.now())
            .map_err(|e| rejected("init_user", Some(id), e))?;
        slot.positions.insert(buyer.clone(), position.clone());
        Ok(position)
    }

    pub async fn buy_tokens(
        &self,
        id: &PresaleId,
        buyer: &Identity,
        quote_amount: u64,
    ) -> Result<Purchase, PresaleError> {
        self.commit_position(id, buyer, "buy_tokens", |engine, ledger, position, now| {
            let purchase = engine.buy_tokens(ledger, position, buyer, quote_amount, now)?;
            let transfer = purchase.transfer.clone();
            Ok((purchase, Some(transfer)))
        })
        .await
    }

    pub async fn end_presale(
        &self,
        id: &PresaleId,
        caller: &Identity,
    ) -> Result<SaleOutcome, PresaleError> {
        self.commit_ledger(id, "end_presale", |engine, ledger, now| {
            let outcome = engine.end_presale(ledger, caller, now)?;
            Ok((outcome, None))
        })
        .await
    }

    pub async fn claim_token(
        &self,
        id: &PresaleId,
        buyer: &Identity,
    ) -> Result<Settlement, PresaleError> {
        self.commit_position(id, buyer, "claim_token", |engine, ledger, position, now| {
            let settlement = engine.claim_token(ledger, position, buyer, now)?;
            let transfer = settlement.transfer.clone();
            Ok((settlement, transfer))
        })
        .await
    }

    pub async fn refund(&self, id: &PresaleId, buyer: &Identity) -> Result<Settlement, PresaleError> {
        self.commit_position(id, buyer, "refund", |engine, ledger, position, _now| {
            let settlement = engine.refund(ledger, position, buyer)?;
            let transfer = settlement.transfer.clone();
            Ok((settlement, transfer))
        })
        .await
    }

    pub async fn withdraw_token(
        &self,
        id: &PresaleId,
        caller: &Identity,
    ) -> Result<Settlement, PresaleError> {
        self.commit_ledger(id, "withdraw_token", |engine, ledger, _now| {
            let settlement = engine.withdraw_token(ledger, caller)?;
            let transfer = settlement.transfer.clone();
            Ok((settlement, transfer))
        })
        .await
    }

    pub async fn withdraw_usd(
        &self,
        id: &PresaleId,
        caller: &Identity,
    ) -> Result<Settlement, PresaleError> {
        self.commit_ledger(id, "withdraw_usd", |engine, ledger, _now| {
            let settlement = engine.withdraw_usd(ledger, caller)?;
            let transfer = settlement.transfer.clone();
            Ok((settlement, transfer))
        })
        .await
    }

    pub async fn reclaim_deposit(
        &self,
        id: &PresaleId,
        caller: &Identity,
    ) -> Result<Settlement, PresaleError> {
        self.commit_ledger(id, "reclaim_deposit", |engine, ledger, _now| {
            let settlement = engine.reclaim_deposit(ledger, caller)?;
            let transfer = settlement.transfer.clone();
            Ok((settlement, transfer))
        })
        .await
    }

    pub async fn close_presale(&self, id: &PresaleId, caller: &Identity) -> Result<(), PresaleError> {
        self.commit_ledger(id, "close_presale", |engine, ledger, _now| {
            engine.close_presale(ledger, caller)?;
            Ok(((), None))
        })
        .await
    }

    /// Snapshot of a ledger.
    pub async fn ledger(&self, id: &PresaleId) -> Result<PresaleLedger, PresaleError> {
        let slot = self.slot(id).await?;
        let slot = slot.lock().await;
        Ok(slot.ledger.clone())
    }

    /// Snapshot of a buyer's position.
    pub async fn position(
        &self,
        id: &PresaleId,
        buyer: &Identity,
    ) -> Result<UserPosition, PresaleError> {
        let slot = self.slot(id).await?;
        let slot = slot.lock().await;
        slot.positions
            .get(buyer)
            .cloned()
            .ok_or_else(|| PresaleError::NotFound(format!("position of {} in {}", buyer, id)))
    }

    /// Ids of every registered presale, sorted.
    pub async fn presale_ids(&self) -> Vec<PresaleId> {
        let mut ids: Vec<PresaleId> = self.ledgers.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    async fn slot(&self, id: &PresaleId) -> Result<Arc<Mutex<LedgerSlot>>, PresaleError> {
        self.ledgers
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| PresaleError::NotFound(format!("presale {}", id)))
    }

    /// Run a ledger-only operation under the ledger lock.
    async fn commit_ledger<T, F>(
        &self,
        id: &PresaleId,
        operation: &'static str,
        op: F,
    ) -> Result<T, PresaleError>
    where
        F: FnOnce(&PresaleEngine, &mut PresaleLedger, Timestamp) -> Result<(T, Option<Transfer>), PresaleError>,
    {
        let slot = self.slot(id).await?;
        let mut slot = slot.lock().await;

        let mut ledger = slot.ledger.clone();
        let (value, transfer) = op(&self.engine, &mut ledger, self.clock.now())
            .map_err(|e| rejected(operation, Some(id), e))?;
        self.settle(operation, id, transfer.as_ref()).await?;

        slot.ledger = ledger;
        Ok(value)
    }

    /// Run a buyer operation under the ledger lock.
    async fn commit_position<T, F>(
        &self,
        id: &PresaleId,
        buyer: &Identity,
        operation: &'static str,
        op: F,
    ) -> Result<T, PresaleError>
    where
        F: FnOnce(
            &PresaleEngine,
            &mut PresaleLedger,
            &mut UserPosition,
            Timestamp,
        ) -> Result<(T, Option<Transfer>), PresaleError>,
    {
        let slot = self.slot(id).await?;
        let mut slot = slot.lock().await;

        let mut position = slot.positions.get(buyer).cloned().ok_or_else(|| {
            rejected(
                operation,
                Some(id),
                PresaleError::NotFound(format!("position of {} in {}", buyer, id)),
            )
        })?;
        let mut ledger = slot.ledger.clone();
        let (value, transfer) = op(&self.engine, &mut ledger, &mut position, self.clock.now())
            .map_err(|e| rejected(operation, Some(id), e))?;
        self.settle(operation, id, transfer.as_ref()).await?;

        slot.ledger = ledger;
        slot.positions.insert(buyer.clone(), position);
        Ok(value)
    }

    async fn settle(
        &self,
        operation: &'static str,
        id: &PresaleId,
        transfer: Option<&Transfer>,
    ) -> Result<(), PresaleError> {
        let Some(transfer) = transfer else {
            return Ok(());
        };
        self.bank.transfer(transfer).await.map_err(|e| {
            warn!(
                operation,
                presale = %id,
                from = %transfer.from,
                to = %transfer.to,
                amount = transfer.amount,
                error = %e,
                "transfer failed, operation aborted"
            );
            PresaleError::from(e)
        })
    }
}

fn rejected(operation: &'static str, id: Option<&PresaleId>, error: PresaleError) -> PresaleError {
    match id {
        Some(id) => debug!(operation, presale = %id, error = %error, "operation rejected"),
        None => debug!(operation, error = %error, "operation rejected"),
    }
    error
}
