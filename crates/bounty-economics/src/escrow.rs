use crate::balance::BalanceManager;
use bounty_types::{AccountAddress, MarketError, Result, TaskId, TokenAmount};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// Custody record for one locked bounty, 1:1 with a task.
///
/// `released` is the sole idempotency guard: it flips true in the same
/// critical section that credits the recipients, so funds can leave custody
/// through exactly one successful release or refund.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowRecord {
    pub task_id: TaskId,
    pub payer: AccountAddress,
    pub amount: TokenAmount,
    pub locked_at: i64,
    pub released: bool,
}

/// Token custody for task bounties.
///
/// Locks funds into the escrow vault on task creation and moves them out
/// exactly once, to the worker (plus fee pool) or back to the creator.
/// Each record sits behind its own mutex; the map lock is held only for
/// lookup and insertion, so custody operations on different tasks run
/// concurrently while same-task racers serialize on the record.
pub struct EscrowManager {
    balances: Arc<BalanceManager>,
    records: RwLock<HashMap<TaskId, Arc<Mutex<EscrowRecord>>>>,
}

impl EscrowManager {
    pub fn new(balances: Arc<BalanceManager>) -> Self {
        Self {
            balances,
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Debit the payer and take custody of `amount` for `task_id`.
    pub async fn lock(
        &self,
        task_id: TaskId,
        payer: AccountAddress,
        amount: TokenAmount,
    ) -> Result<()> {
        let handle = {
            let mut records = self.records.write().await;
            if records.contains_key(&task_id) {
                return Err(MarketError::InvalidState {
                    state: "locked".to_string(),
                    operation: "lock".to_string(),
                });
            }
            let handle = Arc::new(Mutex::new(EscrowRecord {
                task_id,
                payer,
                amount,
                locked_at: chrono::Utc::now().timestamp(),
                released: false,
            }));
            records.insert(task_id, handle.clone());
            handle
        };

        // Hold the record mutex through funding: a racer that grabbed the
        // handle blocks here until the outcome is decided.
        let mut record = handle.lock().await;
        if let Err(e) = self.fund(payer, amount).await {
            record.released = true;
            drop(record);
            self.records.write().await.remove(&task_id);
            return Err(e);
        }

        info!(
            task_id = %task_id,
            payer = %payer,
            amount = amount.to_base_units(),
            "🔒 Bounty locked in escrow"
        );
        Ok(())
    }

    async fn fund(&self, payer: AccountAddress, amount: TokenAmount) -> Result<()> {
        let available = self
            .balances
            .get_balance(payer)
            .await
            .map_err(|e| MarketError::Ledger(e.to_string()))?;
        if available < amount {
            return Err(MarketError::InsufficientBalance {
                required: amount,
                available,
            });
        }

        self.balances
            .transfer(payer, AccountAddress::escrow_vault(), amount, "escrow lock")
            .await
            .map_err(|e| MarketError::Ledger(e.to_string()))
    }

    /// Credit each recipient and flip `released`, exactly once.
    ///
    /// The payout amounts must sum to the locked amount. A second call for
    /// the same task fails with `AlreadyReleased` and credits nothing.
    pub async fn release(
        &self,
        task_id: TaskId,
        payouts: &[(AccountAddress, TokenAmount)],
    ) -> Result<()> {
        let handle = self.record_handle(task_id).await?;
        let mut record = handle.lock().await;

        if record.released {
            warn!(task_id = %task_id, "Release attempted on released escrow");
            return Err(MarketError::AlreadyReleased(task_id));
        }

        let total = payouts
            .iter()
            .try_fold(TokenAmount::ZERO, |acc, (_, amount)| {
                acc.checked_add(*amount)
            })
            .ok_or_else(|| MarketError::InvalidInput("payout total overflow".to_string()))?;
        if total != record.amount {
            return Err(MarketError::InvalidInput(format!(
                "payouts sum to {}, escrow holds {}",
                total, record.amount
            )));
        }

        self.balances
            .transfer_many(AccountAddress::escrow_vault(), payouts, "escrow release")
            .await
            .map_err(|e| MarketError::Ledger(e.to_string()))?;

        // Flip only after the credits landed; the record mutex kept any
        // concurrent release from observing an intermediate state.
        record.released = true;

        info!(
            task_id = %task_id,
            recipients = payouts.len(),
            amount = record.amount.to_base_units(),
            "🔓 Escrow released"
        );
        Ok(())
    }

    /// Return the full locked amount to `recipient`, exactly once.
    pub async fn refund(&self, task_id: TaskId, recipient: AccountAddress) -> Result<()> {
        let handle = self.record_handle(task_id).await?;
        let mut record = handle.lock().await;

        if record.released {
            warn!(task_id = %task_id, "Refund attempted on released escrow");
            return Err(MarketError::AlreadyReleased(task_id));
        }

        self.balances
            .transfer(
                AccountAddress::escrow_vault(),
                recipient,
                record.amount,
                "escrow refund",
            )
            .await
            .map_err(|e| MarketError::Ledger(e.to_string()))?;

        record.released = true;

        info!(
            task_id = %task_id,
            recipient = %recipient,
            amount = record.amount.to_base_units(),
            "↩️ Escrow refunded"
        );
        Ok(())
    }

    pub async fn get_record(&self, task_id: TaskId) -> Option<EscrowRecord> {
        let handle = self.records.read().await.get(&task_id).cloned()?;
        let record = handle.lock().await;
        Some(record.clone())
    }

    /// Sum of all amounts still held in custody.
    pub async fn total_locked(&self) -> TokenAmount {
        let handles: Vec<Arc<Mutex<EscrowRecord>>> =
            self.records.read().await.values().cloned().collect();

        let mut total = TokenAmount::ZERO;
        for handle in handles {
            let record = handle.lock().await;
            if !record.released {
                total = total.saturating_add(record.amount);
            }
        }
        total
    }

    async fn record_handle(&self, task_id: TaskId) -> Result<Arc<Mutex<EscrowRecord>>> {
        self.records
            .read()
            .await
            .get(&task_id)
            .cloned()
            .ok_or_else(|| MarketError::NotFound(format!("escrow for {}", task_id)))
    }
}
