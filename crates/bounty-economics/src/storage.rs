use anyhow::Result;
use async_trait::async_trait;
use bounty_types::{AccountAddress, TokenAmount};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Transfer record for history tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRecord {
    pub from: AccountAddress,
    pub to: AccountAddress,
    pub amount: TokenAmount,
    pub timestamp: DateTime<Utc>,
    pub tx_hash: String,
    pub reason: String,
}

type BalanceMap = HashMap<AccountAddress, TokenAmount>;

/// Durable key-value seam for account balances.
///
/// The transaction methods bracket multi-leg fund movement: everything
/// between `begin_transaction` and `commit_transaction` either lands
/// together or is undone by `rollback_transaction`.
#[async_trait]
pub trait LedgerStorage: Send + Sync {
    async fn get_balance(&self, address: AccountAddress) -> Result<TokenAmount>;
    async fn set_balance(&self, address: AccountAddress, balance: TokenAmount) -> Result<()>;
    async fn get_all_accounts(&self) -> Result<Vec<AccountAddress>>;

    async fn begin_transaction(&self) -> Result<()>;
    async fn commit_transaction(&self) -> Result<()>;
    async fn rollback_transaction(&self) -> Result<()>;

    async fn record_transfer(&self, transfer: TransferRecord) -> Result<()>;
    async fn get_transfer_history(&self, address: AccountAddress)
        -> Result<Vec<TransferRecord>>;
}

/// In-memory ledger with snapshot-based rollback.
pub struct MemoryLedger {
    balances: Arc<RwLock<BalanceMap>>,
    transaction_backup: Arc<RwLock<Option<BalanceMap>>>,
    transfer_history: Arc<RwLock<Vec<TransferRecord>>>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            balances: Arc::new(RwLock::new(HashMap::new())),
            transaction_backup: Arc::new(RwLock::new(None)),
            transfer_history: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

#[async_trait]
impl LedgerStorage for MemoryLedger {
    async fn get_balance(&self, address: AccountAddress) -> Result<TokenAmount> {
        let balances = self.balances.read().await;
        Ok(balances.get(&address).copied().unwrap_or(TokenAmount::ZERO))
    }

    async fn set_balance(&self, address: AccountAddress, balance: TokenAmount) -> Result<()> {
        let mut balances = self.balances.write().await;
        let old_balance = balances.get(&address).copied().unwrap_or(TokenAmount::ZERO);

        if balance.is_zero() {
            balances.remove(&address);
        } else {
            balances.insert(address, balance);
        }

        if old_balance != balance {
            info!(
                address = %address,
                balance_before = old_balance.to_base_units(),
                balance_after = balance.to_base_units(),
                "💾 Balance stored"
            );
        }
        Ok(())
    }

    async fn get_all_accounts(&self) -> Result<Vec<AccountAddress>> {
        let balances = self.balances.read().await;
        Ok(balances.keys().copied().collect())
    }

    async fn begin_transaction(&self) -> Result<()> {
        let balances = self.balances.read().await;
        let mut backup = self.transaction_backup.write().await;
        *backup = Some(balances.clone());

        info!(
            accounts_count = balances.len(),
            "📝 Ledger transaction began (snapshot created)"
        );
        Ok(())
    }

    async fn commit_transaction(&self) -> Result<()> {
        let mut backup = self.transaction_backup.write().await;
        if backup.take().is_some() {
            info!("✅ Ledger transaction committed (snapshot discarded)");
        }
        Ok(())
    }

    async fn rollback_transaction(&self) -> Result<()> {
        let mut backup = self.transaction_backup.write().await;

        if let Some(snapshot) = backup.take() {
            let mut balances = self.balances.write().await;
            *balances = snapshot;
            info!(
                accounts_after = balances.len(),
                "❌ Ledger transaction rolled back (snapshot restored)"
            );
        }

        Ok(())
    }

    async fn record_transfer(&self, transfer: TransferRecord) -> Result<()> {
        let mut history = self.transfer_history.write().await;
        info!(
            from = %transfer.from,
            to = %transfer.to,
            amount = transfer.amount.to_base_units(),
            tx_hash = %transfer.tx_hash,
            reason = %transfer.reason,
            "📦 Transfer recorded"
        );
        history.push(transfer);
        Ok(())
    }

    async fn get_transfer_history(
        &self,
        address: AccountAddress,
    ) -> Result<Vec<TransferRecord>> {
        let history = self.transfer_history.read().await;
        Ok(history
            .iter()
            .filter(|t| t.from == address || t.to == address)
            .cloned()
            .collect())
    }
}
