use crate::storage::{LedgerStorage, TransferRecord};
use anyhow::{bail, Result};
use bounty_types::{AccountAddress, TokenAmount};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Account balance operations over the ledger storage seam.
///
/// Transfers run inside a storage transaction and roll back on any leg
/// failing; the transfer mutex serializes multi-leg movement so no two
/// transactions interleave their snapshots.
pub struct BalanceManager {
    storage: Arc<dyn LedgerStorage>,
    transfer_lock: Mutex<()>,
}

impl BalanceManager {
    pub fn new(storage: Arc<dyn LedgerStorage>) -> Self {
        Self {
            storage,
            transfer_lock: Mutex::new(()),
        }
    }

    pub async fn get_balance(&self, address: AccountAddress) -> Result<TokenAmount> {
        self.storage.get_balance(address).await
    }

    pub async fn credit(&self, address: AccountAddress, amount: TokenAmount) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }

        let current = self.storage.get_balance(address).await?;
        let new_balance = current
            .checked_add(amount)
            .ok_or_else(|| anyhow::anyhow!("Balance overflow for {}", address))?;

        self.storage.set_balance(address, new_balance).await?;

        info!(
            address = %address,
            amount = amount.to_base_units(),
            balance_before = current.to_base_units(),
            balance_after = new_balance.to_base_units(),
            "💰 Balance credited"
        );
        Ok(())
    }

    pub async fn debit(&self, address: AccountAddress, amount: TokenAmount) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }

        let current = self.storage.get_balance(address).await?;
        let new_balance = current.checked_sub(amount).ok_or_else(|| {
            anyhow::anyhow!(
                "Insufficient balance for {}: has {}, needs {}",
                address,
                current,
                amount
            )
        })?;

        self.storage.set_balance(address, new_balance).await?;

        info!(
            address = %address,
            amount = amount.to_base_units(),
            balance_before = current.to_base_units(),
            balance_after = new_balance.to_base_units(),
            "💸 Balance debited"
        );
        Ok(())
    }

    /// Move `amount` from one account to another atomically.
    pub async fn transfer(
        &self,
        from: AccountAddress,
        to: AccountAddress,
        amount: TokenAmount,
        reason: &str,
    ) -> Result<()> {
        self.transfer_many(from, &[(to, amount)], reason).await
    }

    /// Move funds from one account to several recipients in one atomic step.
    ///
    /// Either every leg lands or the ledger is rolled back to its snapshot.
    pub async fn transfer_many(
        &self,
        from: AccountAddress,
        payouts: &[(AccountAddress, TokenAmount)],
        reason: &str,
    ) -> Result<()> {
        let total = payouts
            .iter()
            .try_fold(TokenAmount::ZERO, |acc, (_, amount)| {
                acc.checked_add(*amount)
            })
            .ok_or_else(|| anyhow::anyhow!("Payout total overflow"))?;

        if total.is_zero() {
            return Ok(());
        }

        if payouts.iter().any(|(to, _)| *to == from) {
            bail!("Cannot transfer to same address");
        }

        let _guard = self.transfer_lock.lock().await;
        self.storage.begin_transaction().await?;

        match self.transfer_internal(from, payouts, total).await {
            Ok(tx_hash) => {
                self.storage.commit_transaction().await?;

                for (to, amount) in payouts {
                    if amount.is_zero() {
                        continue;
                    }
                    self.storage
                        .record_transfer(TransferRecord {
                            from,
                            to: *to,
                            amount: *amount,
                            timestamp: Utc::now(),
                            tx_hash: tx_hash.clone(),
                            reason: reason.to_string(),
                        })
                        .await?;
                }

                info!(
                    from = %from,
                    recipients = payouts.len(),
                    total = total.to_base_units(),
                    tx_hash = %tx_hash,
                    reason = %reason,
                    "✅ Transfer committed"
                );
                Ok(())
            }
            Err(e) => {
                info!(
                    from = %from,
                    total = total.to_base_units(),
                    error = %e,
                    "❌ Transfer rolled back"
                );
                self.storage.rollback_transaction().await?;
                Err(e)
            }
        }
    }

    async fn transfer_internal(
        &self,
        from: AccountAddress,
        payouts: &[(AccountAddress, TokenAmount)],
        total: TokenAmount,
    ) -> Result<String> {
        let from_balance = self.storage.get_balance(from).await?;
        if from_balance < total {
            bail!(
                "Insufficient balance: {} has {}, needs {}",
                from,
                from_balance,
                total
            );
        }

        self.storage
            .set_balance(from, from_balance.saturating_sub(total))
            .await?;

        for (to, amount) in payouts {
            if amount.is_zero() {
                continue;
            }
            let to_balance = self.storage.get_balance(*to).await?;
            let new_to_balance = to_balance
                .checked_add(*amount)
                .ok_or_else(|| anyhow::anyhow!("Balance overflow for recipient {}", to))?;
            self.storage.set_balance(*to, new_to_balance).await?;
        }

        let now_nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let mut hasher = blake3::Hasher::new();
        hasher.update(from.as_bytes());
        for (to, amount) in payouts {
            hasher.update(to.as_bytes());
            hasher.update(&amount.to_base_units().to_le_bytes());
        }
        hasher.update(&now_nanos.to_le_bytes());

        Ok(hex::encode(hasher.finalize().as_bytes()))
    }

    pub async fn get_transfer_history(
        &self,
        address: AccountAddress,
    ) -> Result<Vec<TransferRecord>> {
        self.storage.get_transfer_history(address).await
    }
}
