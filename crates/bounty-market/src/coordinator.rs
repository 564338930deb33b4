//! Task Lifecycle Coordinator
//!
//! Orchestrates the complete task lifecycle:
//! 1. Creation with atomic escrow lock
//! 2. Application and assignment
//! 3. Submission of completion proofs
//! 4. Approval with fee split and exactly-once payout
//! 5. Cancellation with refund
//! 6. Dispute initiation and externally-ruled resolution
//!
//! Each operation runs under the task's own mutex: two calls racing on the
//! same task serialize, and the loser observes the post-mutation state.
//! Operations on different tasks never contend.

use crate::dispute::{Dispute, DisputeRuling};
use crate::events::{EventBus, MarketEvent};
use crate::types::{MarketConfig, Task, TaskStatus, UserStats, MAX_FEE_RATE_BPS};
use bounty_economics::{BalanceManager, EscrowManager};
use bounty_reputation::{ReputationEngine, ReputationEvent, ReputationRecord};
use bounty_types::{AccountAddress, MarketError, Result, TaskId, TokenAmount};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

/// Central coordinator for the task marketplace.
pub struct MarketCoordinator {
    config: RwLock<MarketConfig>,
    balances: Arc<BalanceManager>,
    escrow: Arc<EscrowManager>,
    reputation: ReputationEngine,
    events: EventBus,

    tasks: RwLock<HashMap<TaskId, Arc<Mutex<Task>>>>,
    users: RwLock<HashMap<AccountAddress, ReputationRecord>>,
    disputes: RwLock<HashMap<TaskId, Dispute>>,

    next_task_id: AtomicU64,
}

impl std::fmt::Debug for MarketCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketCoordinator").finish_non_exhaustive()
    }
}

impl MarketCoordinator {
    pub fn new(
        config: MarketConfig,
        balances: Arc<BalanceManager>,
        escrow: Arc<EscrowManager>,
    ) -> Result<Self> {
        config.validate()?;
        let reputation = ReputationEngine::new(config.reputation.clone());

        Ok(Self {
            config: RwLock::new(config),
            balances,
            escrow,
            reputation,
            events: EventBus::new(),
            tasks: RwLock::new(HashMap::new()),
            users: RwLock::new(HashMap::new()),
            disputes: RwLock::new(HashMap::new()),
            next_task_id: AtomicU64::new(1),
        })
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Update the platform fee rate, bounded by the 10% ceiling.
    pub async fn set_fee_rate(&self, fee_rate_bps: u64) -> Result<()> {
        if fee_rate_bps > MAX_FEE_RATE_BPS {
            return Err(MarketError::ConfigOutOfRange {
                param: "fee_rate_bps".to_string(),
                value: fee_rate_bps,
                min: 0,
                max: MAX_FEE_RATE_BPS,
            });
        }
        let mut config = self.config.write().await;
        info!(
            fee_before = config.fee_rate_bps,
            fee_after = fee_rate_bps,
            "Fee rate updated"
        );
        config.fee_rate_bps = fee_rate_bps;
        Ok(())
    }

    pub(crate) async fn is_authorized_resolver(&self, resolver: &AccountAddress) -> bool {
        self.config.read().await.resolvers.contains(resolver)
    }

    /// Post a task and lock its bounty into escrow atomically.
    ///
    /// If the escrow lock fails (insufficient balance) the task is never
    /// created.
    pub async fn create_task(
        &self,
        creator: AccountAddress,
        content_ref: &str,
        bounty: TokenAmount,
        deadline: i64,
        required_reputation: u64,
    ) -> Result<TaskId> {
        if bounty.is_zero() {
            return Err(MarketError::InvalidInput("bounty must be positive".to_string()));
        }
        if content_ref.is_empty() {
            return Err(MarketError::InvalidInput(
                "content_ref must not be empty".to_string(),
            ));
        }
        let now = Utc::now().timestamp();
        if deadline <= now {
            return Err(MarketError::InvalidInput(
                "deadline must be in the future".to_string(),
            ));
        }

        let task_id = TaskId::new(self.next_task_id.fetch_add(1, Ordering::SeqCst));

        // Escrow lock first: a failed debit leaves no task behind.
        self.escrow.lock(task_id, creator, bounty).await?;

        let task = Task {
            id: task_id,
            creator,
            worker: None,
            content_ref: content_ref.to_string(),
            bounty,
            deadline,
            status: TaskStatus::Open,
            created_at: now,
            completed_at: None,
            submission_ref: None,
            required_reputation,
            applicants: Vec::new(),
        };

        self.tasks
            .write()
            .await
            .insert(task_id, Arc::new(Mutex::new(task)));

        info!(
            task_id = %task_id,
            creator = %creator,
            bounty = bounty.to_base_units(),
            deadline = deadline,
            "📋 Task created"
        );
        self.events.emit(MarketEvent::TaskCreated {
            task_id: task_id.value(),
            creator: creator.to_string(),
            bounty: bounty.to_base_units(),
            deadline,
            timestamp: Utc::now(),
        });

        Ok(task_id)
    }

    /// Register an applicant on an open task. Does not transition state.
    pub async fn apply_for_task(&self, task_id: TaskId, applicant: AccountAddress) -> Result<()> {
        let handle = self.task_handle(task_id).await?;
        let mut task = handle.lock().await;

        if task.status != TaskStatus::Open {
            return Err(invalid_state(task.status, "apply"));
        }
        if applicant == task.creator {
            return Err(MarketError::SelfApplication(task_id));
        }

        let score = self.user_score(&applicant).await;
        if score < task.required_reputation {
            return Err(MarketError::InsufficientReputation {
                required: task.required_reputation,
                actual: score,
            });
        }
        if task.has_applicant(&applicant) {
            return Err(MarketError::AlreadyApplied(task_id));
        }

        task.applicants.push(applicant);
        info!(
            task_id = %task_id,
            applicant = %applicant,
            applicant_count = task.applicants.len(),
            "🙋 Application recorded"
        );
        Ok(())
    }

    /// Assign an applicant as the task's worker. Creator only.
    pub async fn assign_task(
        &self,
        task_id: TaskId,
        worker: AccountAddress,
        actor: AccountAddress,
    ) -> Result<()> {
        let handle = self.task_handle(task_id).await?;
        let mut task = handle.lock().await;

        if actor != task.creator {
            return Err(MarketError::Unauthorized(
                "only the creator can assign".to_string(),
            ));
        }
        if task.status != TaskStatus::Open {
            return Err(invalid_state(task.status, "assign"));
        }
        if !task.has_applicant(&worker) {
            return Err(MarketError::NotApplied(task_id));
        }
        if Utc::now().timestamp() > task.deadline {
            return Err(MarketError::DeadlinePassed(task_id));
        }

        task.worker = Some(worker);
        task.status = TaskStatus::Assigned;

        info!(task_id = %task_id, worker = %worker, "🤝 Task assigned");
        self.events.emit(MarketEvent::TaskAssigned {
            task_id: task_id.value(),
            worker: worker.to_string(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Record the worker's completion proof. Worker only.
    pub async fn submit_task(
        &self,
        task_id: TaskId,
        submission_ref: &str,
        actor: AccountAddress,
    ) -> Result<()> {
        let handle = self.task_handle(task_id).await?;
        let mut task = handle.lock().await;

        if task.worker != Some(actor) {
            return Err(MarketError::Unauthorized(
                "only the assigned worker can submit".to_string(),
            ));
        }
        if task.status != TaskStatus::Assigned {
            return Err(invalid_state(task.status, "submit"));
        }
        if submission_ref.is_empty() {
            return Err(MarketError::InvalidInput(
                "submission_ref must not be empty".to_string(),
            ));
        }

        task.submission_ref = Some(submission_ref.to_string());
        task.status = TaskStatus::Submitted;

        info!(task_id = %task_id, worker = %actor, "📤 Work submitted");
        self.events.emit(MarketEvent::TaskSubmitted {
            task_id: task_id.value(),
            worker: actor.to_string(),
            submission_ref: submission_ref.to_string(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Approve submitted work: pay the worker minus the platform fee,
    /// update both parties' reputation, complete the task.
    ///
    /// The escrow release is the commit point; its `released` flag flips
    /// exactly once, so a retried approval either sees `Completed` here or
    /// fails `AlreadyReleased` without paying twice.
    pub async fn approve_task(&self, task_id: TaskId, actor: AccountAddress) -> Result<()> {
        let handle = self.task_handle(task_id).await?;
        let mut task = handle.lock().await;

        if actor != task.creator {
            return Err(MarketError::Unauthorized(
                "only the creator can approve".to_string(),
            ));
        }
        if task.status != TaskStatus::Submitted {
            return Err(invalid_state(task.status, "approve"));
        }
        let worker = task
            .worker
            .ok_or_else(|| invalid_state(task.status, "approve"))?;

        let (net_payment, fee) = self.pay_out(&task, worker).await?;

        self.apply_reputation(
            worker,
            &[
                ReputationEvent::TaskCompletedAsWorker { net_payment },
            ],
        )
        .await;
        self.apply_reputation(
            task.creator,
            &[ReputationEvent::TaskCompletedAsCreator { bounty: task.bounty }],
        )
        .await;

        task.status = TaskStatus::Completed;
        task.completed_at = Some(Utc::now().timestamp());

        info!(
            task_id = %task_id,
            worker = %worker,
            net_payment = net_payment.to_base_units(),
            fee = fee.to_base_units(),
            "✅ Task approved and paid"
        );
        self.events.emit(MarketEvent::TaskCompleted {
            task_id: task_id.value(),
            worker: worker.to_string(),
            net_payment: net_payment.to_base_units(),
            fee: fee.to_base_units(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Cancel an open or assigned task and refund the full bounty.
    /// Creator only, unless the configured admin overrides.
    pub async fn cancel_task(&self, task_id: TaskId, actor: AccountAddress) -> Result<()> {
        let handle = self.task_handle(task_id).await?;
        let mut task = handle.lock().await;

        let admin = self.config.read().await.admin;
        if actor != task.creator && Some(actor) != admin {
            return Err(MarketError::Unauthorized(
                "only the creator or admin can cancel".to_string(),
            ));
        }
        if !matches!(task.status, TaskStatus::Open | TaskStatus::Assigned) {
            return Err(invalid_state(task.status, "cancel"));
        }

        self.escrow.refund(task_id, task.creator).await?;

        task.status = TaskStatus::Cancelled;

        info!(
            task_id = %task_id,
            refunded = task.bounty.to_base_units(),
            "🚫 Task cancelled, bounty refunded"
        );
        self.events.emit(MarketEvent::TaskCancelled {
            task_id: task_id.value(),
            refunded: task.bounty.to_base_units(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Open a dispute on an assigned or submitted task. Creator or worker.
    pub async fn initiate_dispute(
        &self,
        task_id: TaskId,
        actor: AccountAddress,
        reason: &str,
    ) -> Result<()> {
        let handle = self.task_handle(task_id).await?;
        let mut task = handle.lock().await;

        if actor != task.creator && task.worker != Some(actor) {
            return Err(MarketError::Unauthorized(
                "only the creator or worker can dispute".to_string(),
            ));
        }
        if !matches!(task.status, TaskStatus::Assigned | TaskStatus::Submitted) {
            return Err(invalid_state(task.status, "dispute"));
        }

        task.status = TaskStatus::Disputed;
        self.disputes.write().await.insert(
            task_id,
            Dispute {
                task_id,
                initiator: actor,
                reason: reason.to_string(),
                created_at: Utc::now().timestamp(),
                resolved: false,
                ruling: None,
            },
        );

        info!(task_id = %task_id, initiator = %actor, reason = %reason, "⚡ Dispute opened");
        self.events.emit(MarketEvent::TaskDisputed {
            task_id: task_id.value(),
            initiator: actor.to_string(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Apply an external ruling to a disputed task.
    ///
    /// Reached only through [`crate::DisputeResolverAdapter`]; resolution
    /// is one-shot, guarded by both the task state and the escrow flag.
    pub(crate) async fn resolve_dispute(
        &self,
        task_id: TaskId,
        ruling: DisputeRuling,
    ) -> Result<()> {
        let handle = self.task_handle(task_id).await?;
        let mut task = handle.lock().await;

        if task.status != TaskStatus::Disputed {
            return Err(invalid_state(task.status, "resolve"));
        }
        let worker = task
            .worker
            .ok_or_else(|| invalid_state(task.status, "resolve"))?;
        {
            let disputes = self.disputes.read().await;
            if !disputes.contains_key(&task_id) {
                return Err(MarketError::NotFound(format!("dispute for {}", task_id)));
            }
        }

        match ruling {
            DisputeRuling::FavorWorker => {
                let (net_payment, fee) = self.pay_out(&task, worker).await?;

                self.apply_reputation(
                    worker,
                    &[
                        ReputationEvent::TaskCompletedAsWorker { net_payment },
                        ReputationEvent::DisputeWon,
                    ],
                )
                .await;
                self.apply_reputation(
                    task.creator,
                    &[
                        ReputationEvent::TaskCompletedAsCreator { bounty: task.bounty },
                        ReputationEvent::DisputeLost { bounty: task.bounty },
                    ],
                )
                .await;

                task.status = TaskStatus::Completed;
                task.completed_at = Some(Utc::now().timestamp());

                info!(
                    task_id = %task_id,
                    worker = %worker,
                    net_payment = net_payment.to_base_units(),
                    fee = fee.to_base_units(),
                    "⚖️ Dispute resolved in favor of worker"
                );
            }
            DisputeRuling::FavorCreator => {
                // Fee-free refund: no value was delivered.
                self.escrow.refund(task_id, task.creator).await?;

                self.apply_reputation(task.creator, &[ReputationEvent::DisputeWon])
                    .await;
                self.apply_reputation(
                    worker,
                    &[ReputationEvent::DisputeLost { bounty: task.bounty }],
                )
                .await;

                // Reopen for reassignment with the worker cleared.
                task.worker = None;
                task.submission_ref = None;
                task.status = TaskStatus::Open;

                info!(
                    task_id = %task_id,
                    creator = %task.creator,
                    refunded = task.bounty.to_base_units(),
                    "⚖️ Dispute resolved in favor of creator, task reopened"
                );
            }
        }

        {
            let mut disputes = self.disputes.write().await;
            if let Some(dispute) = disputes.get_mut(&task_id) {
                dispute.resolved = true;
                dispute.ruling = Some(ruling);
            }
        }

        self.events.emit(MarketEvent::DisputeResolved {
            task_id: task_id.value(),
            ruling: format!("{:?}", ruling),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    // ---- queries ----

    pub async fn get_task(&self, task_id: TaskId) -> Result<Task> {
        let handle = self.task_handle(task_id).await?;
        let task = handle.lock().await;
        Ok(task.clone())
    }

    pub async fn get_dispute(&self, task_id: TaskId) -> Option<Dispute> {
        self.disputes.read().await.get(&task_id).cloned()
    }

    pub async fn get_user_stats(&self, address: AccountAddress) -> Result<UserStats> {
        let token_balance = self
            .balances
            .get_balance(address)
            .await
            .map_err(|e| MarketError::Ledger(e.to_string()))?;
        let reputation = {
            let users = self.users.read().await;
            users.get(&address).cloned().unwrap_or_default()
        };
        Ok(UserStats {
            address,
            token_balance,
            reputation,
        })
    }

    pub async fn get_user_created_tasks(&self, address: AccountAddress) -> Vec<Task> {
        self.collect_tasks(|task| task.creator == address).await
    }

    pub async fn get_user_assigned_tasks(&self, address: AccountAddress) -> Vec<Task> {
        self.collect_tasks(|task| task.worker == Some(address)).await
    }

    // ---- internals ----

    async fn task_handle(&self, task_id: TaskId) -> Result<Arc<Mutex<Task>>> {
        let tasks = self.tasks.read().await;
        tasks
            .get(&task_id)
            .cloned()
            .ok_or_else(|| MarketError::NotFound(task_id.to_string()))
    }

    async fn user_score(&self, address: &AccountAddress) -> u64 {
        let users = self.users.read().await;
        users.get(address).map(|r| r.score).unwrap_or(0)
    }

    /// Release the task's escrow split into net payment and fee.
    async fn pay_out(
        &self,
        task: &Task,
        worker: AccountAddress,
    ) -> Result<(TokenAmount, TokenAmount)> {
        let config = self.config.read().await;
        let (net_payment, fee) = config.split_fee(task.bounty);
        let fee_recipient = config.fee_recipient;
        drop(config);

        self.escrow
            .release(task.id, &[(worker, net_payment), (fee_recipient, fee)])
            .await?;
        Ok((net_payment, fee))
    }

    /// Fold outcome events into a user's record, lazily creating it, and
    /// emit the observable reputation changes.
    async fn apply_reputation(&self, address: AccountAddress, events: &[ReputationEvent]) {
        let mut users = self.users.write().await;
        let record = users.entry(address).or_default();

        for event in events {
            let old_score = record.score;
            let (next, unlocked) = self.reputation.apply(record, event);

            self.events.emit(MarketEvent::ReputationUpdated {
                address: address.to_string(),
                old_score,
                new_score: next.score,
                tier: format!("{:?}", next.tier),
                timestamp: Utc::now(),
            });
            for achievement in unlocked {
                info!(
                    address = %address,
                    achievement = %achievement,
                    "🏆 Achievement unlocked"
                );
                self.events.emit(MarketEvent::AchievementUnlocked {
                    address: address.to_string(),
                    achievement: achievement.to_string(),
                    timestamp: Utc::now(),
                });
            }

            *record = next;
        }
    }

    async fn collect_tasks(&self, predicate: impl Fn(&Task) -> bool) -> Vec<Task> {
        let handles: Vec<Arc<Mutex<Task>>> =
            self.tasks.read().await.values().cloned().collect();

        let mut matched = Vec::new();
        for handle in handles {
            let task = handle.lock().await;
            if predicate(&task) {
                matched.push(task.clone());
            }
        }
        matched.sort_by_key(|t| t.id);
        matched
    }
}

fn invalid_state(status: TaskStatus, operation: &str) -> MarketError {
    MarketError::InvalidState {
        state: format!("{:?}", status),
        operation: operation.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bounty_economics::MemoryLedger;

    fn addr(byte: u8) -> AccountAddress {
        AccountAddress::from_bytes([byte; 32])
    }

    fn future_deadline() -> i64 {
        Utc::now().timestamp() + 3_600
    }

    async fn market() -> (Arc<MarketCoordinator>, Arc<BalanceManager>) {
        let balances = Arc::new(BalanceManager::new(Arc::new(MemoryLedger::new())));
        let escrow = Arc::new(EscrowManager::new(balances.clone()));
        let config = MarketConfig {
            resolvers: vec![addr(0xE0)],
            admin: Some(addr(0xAD)),
            ..MarketConfig::default()
        };
        let coordinator =
            Arc::new(MarketCoordinator::new(config, balances.clone(), escrow).unwrap());

        for byte in 1..=4u8 {
            balances
                .credit(addr(byte), TokenAmount::from_base_units(10_000))
                .await
                .unwrap();
        }
        (coordinator, balances)
    }

    async fn open_task(market: &MarketCoordinator, creator: AccountAddress) -> TaskId {
        market
            .create_task(
                creator,
                "ipfs://QmTask",
                TokenAmount::from_base_units(100),
                future_deadline(),
                0,
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_task_validations() {
        let (market, _) = market().await;
        let creator = addr(1);

        let err = market
            .create_task(creator, "ref", TokenAmount::ZERO, future_deadline(), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::InvalidInput(_)));

        let err = market
            .create_task(
                creator,
                "",
                TokenAmount::from_base_units(10),
                future_deadline(),
                0,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::InvalidInput(_)));

        let err = market
            .create_task(
                creator,
                "ref",
                TokenAmount::from_base_units(10),
                Utc::now().timestamp() - 1,
                0,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_create_task_insufficient_balance_creates_nothing() {
        let (market, _) = market().await;
        let poor = addr(9); // never funded

        let err = market
            .create_task(
                poor,
                "ref",
                TokenAmount::from_base_units(100),
                future_deadline(),
                0,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::InsufficientBalance { .. }));
        assert!(market.get_user_created_tasks(poor).await.is_empty());
    }

    #[tokio::test]
    async fn test_apply_guards() {
        let (market, _) = market().await;
        let creator = addr(1);
        let worker = addr(2);
        let task_id = open_task(&market, creator).await;

        assert_eq!(
            market.apply_for_task(task_id, creator).await.unwrap_err(),
            MarketError::SelfApplication(task_id)
        );

        market.apply_for_task(task_id, worker).await.unwrap();
        assert_eq!(
            market.apply_for_task(task_id, worker).await.unwrap_err(),
            MarketError::AlreadyApplied(task_id)
        );

        // Application does not transition state
        assert_eq!(
            market.get_task(task_id).await.unwrap().status,
            TaskStatus::Open
        );
    }

    #[tokio::test]
    async fn test_reputation_gate() {
        let (market, _) = market().await;
        let creator = addr(1);
        let applicant = addr(2);

        let task_id = market
            .create_task(
                creator,
                "ref",
                TokenAmount::from_base_units(100),
                future_deadline(),
                500,
            )
            .await
            .unwrap();

        let err = market
            .apply_for_task(task_id, applicant)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            MarketError::InsufficientReputation {
                required: 500,
                actual: 0
            }
        );
    }

    #[tokio::test]
    async fn test_assign_guards() {
        let (market, _) = market().await;
        let creator = addr(1);
        let worker = addr(2);
        let stranger = addr(3);
        let task_id = open_task(&market, creator).await;
        market.apply_for_task(task_id, worker).await.unwrap();

        assert!(matches!(
            market
                .assign_task(task_id, worker, stranger)
                .await
                .unwrap_err(),
            MarketError::Unauthorized(_)
        ));
        assert_eq!(
            market
                .assign_task(task_id, stranger, creator)
                .await
                .unwrap_err(),
            MarketError::NotApplied(task_id)
        );

        market.assign_task(task_id, worker, creator).await.unwrap();
        let task = market.get_task(task_id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Assigned);
        assert_eq!(task.worker, Some(worker));
    }

    #[tokio::test]
    async fn test_illegal_transitions_leave_state_unchanged() {
        let (market, _) = market().await;
        let creator = addr(1);
        let worker = addr(2);
        let task_id = open_task(&market, creator).await;

        // Open: submit/approve/dispute all illegal
        assert!(matches!(
            market
                .submit_task(task_id, "proof", worker)
                .await
                .unwrap_err(),
            MarketError::Unauthorized(_)
        ));
        assert!(matches!(
            market.approve_task(task_id, creator).await.unwrap_err(),
            MarketError::InvalidState { .. }
        ));
        assert!(matches!(
            market
                .initiate_dispute(task_id, creator, "bad")
                .await
                .unwrap_err(),
            MarketError::InvalidState { .. }
        ));

        let before = market.get_task(task_id).await.unwrap();
        assert_eq!(before.status, TaskStatus::Open);
        assert!(before.worker.is_none());
        assert!(before.submission_ref.is_none());
    }

    #[tokio::test]
    async fn test_cancel_authorization_and_admin_override() {
        let (market, balances) = market().await;
        let creator = addr(1);
        let stranger = addr(3);
        let task_id = open_task(&market, creator).await;

        assert!(matches!(
            market.cancel_task(task_id, stranger).await.unwrap_err(),
            MarketError::Unauthorized(_)
        ));
        assert_eq!(
            market.get_task(task_id).await.unwrap().status,
            TaskStatus::Open
        );

        // Admin override cancels and refunds
        market.cancel_task(task_id, addr(0xAD)).await.unwrap();
        assert_eq!(
            market.get_task(task_id).await.unwrap().status,
            TaskStatus::Cancelled
        );
        assert_eq!(
            balances.get_balance(creator).await.unwrap(),
            TokenAmount::from_base_units(10_000)
        );
    }

    #[tokio::test]
    async fn test_cancel_after_submission_rejected() {
        let (market, _) = market().await;
        let creator = addr(1);
        let worker = addr(2);
        let task_id = open_task(&market, creator).await;

        market.apply_for_task(task_id, worker).await.unwrap();
        market.assign_task(task_id, worker, creator).await.unwrap();
        market
            .submit_task(task_id, "ipfs://QmProof", worker)
            .await
            .unwrap();

        assert!(matches!(
            market.cancel_task(task_id, creator).await.unwrap_err(),
            MarketError::InvalidState { .. }
        ));
    }

    #[tokio::test]
    async fn test_zero_divisor_config_rejected_at_construction() {
        let balances = Arc::new(BalanceManager::new(Arc::new(MemoryLedger::new())));
        let escrow = Arc::new(EscrowManager::new(balances.clone()));
        let config = MarketConfig {
            reputation: bounty_reputation::ReputationConfig {
                completion_divisor: 0,
                ..bounty_reputation::ReputationConfig::default()
            },
            ..MarketConfig::default()
        };

        // A zero divisor would divide by zero inside the first score fold;
        // it must never get past construction.
        let err = MarketCoordinator::new(config, balances, escrow).unwrap_err();
        assert!(matches!(
            err,
            MarketError::ConfigOutOfRange { ref param, value: 0, .. }
                if param == "completion_divisor"
        ));
    }

    #[tokio::test]
    async fn test_set_fee_rate_bounds() {
        let (market, _) = market().await;
        market.set_fee_rate(MAX_FEE_RATE_BPS).await.unwrap();
        assert!(matches!(
            market.set_fee_rate(MAX_FEE_RATE_BPS + 1).await.unwrap_err(),
            MarketError::ConfigOutOfRange { .. }
        ));
    }

    #[tokio::test]
    async fn test_queries_by_user() {
        let (market, _) = market().await;
        let creator = addr(1);
        let worker = addr(2);

        let first = open_task(&market, creator).await;
        let second = open_task(&market, creator).await;
        market.apply_for_task(first, worker).await.unwrap();
        market.assign_task(first, worker, creator).await.unwrap();

        let created = market.get_user_created_tasks(creator).await;
        assert_eq!(
            created.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![first, second]
        );

        let assigned = market.get_user_assigned_tasks(worker).await;
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].id, first);
    }
}
