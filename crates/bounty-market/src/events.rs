//! Domain event stream.
//!
//! The coordinator emits an event for every observable state change; external
//! indexers and notifiers subscribe, the core never reads its own events
//! back. Dropped events (no subscribers) are normal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Events buffered per subscriber before old events are dropped.
const EVENT_BUFFER: usize = 1024;

/// Observable side effects of lifecycle operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum MarketEvent {
    TaskCreated {
        task_id: u64,
        creator: String,
        bounty: u64,
        deadline: i64,
        #[serde(with = "chrono::serde::ts_seconds")]
        timestamp: DateTime<Utc>,
    },

    TaskAssigned {
        task_id: u64,
        worker: String,
        #[serde(with = "chrono::serde::ts_seconds")]
        timestamp: DateTime<Utc>,
    },

    TaskSubmitted {
        task_id: u64,
        worker: String,
        submission_ref: String,
        #[serde(with = "chrono::serde::ts_seconds")]
        timestamp: DateTime<Utc>,
    },

    TaskCompleted {
        task_id: u64,
        worker: String,
        net_payment: u64,
        fee: u64,
        #[serde(with = "chrono::serde::ts_seconds")]
        timestamp: DateTime<Utc>,
    },

    TaskCancelled {
        task_id: u64,
        refunded: u64,
        #[serde(with = "chrono::serde::ts_seconds")]
        timestamp: DateTime<Utc>,
    },

    TaskDisputed {
        task_id: u64,
        initiator: String,
        #[serde(with = "chrono::serde::ts_seconds")]
        timestamp: DateTime<Utc>,
    },

    DisputeResolved {
        task_id: u64,
        ruling: String,
        #[serde(with = "chrono::serde::ts_seconds")]
        timestamp: DateTime<Utc>,
    },

    ReputationUpdated {
        address: String,
        old_score: u64,
        new_score: u64,
        tier: String,
        #[serde(with = "chrono::serde::ts_seconds")]
        timestamp: DateTime<Utc>,
    },

    AchievementUnlocked {
        address: String,
        achievement: String,
        #[serde(with = "chrono::serde::ts_seconds")]
        timestamp: DateTime<Utc>,
    },
}

impl MarketEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            MarketEvent::TaskCreated { .. } => "task_created",
            MarketEvent::TaskAssigned { .. } => "task_assigned",
            MarketEvent::TaskSubmitted { .. } => "task_submitted",
            MarketEvent::TaskCompleted { .. } => "task_completed",
            MarketEvent::TaskCancelled { .. } => "task_cancelled",
            MarketEvent::TaskDisputed { .. } => "task_disputed",
            MarketEvent::DisputeResolved { .. } => "dispute_resolved",
            MarketEvent::ReputationUpdated { .. } => "reputation_updated",
            MarketEvent::AchievementUnlocked { .. } => "achievement_unlocked",
        }
    }
}

/// Broadcast bus for market events.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<MarketEvent>,
    emitted: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            sender,
            emitted: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MarketEvent> {
        self.sender.subscribe()
    }

    /// Emit an event to all subscribers.
    ///
    /// If no subscribers are listening the event is dropped; that is
    /// expected, not an error.
    pub fn emit(&self, event: MarketEvent) {
        match self.sender.send(event.clone()) {
            Ok(subscriber_count) => {
                debug!(
                    event_type = event.event_type(),
                    subscribers = subscriber_count,
                    "Event emitted"
                );
            }
            Err(_) => {
                debug!(
                    event_type = event.event_type(),
                    "Event emitted but no subscribers listening"
                );
            }
        }
        self.emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn total_events_emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
