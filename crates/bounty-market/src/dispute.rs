//! Dispute records and the governance call-in point.
//!
//! How a ruling is computed (voting, arbitration) lives outside the core;
//! the adapter only checks that the submitter holds the dispute-resolution
//! capability and forwards the binary ruling to the coordinator.

use crate::coordinator::MarketCoordinator;
use bounty_types::{AccountAddress, MarketError, Result, TaskId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Binary outcome of an external dispute-resolution process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisputeRuling {
    /// Bounty refunded fee-free to the creator, task reopened.
    FavorCreator,
    /// Worker paid as if the task had been approved.
    FavorWorker,
}

/// An open or resolved dispute, 1:1 with a disputed task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dispute {
    pub task_id: TaskId,
    pub initiator: AccountAddress,
    pub reason: String,
    pub created_at: i64,
    pub resolved: bool,
    /// Set exactly once, on resolution.
    pub ruling: Option<DisputeRuling>,
}

/// The single entry point from governance into the core.
pub struct DisputeResolverAdapter {
    coordinator: Arc<MarketCoordinator>,
}

impl DisputeResolverAdapter {
    pub fn new(coordinator: Arc<MarketCoordinator>) -> Self {
        Self { coordinator }
    }

    /// Forward an authorized external ruling to the lifecycle coordinator.
    ///
    /// Validates that `resolver` holds the dispute-resolution capability;
    /// it does not second-guess the ruling itself.
    pub async fn submit_ruling(
        &self,
        task_id: TaskId,
        ruling: DisputeRuling,
        resolver: AccountAddress,
    ) -> Result<()> {
        if !self.coordinator.is_authorized_resolver(&resolver).await {
            return Err(MarketError::Unauthorized(format!(
                "{} lacks the dispute-resolution capability",
                resolver
            )));
        }

        info!(
            task_id = %task_id,
            ruling = ?ruling,
            resolver = %resolver,
            "⚖️ External ruling received"
        );

        self.coordinator.resolve_dispute(task_id, ruling).await
    }
}
