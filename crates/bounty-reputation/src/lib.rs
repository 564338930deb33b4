//! Reputation scoring engine.
//!
//! A pure fold over task and dispute outcomes: given the current record and
//! an event, `ReputationEngine::apply` produces the next record plus any
//! achievements that unlocked. No interior mutability, no I/O — the
//! lifecycle coordinator owns where records live and when updates commit.

pub mod achievements;
pub mod engine;

pub use achievements::AchievementId;
pub use engine::{
    ReputationConfig, ReputationEngine, ReputationEvent, ReputationRecord, Tier,
};
