//! # Bounty Market Core
//!
//! Task lifecycle state machine with escrowed bounties.
//!
//! ## Overview
//!
//! Creators post tasks backed by locked token rewards, workers apply and get
//! assigned, submit completion proofs, and receive payment minus a platform
//! fee. A dispute path can override normal completion outcomes, and every
//! outcome feeds the reputation engine.
//!
//! ## Architecture
//!
//! - **Lifecycle coordinator**: validates transitions and drives escrow and
//!   reputation inside one logical transaction per operation
//! - **Escrow custody**: exactly-once release or refund per task
//!   (`bounty-economics`)
//! - **Reputation**: pure score/tier/achievement folds (`bounty-reputation`)
//! - **Dispute adapter**: the single call-in point for external governance
//!   rulings
//! - **Events**: broadcast stream for external indexing and notification;
//!   the core never consumes its own events
//!
//! ## State machine
//!
//! ```text
//! Open --assign--> Assigned --submit--> Submitted --approve--> Completed
//! Open|Assigned --cancel--> Cancelled
//! Assigned|Submitted --dispute--> Disputed --resolve--> Completed | Open
//! ```

pub mod coordinator;
pub mod dispute;
pub mod events;
pub mod types;

pub use coordinator::MarketCoordinator;
pub use dispute::{Dispute, DisputeResolverAdapter, DisputeRuling};
pub use events::{EventBus, MarketEvent};
pub use types::{MarketConfig, Task, TaskStatus, UserStats, FEE_BASIS, MAX_FEE_RATE_BPS};
