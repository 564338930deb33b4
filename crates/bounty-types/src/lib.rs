//! Shared types for the bounty marketplace core.
//!
//! Everything the lifecycle coordinator, escrow manager and reputation
//! engine agree on lives here: account/task identifiers, the token amount
//! newtype, and the error taxonomy returned across the crate boundary.

pub mod amount;
pub mod error;
pub mod id;

pub use amount::TokenAmount;
pub use error::{MarketError, Result};
pub use id::{AccountAddress, TaskId};
