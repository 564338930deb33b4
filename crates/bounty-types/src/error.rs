use crate::{TaskId, TokenAmount};
use thiserror::Error;

/// Marketplace error taxonomy.
///
/// Every variant is a local, caller-recoverable condition; the core never
/// aborts the process on any of these. `AlreadyReleased` in particular is
/// the idempotency guard firing correctly, fatal only to the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarketError {
    /// Malformed arguments: empty refs, zero amounts, past deadlines.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Actor lacks the required relationship to the task.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Operation attempted from a state that does not permit it.
    #[error("Invalid state for {operation}: task is {state}")]
    InvalidState { state: String, operation: String },

    /// Escrow lock failed against the payer's funds.
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        required: TokenAmount,
        available: TokenAmount,
    },

    /// Applicant gated out by the task's reputation requirement.
    #[error("Insufficient reputation: required {required}, actual {actual}")]
    InsufficientReputation { required: u64, actual: u64 },

    /// Attempted double fund movement against the same escrow record.
    #[error("Escrow already released for {0}")]
    AlreadyReleased(TaskId),

    /// Administrative parameter outside its allowed bounds.
    #[error("Configuration out of range: {param} = {value} (allowed {min}..={max})")]
    ConfigOutOfRange {
        param: String,
        value: u64,
        min: u64,
        max: u64,
    },

    /// Referenced task, user or dispute does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Creator applying to their own task.
    #[error("Creator cannot apply to their own task {0}")]
    SelfApplication(TaskId),

    /// Duplicate application from the same account.
    #[error("Already applied to {0}")]
    AlreadyApplied(TaskId),

    /// Assignment target never applied for the task.
    #[error("Worker never applied to {0}")]
    NotApplied(TaskId),

    /// Task deadline is in the past.
    #[error("Deadline passed for {0}")]
    DeadlinePassed(TaskId),

    /// Failure surfaced by the balance/token ledger.
    #[error("Ledger error: {0}")]
    Ledger(String),
}

/// Result type for marketplace operations.
pub type Result<T> = std::result::Result<T, MarketError>;
