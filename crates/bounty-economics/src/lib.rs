//! Balance ledger and escrow custody.
//!
//! The ledger owns every token balance; the escrow manager owns custody of
//! locked bounties and enforces the exactly-once release guarantee. All fund
//! movement flows through `BalanceManager`, which wraps storage-level
//! transactions so a failed multi-leg transfer rolls back completely.

pub mod balance;
pub mod escrow;
pub mod storage;

pub use balance::BalanceManager;
pub use escrow::{EscrowManager, EscrowRecord};
pub use storage::{LedgerStorage, MemoryLedger, TransferRecord};
