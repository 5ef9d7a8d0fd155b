//! Infrastructure for the movement ledger: the durable store boundary, the
//! transactional balance updater, idempotent replay protection, ledger
//! reconciliation, and read-side queries.

pub mod balance_updater;
pub mod idempotency;
pub mod ledger_store;
pub mod query;
pub mod reconciliation;
pub mod service;


pub use balance_updater::{AppliedMovement, BalanceUpdater, RetryPolicy};
pub use idempotency::{IdempotencyConfig, IdempotentUpdater};
pub use ledger_store::{InMemoryLedgerStore, LedgerCommit, LedgerStore, StoreError};
pub use query::{MovementFilter, MovementPage, MovementQueryService, Pagination, SortOrder};
pub use reconciliation::{BalanceAudit, ReconciliationService};
pub use service::MovementService;
