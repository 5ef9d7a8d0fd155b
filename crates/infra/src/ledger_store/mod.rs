//! Durable ledger boundary.
//!
//! Defines the storage contract for products and their movement ledgers
//! without making any storage assumptions, plus an in-memory implementation
//! for tests and development.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStore;
pub use r#trait::{LedgerCommit, LedgerStore, StoreError};
