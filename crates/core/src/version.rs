//! Optimistic-concurrency primitives.

/// Expected version of a product row at write time.
///
/// Conflict detection happens at the store: a conditional write against
/// `Exact(v)` fails if another writer committed first, and the caller retries
/// from a fresh read instead of holding a lock.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip the version check (migrations, backfills).
    Any,
    /// Require the row to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }
}
