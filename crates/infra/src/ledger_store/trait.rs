use std::sync::Arc;

use thiserror::Error;

use stockbook_core::{ExpectedVersion, LedgerError, MovementId, ProductId};
use stockbook_movements::{Movement, Product};

/// Atomic commit unit: one movement plus the balance change it causes.
///
/// A store implementation must apply both writes in one transaction,
/// conditioned on the product still being at `expected_version`. No reader may
/// ever observe the movement without the balance change, or vice versa.
#[derive(Debug, Clone)]
pub struct LedgerCommit {
    pub movement: Movement,
    pub new_stock: i64,
    pub expected_version: ExpectedVersion,
}

/// Ledger store operation error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The conditional write lost a race against another committer.
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// A movement id was committed twice. Ledger entries are never reused.
    #[error("duplicate movement id: {0}")]
    DuplicateMovement(MovementId),

    /// The commit itself is malformed (negative balance, mismatched delta,
    /// duplicate product registration, poisoned lock).
    #[error("invalid commit: {0}")]
    InvalidCommit(String),
}

impl From<StoreError> for LedgerError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::ProductNotFound(id) => LedgerError::ProductNotFound(id),
            // An unretried conflict surfacing through `?` counts as one attempt.
            StoreError::Concurrency(_) => LedgerError::ConcurrencyConflict { attempts: 1 },
            other => LedgerError::Storage(other.to_string()),
        }
    }
}

/// Append-only movement ledger plus the product balances derived from it.
///
/// Movements cannot be modified or deleted through this interface; the only
/// write paths are product registration and the atomic `commit`.
pub trait LedgerStore: Send + Sync {
    /// Register a product row (product-management path, not the updater's).
    fn insert_product(&self, product: Product) -> Result<(), StoreError>;

    /// Load the current product row, including balance and version.
    fn load_product(&self, product_id: ProductId) -> Result<Product, StoreError>;

    /// Ids of every product known to the store.
    fn product_ids(&self) -> Result<Vec<ProductId>, StoreError>;

    /// Atomically append `movement` and move the product balance to
    /// `new_stock`, conditioned on `expected_version`. Returns the updated
    /// product row.
    fn commit(&self, commit: LedgerCommit) -> Result<Product, StoreError>;

    /// Movements for one product, in commit order.
    fn movements_for(&self, product_id: ProductId) -> Result<Vec<Movement>, StoreError>;

    /// Every committed movement, in commit order.
    fn all_movements(&self) -> Result<Vec<Movement>, StoreError>;
}

impl<S> LedgerStore for &S
where
    S: LedgerStore + ?Sized,
{
    fn insert_product(&self, product: Product) -> Result<(), StoreError> {
        (**self).insert_product(product)
    }

    fn load_product(&self, product_id: ProductId) -> Result<Product, StoreError> {
        (**self).load_product(product_id)
    }

    fn product_ids(&self) -> Result<Vec<ProductId>, StoreError> {
        (**self).product_ids()
    }

    fn commit(&self, commit: LedgerCommit) -> Result<Product, StoreError> {
        (**self).commit(commit)
    }

    fn movements_for(&self, product_id: ProductId) -> Result<Vec<Movement>, StoreError> {
        (**self).movements_for(product_id)
    }

    fn all_movements(&self) -> Result<Vec<Movement>, StoreError> {
        (**self).all_movements()
    }
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn insert_product(&self, product: Product) -> Result<(), StoreError> {
        (**self).insert_product(product)
    }

    fn load_product(&self, product_id: ProductId) -> Result<Product, StoreError> {
        (**self).load_product(product_id)
    }

    fn product_ids(&self) -> Result<Vec<ProductId>, StoreError> {
        (**self).product_ids()
    }

    fn commit(&self, commit: LedgerCommit) -> Result<Product, StoreError> {
        (**self).commit(commit)
    }

    fn movements_for(&self, product_id: ProductId) -> Result<Vec<Movement>, StoreError> {
        (**self).movements_for(product_id)
    }

    fn all_movements(&self) -> Result<Vec<Movement>, StoreError> {
        (**self).all_movements()
    }
}
