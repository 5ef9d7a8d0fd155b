use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use stockbook_core::{MovementId, ProductId};
use stockbook_movements::{Movement, Product};

use super::r#trait::{LedgerCommit, LedgerStore, StoreError};

/// In-memory ledger store.
///
/// Intended for tests/dev. The write lock makes every commit a transaction:
/// the movement append and the balance update become visible together or not
/// at all.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    products: HashMap<ProductId, Product>,
    ledger: Vec<Movement>,
    movement_ids: HashSet<MovementId>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn insert_product(&self, product: Product) -> Result<(), StoreError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::InvalidCommit("lock poisoned".to_string()))?;

        if inner.products.contains_key(&product.id) {
            return Err(StoreError::InvalidCommit(format!(
                "product {} already exists",
                product.id
            )));
        }

        inner.products.insert(product.id, product);
        Ok(())
    }

    fn load_product(&self, product_id: ProductId) -> Result<Product, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::InvalidCommit("lock poisoned".to_string()))?;

        inner
            .products
            .get(&product_id)
            .cloned()
            .ok_or(StoreError::ProductNotFound(product_id))
    }

    fn product_ids(&self) -> Result<Vec<ProductId>, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::InvalidCommit("lock poisoned".to_string()))?;

        Ok(inner.products.keys().copied().collect())
    }

    fn commit(&self, commit: LedgerCommit) -> Result<Product, StoreError> {
        let LedgerCommit {
            movement,
            new_stock,
            expected_version,
        } = commit;

        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::InvalidCommit("lock poisoned".to_string()))?;

        if inner.movement_ids.contains(&movement.id) {
            return Err(StoreError::DuplicateMovement(movement.id));
        }
        if new_stock < 0 {
            return Err(StoreError::InvalidCommit(format!(
                "balance cannot go negative (new_stock={new_stock})"
            )));
        }

        let product = inner
            .products
            .get_mut(&movement.product_id)
            .ok_or(StoreError::ProductNotFound(movement.product_id))?;

        if !expected_version.matches(product.version) {
            return Err(StoreError::Concurrency(format!(
                "expected {expected_version:?}, found {}",
                product.version
            )));
        }

        // The balance change must be exactly the movement's effect.
        if new_stock != product.current_stock + movement.signed_delta() {
            return Err(StoreError::InvalidCommit(format!(
                "balance change does not match movement (current={}, delta={}, new_stock={new_stock})",
                product.current_stock,
                movement.signed_delta()
            )));
        }

        product.current_stock = new_stock;
        product.version += 1;
        product.updated_at = movement.created_at;
        let updated = product.clone();

        inner.movement_ids.insert(movement.id);
        inner.ledger.push(movement);

        Ok(updated)
    }

    fn movements_for(&self, product_id: ProductId) -> Result<Vec<Movement>, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::InvalidCommit("lock poisoned".to_string()))?;

        Ok(inner
            .ledger
            .iter()
            .filter(|m| m.product_id == product_id)
            .cloned()
            .collect())
    }

    fn all_movements(&self) -> Result<Vec<Movement>, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::InvalidCommit("lock poisoned".to_string()))?;

        Ok(inner.ledger.clone())
    }
}
