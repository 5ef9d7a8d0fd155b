use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockbook_core::ProductId;

/// Product row as the ledger sees it.
///
/// `current_stock` is a derived cache over the movement ledger and is written
/// by the balance updater only. Every other field is owned by the
/// product-management flows, which never touch the balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Balance at creation time; the reconciliation baseline.
    pub initial_stock: i64,
    /// Authoritative cached balance, always >= 0.
    pub current_stock: i64,
    /// Threshold for downstream low-stock alerts (not enforced here).
    pub min_stock: i64,
    /// Threshold for downstream over-stock alerts (not enforced here).
    pub max_stock: i64,
    /// Monotonically advancing token for optimistic concurrency.
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        initial_stock: i64,
        min_stock: i64,
        max_stock: i64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            initial_stock,
            current_stock: initial_stock,
            min_stock,
            max_stock,
            version: 0,
            updated_at: Utc::now(),
        }
    }

    /// Read-side snapshot of the balance and its concurrency token.
    pub fn balance(&self) -> ProductBalance {
        ProductBalance {
            product_id: self.id,
            current_stock: self.current_stock,
            version: self.version,
        }
    }

    pub fn is_below_min(&self) -> bool {
        self.current_stock < self.min_stock
    }

    pub fn is_above_max(&self) -> bool {
        self.current_stock > self.max_stock
    }
}

/// Balance snapshot for read-side callers (UI preview).
///
/// Not authoritative for the transactional sufficiency check, which always
/// re-reads inside the commit attempt.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductBalance {
    pub product_id: ProductId,
    pub current_stock: i64,
    pub version: u64,
}
