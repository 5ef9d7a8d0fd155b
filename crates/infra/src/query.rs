//! Read-only movement queries.
//!
//! Paginated, filtered access to the ledger for history views and audits.
//! Never touches balances; no consistency concerns beyond read-after-write on
//! the underlying store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockbook_core::{LedgerError, ProductId};
use stockbook_movements::{Movement, MovementType};

use crate::ledger_store::LedgerStore;

/// Pagination parameters for movement queries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of movements to return.
    pub limit: u32,
    /// Offset for pagination (0-based).
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(50).min(1000),
            offset: offset.unwrap_or(0),
        }
    }
}

/// Sort direction over `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    /// Newest first; what a movement history view shows.
    #[default]
    Descending,
}

/// Filter criteria for movement queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovementFilter {
    pub product_id: Option<ProductId>,
    pub movement_type: Option<MovementType>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

impl MovementFilter {
    fn matches(&self, movement: &Movement) -> bool {
        if let Some(product_id) = self.product_id {
            if movement.product_id != product_id {
                return false;
            }
        }
        if let Some(movement_type) = self.movement_type {
            if movement.movement_type != movement_type {
                return false;
            }
        }
        if let Some(after) = self.created_after {
            if movement.created_at < after {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if movement.created_at > before {
                return false;
            }
        }
        true
    }
}

/// Paginated query result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementPage {
    pub movements: Vec<Movement>,
    /// Total matches across all pages.
    pub total: u64,
    pub pagination: Pagination,
    pub has_more: bool,
}

/// Read-only movement query service.
#[derive(Debug)]
pub struct MovementQueryService<S> {
    store: S,
}

impl<S: LedgerStore> MovementQueryService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn list(
        &self,
        filter: &MovementFilter,
        pagination: Pagination,
        sort: SortOrder,
    ) -> Result<MovementPage, LedgerError> {
        let mut movements = match filter.product_id {
            Some(product_id) => self.store.movements_for(product_id)?,
            None => self.store.all_movements()?,
        };
        movements.retain(|m| filter.matches(m));

        // Stable sort: equal timestamps keep commit order.
        movements.sort_by_key(|m| m.created_at);
        if sort == SortOrder::Descending {
            movements.reverse();
        }

        let total = movements.len() as u64;
        let start = (pagination.offset as usize).min(movements.len());
        let end = (start + pagination.limit as usize).min(movements.len());
        let page = movements[start..end].to_vec();
        let has_more = (end as u64) < total;

        Ok(MovementPage {
            movements: page,
            total,
            pagination,
            has_more,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use stockbook_core::{MovementId, UserId};
    use stockbook_movements::{MovementReason, Product};

    use crate::ledger_store::{InMemoryLedgerStore, LedgerCommit};
    use stockbook_core::ExpectedVersion;

    fn seed(store: &InMemoryLedgerStore, entries: &[(MovementType, i64)]) -> ProductId {
        let product_id = ProductId::new();
        store
            .insert_product(Product::new(product_id, "Widget", 1000, 0, 10_000))
            .unwrap();

        let mut stock = 1000;
        let mut version = 0;
        let base = Utc::now();
        for (idx, (movement_type, quantity)) in entries.iter().enumerate() {
            let movement = Movement {
                id: MovementId::new(),
                product_id,
                movement_type: *movement_type,
                quantity: *quantity,
                reason: MovementReason::Adjustment,
                reference: None,
                notes: None,
                recorded_by: UserId::new(),
                created_at: base + ChronoDuration::seconds(idx as i64),
                idempotency_key: None,
            };
            stock += movement.signed_delta();
            store
                .commit(LedgerCommit {
                    movement,
                    new_stock: stock,
                    expected_version: ExpectedVersion::Exact(version),
                })
                .unwrap();
            version += 1;
        }
        product_id
    }

    #[test]
    fn filters_by_type_and_product() {
        let store = InMemoryLedgerStore::new();
        let product_id = seed(
            &store,
            &[
                (MovementType::In, 10),
                (MovementType::Out, 3),
                (MovementType::In, 7),
            ],
        );
        seed(&store, &[(MovementType::In, 99)]);

        let queries = MovementQueryService::new(&store);
        let page = queries
            .list(
                &MovementFilter {
                    product_id: Some(product_id),
                    movement_type: Some(MovementType::In),
                    ..MovementFilter::default()
                },
                Pagination::default(),
                SortOrder::Ascending,
            )
            .unwrap();

        assert_eq!(page.total, 2);
        assert!(page.movements.iter().all(|m| {
            m.product_id == product_id && m.movement_type == MovementType::In
        }));
    }

    #[test]
    fn date_range_bounds_are_inclusive_of_interior_entries() {
        let store = InMemoryLedgerStore::new();
        seed(
            &store,
            &[
                (MovementType::In, 1),
                (MovementType::In, 2),
                (MovementType::In, 3),
            ],
        );

        let queries = MovementQueryService::new(&store);
        let all = queries
            .list(
                &MovementFilter::default(),
                Pagination::default(),
                SortOrder::Ascending,
            )
            .unwrap();
        let middle = all.movements[1].created_at;

        let page = queries
            .list(
                &MovementFilter {
                    created_after: Some(middle),
                    ..MovementFilter::default()
                },
                Pagination::default(),
                SortOrder::Ascending,
            )
            .unwrap();

        assert_eq!(page.total, 2);
        assert_eq!(page.movements[0].quantity, 2);
    }

    #[test]
    fn pagination_reports_remaining_pages() {
        let store = InMemoryLedgerStore::new();
        seed(
            &store,
            &[
                (MovementType::In, 1),
                (MovementType::In, 2),
                (MovementType::In, 3),
            ],
        );

        let queries = MovementQueryService::new(&store);
        let page = queries
            .list(
                &MovementFilter::default(),
                Pagination {
                    limit: 2,
                    offset: 0,
                },
                SortOrder::Ascending,
            )
            .unwrap();

        assert_eq!(page.movements.len(), 2);
        assert_eq!(page.total, 3);
        assert!(page.has_more);

        let rest = queries
            .list(
                &MovementFilter::default(),
                Pagination {
                    limit: 2,
                    offset: 2,
                },
                SortOrder::Ascending,
            )
            .unwrap();
        assert_eq!(rest.movements.len(), 1);
        assert!(!rest.has_more);
    }

    #[test]
    fn default_sort_is_newest_first() {
        let store = InMemoryLedgerStore::new();
        seed(&store, &[(MovementType::In, 1), (MovementType::In, 2)]);

        let queries = MovementQueryService::new(&store);
        let page = queries
            .list(
                &MovementFilter::default(),
                Pagination::default(),
                SortOrder::default(),
            )
            .unwrap();

        assert_eq!(page.movements[0].quantity, 2);
        assert_eq!(page.movements[1].quantity, 1);
    }
}
