//! Application facade over the movement ledger.
//!
//! Wires validator → idempotency guard → balance updater over one shared
//! store, and exposes the read-side operations beside them. This is the
//! logical operation surface a transport layer binds to.

use std::sync::Arc;

use stockbook_core::{LedgerError, ProductId, UserId};
use stockbook_movements::{
    MovementCommand, MovementDraft, ProductBalance, ProductLookup, validate,
};

use crate::balance_updater::{AppliedMovement, BalanceUpdater, RetryPolicy};
use crate::idempotency::{IdempotencyConfig, IdempotentUpdater};
use crate::ledger_store::LedgerStore;
use crate::query::{MovementFilter, MovementPage, MovementQueryService, Pagination, SortOrder};
use crate::reconciliation::{BalanceAudit, ReconciliationService};

/// Existence pre-check adapter over a ledger store.
struct StoreLookup<'a, S>(&'a S);

impl<S: LedgerStore> ProductLookup for StoreLookup<'_, S> {
    fn exists(&self, product_id: ProductId) -> bool {
        self.0.load_product(product_id).is_ok()
    }
}

/// Movement ledger service: the write path and the read paths next to it.
#[derive(Debug)]
pub struct MovementService<S> {
    store: Arc<S>,
    updater: IdempotentUpdater<Arc<S>>,
    queries: MovementQueryService<Arc<S>>,
    reconciliation: ReconciliationService<Arc<S>>,
}

impl<S: LedgerStore> MovementService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_policies(store, RetryPolicy::default(), IdempotencyConfig::default())
    }

    pub fn with_policies(
        store: Arc<S>,
        retry: RetryPolicy,
        idempotency: IdempotencyConfig,
    ) -> Self {
        let updater = IdempotentUpdater::with_config(
            BalanceUpdater::with_retry(store.clone(), retry),
            idempotency,
        );
        Self {
            updater,
            queries: MovementQueryService::new(store.clone()),
            reconciliation: ReconciliationService::new(store.clone()),
            store,
        }
    }

    /// The only entry point that changes a product balance.
    ///
    /// Validates the draft (collecting all violations), pre-checks product
    /// existence, then applies through the idempotency guard and the
    /// transactional balance updater.
    pub fn create_movement(
        &self,
        draft: &MovementDraft,
        recorded_by: UserId,
    ) -> Result<AppliedMovement, LedgerError> {
        let command = validate(draft, recorded_by, &StoreLookup(self.store.as_ref()))?;
        self.updater.apply(&command)
    }

    /// Typed-command write path for callers past the form boundary.
    pub fn apply(&self, command: &MovementCommand) -> Result<AppliedMovement, LedgerError> {
        self.updater.apply(command)
    }

    /// Paginated, filtered ledger history. Read-only.
    pub fn list_movements(
        &self,
        filter: &MovementFilter,
        pagination: Pagination,
        sort: SortOrder,
    ) -> Result<MovementPage, LedgerError> {
        self.queries.list(filter, pagination, sort)
    }

    /// Balance snapshot for UI previews. Not authoritative for the
    /// transactional sufficiency check, which always re-reads.
    pub fn product_balance(&self, product_id: ProductId) -> Result<ProductBalance, LedgerError> {
        Ok(self.store.load_product(product_id)?.balance())
    }

    /// Diagnostic: recompute the balance from the ledger and report drift.
    pub fn verify_balance(&self, product_id: ProductId) -> Result<BalanceAudit, LedgerError> {
        self.reconciliation.verify(product_id)
    }
}
