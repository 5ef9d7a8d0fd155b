//! Ledger-vs-balance reconciliation.
//!
//! Recomputes each product's expected balance from the full movement history
//! and compares it against the stored `current_stock`. Given the atomic commit
//! path, drift should be impossible; this guards against migration bugs,
//! manual data edits, and schema drift. Drift is reported and logged, never
//! auto-corrected.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use stockbook_core::{LedgerError, ProductId};

use crate::ledger_store::LedgerStore;

/// Result of auditing one product.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceAudit {
    pub product_id: ProductId,
    /// `initial_stock + Σ in − Σ out` over the full ledger.
    pub expected: i64,
    /// The stored `current_stock`.
    pub actual: i64,
    /// `actual − expected`; zero when consistent.
    pub drift: i64,
    /// Number of ledger entries considered.
    pub movements: u64,
    pub checked_at: DateTime<Utc>,
}

impl BalanceAudit {
    pub fn is_consistent(&self) -> bool {
        self.drift == 0
    }
}

/// On-demand and scheduled balance audits. Read-only.
#[derive(Debug)]
pub struct ReconciliationService<S> {
    store: S,
}

impl<S: LedgerStore> ReconciliationService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Recompute the expected balance from the ledger and compare it to the
    /// stored one. Drift is logged at `warn`, then returned to the caller.
    pub fn verify(&self, product_id: ProductId) -> Result<BalanceAudit, LedgerError> {
        let product = self.store.load_product(product_id)?;
        let movements = self.store.movements_for(product_id)?;

        let mut expected = product.initial_stock;
        for m in &movements {
            expected = expected
                .checked_add(m.signed_delta())
                .ok_or_else(|| LedgerError::Storage("ledger sum overflow".to_string()))?;
        }

        let audit = BalanceAudit {
            product_id,
            expected,
            actual: product.current_stock,
            drift: product.current_stock - expected,
            movements: movements.len() as u64,
            checked_at: Utc::now(),
        };

        if audit.is_consistent() {
            debug!(product_id = %product_id, balance = audit.actual, "balance verified");
        } else {
            warn!(
                product_id = %product_id,
                expected = audit.expected,
                actual = audit.actual,
                drift = audit.drift,
                "balance drift detected"
            );
        }

        Ok(audit)
    }

    /// Hard-fail form of [`verify`](Self::verify) for callers that treat any
    /// drift as an error.
    pub fn check(&self, product_id: ProductId) -> Result<BalanceAudit, LedgerError> {
        let audit = self.verify(product_id)?;
        if audit.is_consistent() {
            Ok(audit)
        } else {
            Err(LedgerError::DriftDetected {
                expected: audit.expected,
                actual: audit.actual,
            })
        }
    }

    /// Audit every product in the store.
    pub fn verify_all(&self) -> Result<Vec<BalanceAudit>, LedgerError> {
        self.store
            .product_ids()?
            .into_iter()
            .map(|product_id| self.verify(product_id))
            .collect()
    }
}

/// Run periodic audits until `shutdown` is set.
///
/// Out-of-band job; never in the request path. The caller owns the thread.
pub fn run_periodic<S: LedgerStore>(
    service: &ReconciliationService<S>,
    interval: Duration,
    shutdown: &AtomicBool,
) {
    while !shutdown.load(Ordering::Relaxed) {
        match service.verify_all() {
            Ok(audits) => {
                let drifted = audits.iter().filter(|a| !a.is_consistent()).count();
                if drifted > 0 {
                    warn!(drifted, "periodic reconciliation found drifted balances");
                }
            }
            Err(err) => warn!(error = %err, "periodic reconciliation failed"),
        }

        // Sleep in small slices so shutdown stays responsive.
        let mut remaining = interval;
        while !shutdown.load(Ordering::Relaxed) && !remaining.is_zero() {
            let step = remaining.min(Duration::from_millis(25));
            std::thread::sleep(step);
            remaining -= step;
        }
    }
}
