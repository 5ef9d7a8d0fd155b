//! Transactional core: the only writer of `Product::current_stock`.
//!
//! Each apply is one read-modify-write attempt committed through the store's
//! conditional write. Lost races are retried from a fresh read with jittered
//! exponential backoff; the sufficiency check always runs against the read of
//! the current attempt, never against a caller-supplied balance.

use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tracing::{debug, info, warn};

use stockbook_core::{ExpectedVersion, LedgerError, MovementId, ValidationError};
use stockbook_movements::{Movement, MovementCommand, MovementType};

use crate::ledger_store::{LedgerCommit, LedgerStore, StoreError};

/// Retry policy for optimistic-concurrency conflicts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Full-jitter exponential backoff for the given 1-based attempt.
    fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(10);
        let ceiling = self
            .base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay);
        if ceiling.is_zero() {
            return Duration::ZERO;
        }
        let jitter = rand::thread_rng().gen_range(0..=ceiling.as_millis() as u64);
        Duration::from_millis(jitter)
    }
}

/// Outcome of a committed movement: the ledger entry and the balance it left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMovement {
    pub movement: Movement,
    pub new_balance: i64,
    pub version: u64,
}

/// Applies validated movement commands against a ledger store.
#[derive(Debug)]
pub struct BalanceUpdater<S> {
    store: S,
    retry: RetryPolicy,
}

impl<S> BalanceUpdater<S> {
    pub fn new(store: S) -> Self {
        Self::with_retry(store, RetryPolicy::default())
    }

    pub fn with_retry(store: S, mut retry: RetryPolicy) -> Self {
        retry.max_attempts = retry.max_attempts.max(1);
        Self { store, retry }
    }
}

impl<S: LedgerStore> BalanceUpdater<S> {
    /// Apply a movement: read the product, check sufficiency, commit the
    /// ledger entry and the balance change in one conditional write.
    ///
    /// Returns `InsufficientStock` for an issue exceeding the balance at
    /// apply-time and `ConcurrencyConflict` once the retry ceiling is
    /// exhausted. Neither leaves any partial state behind.
    pub fn apply(&self, command: &MovementCommand) -> Result<AppliedMovement, LedgerError> {
        if command.quantity <= 0 {
            return Err(ValidationError::single("quantity", "must be a positive integer").into());
        }

        for attempt in 1..=self.retry.max_attempts {
            let product = self.store.load_product(command.product_id)?;

            if command.movement_type == MovementType::Out
                && command.quantity > product.current_stock
            {
                return Err(LedgerError::InsufficientStock {
                    requested: command.quantity,
                    available: product.current_stock,
                });
            }

            let new_stock = product
                .current_stock
                .checked_add(command.movement_type.signum() * command.quantity)
                .ok_or_else(|| LedgerError::Storage("balance overflow".to_string()))?;

            let movement = Movement {
                id: MovementId::new(),
                product_id: command.product_id,
                movement_type: command.movement_type,
                quantity: command.quantity,
                reason: command.reason,
                reference: command.reference.clone(),
                notes: command.notes.clone(),
                recorded_by: command.recorded_by,
                created_at: Utc::now(),
                idempotency_key: command.idempotency_key.clone(),
            };

            match self.store.commit(LedgerCommit {
                movement: movement.clone(),
                new_stock,
                expected_version: ExpectedVersion::Exact(product.version),
            }) {
                Ok(updated) => {
                    info!(
                        product_id = %updated.id,
                        movement_id = %movement.id,
                        movement_type = movement.movement_type.as_str(),
                        quantity = movement.quantity,
                        new_balance = updated.current_stock,
                        "movement committed"
                    );
                    if updated.is_below_min() {
                        warn!(
                            product_id = %updated.id,
                            current_stock = updated.current_stock,
                            min_stock = updated.min_stock,
                            "stock below minimum threshold"
                        );
                    }
                    return Ok(AppliedMovement {
                        new_balance: updated.current_stock,
                        version: updated.version,
                        movement,
                    });
                }
                Err(StoreError::Concurrency(_)) => {
                    debug!(
                        product_id = %command.product_id,
                        attempt,
                        "optimistic concurrency conflict, retrying"
                    );
                    if attempt < self.retry.max_attempts {
                        std::thread::sleep(self.retry.delay_for(attempt));
                    }
                }
                Err(other) => return Err(other.into()),
            }
        }

        warn!(
            product_id = %command.product_id,
            attempts = self.retry.max_attempts,
            "giving up after repeated concurrency conflicts"
        );
        Err(LedgerError::ConcurrencyConflict {
            attempts: self.retry.max_attempts,
        })
    }
}
