//! Duplicate-submission protection for movement commands.
//!
//! UI double-clicks and retried network requests must not double-count stock.
//! A caller-supplied idempotency key, scoped to the product, maps to the
//! original committed result for a retention window; a replay within that
//! window returns the original result without touching the ledger.

use std::collections::HashMap;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::debug;

use stockbook_core::{LedgerError, ProductId};
use stockbook_movements::MovementCommand;

use crate::balance_updater::{AppliedMovement, BalanceUpdater};
use crate::ledger_store::LedgerStore;

/// Retention and sizing for the recent-keys index.
#[derive(Debug, Clone)]
pub struct IdempotencyConfig {
    /// How long a key maps to its original result. Keys only matter for
    /// near-duplicate submissions, so this stays short.
    pub retention: Duration,
    /// Upper bound on remembered keys; the oldest entries are evicted first.
    pub max_entries: usize,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            retention: Duration::from_secs(24 * 60 * 60),
            max_entries: 4096,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SubmissionKey {
    product_id: ProductId,
    key: String,
}

#[derive(Debug, Clone)]
enum Slot {
    /// A submission with this key is currently applying; duplicates wait.
    InFlight,
    Done {
        result: AppliedMovement,
        stored_at: Instant,
    },
}

/// Wraps a [`BalanceUpdater`] with exactly-one-effect semantics per
/// `(product_id, idempotency_key)`.
///
/// Failed applications do not consume the key: a resubmission after a
/// `ConcurrencyConflict` retries the movement instead of replaying the error.
#[derive(Debug)]
pub struct IdempotentUpdater<S> {
    inner: BalanceUpdater<S>,
    entries: Mutex<HashMap<SubmissionKey, Slot>>,
    in_flight: Condvar,
    config: IdempotencyConfig,
}

impl<S> IdempotentUpdater<S> {
    pub fn new(inner: BalanceUpdater<S>) -> Self {
        Self::with_config(inner, IdempotencyConfig::default())
    }

    pub fn with_config(inner: BalanceUpdater<S>, config: IdempotencyConfig) -> Self {
        Self {
            inner,
            entries: Mutex::new(HashMap::new()),
            in_flight: Condvar::new(),
            config,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<SubmissionKey, Slot>>, LedgerError> {
        self.entries
            .lock()
            .map_err(|_| LedgerError::Storage("idempotency index lock poisoned".to_string()))
    }

    fn prune(entries: &mut HashMap<SubmissionKey, Slot>, config: &IdempotencyConfig) {
        entries.retain(|_, slot| match slot {
            Slot::Done { stored_at, .. } => stored_at.elapsed() < config.retention,
            Slot::InFlight => true,
        });

        while entries.len() >= config.max_entries {
            let oldest = entries
                .iter()
                .filter_map(|(k, slot)| match slot {
                    Slot::Done { stored_at, .. } => Some((k.clone(), *stored_at)),
                    Slot::InFlight => None,
                })
                .min_by_key(|(_, stored_at)| *stored_at);

            match oldest {
                Some((key, _)) => {
                    entries.remove(&key);
                }
                None => break,
            }
        }
    }
}

impl<S: LedgerStore> IdempotentUpdater<S> {
    /// Apply a movement, replaying the original result for a key seen within
    /// the retention window.
    pub fn apply(&self, command: &MovementCommand) -> Result<AppliedMovement, LedgerError> {
        let Some(raw_key) = command.idempotency_key.clone() else {
            return self.inner.apply(command);
        };
        let key = SubmissionKey {
            product_id: command.product_id,
            key: raw_key,
        };

        enum Seen {
            Replay(AppliedMovement),
            Wait,
            Fresh,
        }

        let mut entries = self.lock()?;
        loop {
            let seen = match entries.get(&key) {
                Some(Slot::Done { result, stored_at })
                    if stored_at.elapsed() < self.config.retention =>
                {
                    Seen::Replay(result.clone())
                }
                Some(Slot::InFlight) => Seen::Wait,
                _ => Seen::Fresh,
            };

            match seen {
                Seen::Replay(result) => {
                    debug!(
                        product_id = %key.product_id,
                        movement_id = %result.movement.id,
                        "duplicate submission replayed from idempotency index"
                    );
                    return Ok(result);
                }
                Seen::Wait => {
                    entries = self.in_flight.wait(entries).map_err(|_| {
                        LedgerError::Storage("idempotency index lock poisoned".to_string())
                    })?;
                }
                Seen::Fresh => break,
            }
        }
        Self::prune(&mut entries, &self.config);
        entries.insert(key.clone(), Slot::InFlight);
        drop(entries);

        let outcome = self.inner.apply(command);

        let mut entries = self.lock()?;
        match &outcome {
            Ok(applied) => {
                entries.insert(
                    key,
                    Slot::Done {
                        result: applied.clone(),
                        stored_at: Instant::now(),
                    },
                );
            }
            Err(_) => {
                entries.remove(&key);
            }
        }
        drop(entries);
        self.in_flight.notify_all();

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use stockbook_core::UserId;
    use stockbook_movements::{MovementReason, MovementType, Product};

    use crate::ledger_store::InMemoryLedgerStore;

    fn command(
        product_id: ProductId,
        movement_type: MovementType,
        quantity: i64,
        key: Option<&str>,
    ) -> MovementCommand {
        MovementCommand {
            product_id,
            movement_type,
            quantity,
            reason: MovementReason::Sale,
            reference: None,
            notes: None,
            recorded_by: UserId::new(),
            idempotency_key: key.map(str::to_string),
        }
    }

    fn setup(initial_stock: i64) -> (Arc<InMemoryLedgerStore>, ProductId) {
        let store = Arc::new(InMemoryLedgerStore::new());
        let product_id = ProductId::new();
        store
            .insert_product(Product::new(product_id, "Widget", initial_stock, 0, 1000))
            .unwrap();
        (store, product_id)
    }

    #[test]
    fn duplicate_key_replays_the_original_result() {
        let (store, product_id) = setup(10);
        let updater = IdempotentUpdater::new(BalanceUpdater::new(store.clone()));
        let cmd = command(product_id, MovementType::In, 5, Some("submit-1"));

        let first = updater.apply(&cmd).unwrap();
        let second = updater.apply(&cmd).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.all_movements().unwrap().len(), 1);
        assert_eq!(store.load_product(product_id).unwrap().current_stock, 15);
    }

    #[test]
    fn distinct_keys_apply_independently() {
        let (store, product_id) = setup(0);
        let updater = IdempotentUpdater::new(BalanceUpdater::new(store.clone()));

        updater
            .apply(&command(product_id, MovementType::In, 1, Some("a")))
            .unwrap();
        updater
            .apply(&command(product_id, MovementType::In, 1, Some("b")))
            .unwrap();

        assert_eq!(store.load_product(product_id).unwrap().current_stock, 2);
    }

    #[test]
    fn keys_are_scoped_per_product() {
        let (store, first) = setup(0);
        let second = ProductId::new();
        store
            .insert_product(Product::new(second, "Other", 0, 0, 1000))
            .unwrap();
        let updater = IdempotentUpdater::new(BalanceUpdater::new(store.clone()));

        updater
            .apply(&command(first, MovementType::In, 1, Some("k")))
            .unwrap();
        updater
            .apply(&command(second, MovementType::In, 1, Some("k")))
            .unwrap();

        assert_eq!(store.all_movements().unwrap().len(), 2);
    }

    #[test]
    fn failed_application_does_not_consume_the_key() {
        let (store, product_id) = setup(2);
        let updater = IdempotentUpdater::new(BalanceUpdater::new(store.clone()));
        let over = command(product_id, MovementType::Out, 5, Some("retry-me"));

        assert!(matches!(
            updater.apply(&over).unwrap_err(),
            LedgerError::InsufficientStock { .. }
        ));

        // Restock, then resubmit the same key: it must re-apply, not replay
        // the cached failure.
        updater
            .apply(&command(product_id, MovementType::In, 10, None))
            .unwrap();
        let applied = updater.apply(&over).unwrap();
        assert_eq!(applied.new_balance, 7);
    }

    #[test]
    fn expired_keys_are_applied_again() {
        let (store, product_id) = setup(0);
        let updater = IdempotentUpdater::with_config(
            BalanceUpdater::new(store.clone()),
            IdempotencyConfig {
                retention: Duration::ZERO,
                max_entries: 16,
            },
        );
        let cmd = command(product_id, MovementType::In, 1, Some("stale"));

        updater.apply(&cmd).unwrap();
        updater.apply(&cmd).unwrap();

        assert_eq!(store.all_movements().unwrap().len(), 2);
    }

    #[test]
    fn concurrent_duplicates_apply_exactly_once() {
        let (store, product_id) = setup(0);
        let updater = Arc::new(IdempotentUpdater::new(BalanceUpdater::new(store.clone())));
        let cmd = command(product_id, MovementType::In, 4, Some("double-click"));

        let barrier = Arc::new(std::sync::Barrier::new(2));
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let updater = updater.clone();
                let cmd = cmd.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    updater.apply(&cmd).unwrap()
                })
            })
            .collect();

        let results: Vec<AppliedMovement> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results[0], results[1]);
        assert_eq!(store.all_movements().unwrap().len(), 1);
        assert_eq!(store.load_product(product_id).unwrap().current_stock, 4);
    }
}
