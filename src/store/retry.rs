//! Retrying updater
//!
//! Applies a caller-supplied transform to a document, retrying on version
//! conflicts with randomized exponential backoff. The loop is a bounded state
//! machine with three terminal states: success, `RetryExhausted` and
//! `NotFound`. Every attempt operates on a freshly re-read document; a stale
//! snapshot is never reused.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rand::Rng;

use crate::types::{CoordError, CoordResult, Patch, VersionedDocument};

use super::{documents, SharedStore};

/// Backoff schedule: `min(cap, base * 2^attempt) + uniform(0, jitter)`
///
/// The deterministic exponential term grows monotonically up to the cap; the
/// jitter is additive so delays never shrink below the deterministic term.
/// All three constants are tunable.
#[derive(Debug, Clone)]
pub struct Backoff {
    pub base_ms: u64,
    pub cap_ms: u64,
    pub jitter_ms: u64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base_ms: 50,
            cap_ms: 5_000,
            jitter_ms: 100,
        }
    }
}

impl Backoff {
    /// Delay before retry number `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        // 2^attempt saturates well past any sane cap
        let factor = 1u64 << attempt.min(20);
        let deterministic = self.base_ms.saturating_mul(factor).min(self.cap_ms);
        let jitter = if self.jitter_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..self.jitter_ms)
        };
        Duration::from_millis(deterministic + jitter)
    }
}

/// Applies transforms to documents with conflict retries
pub struct RetryingUpdater {
    store: Arc<SharedStore>,
    backoff: Backoff,
}

impl RetryingUpdater {
    /// Create an updater with the default backoff schedule
    pub fn new(store: Arc<SharedStore>) -> Self {
        Self {
            store,
            backoff: Backoff::default(),
        }
    }

    /// Override the backoff schedule
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Read-transform-write with bounded conflict retries
    ///
    /// The update function receives the current document and returns the
    /// patch to apply, or `None` to report "already in the desired state"
    /// and skip the write entirely (no version churn). On `VersionConflict`
    /// the document is re-read and the update function invoked again with
    /// the fresh state, after a backoff delay. `NotFound` fails immediately:
    /// a deleted document cannot be reconciled by retrying. `max_retries`
    /// of 0 means a single attempt, then fail-fast.
    pub fn update_with_retry<F>(
        &self,
        id: &str,
        max_retries: u32,
        mut update_fn: F,
    ) -> CoordResult<VersionedDocument>
    where
        F: FnMut(&VersionedDocument) -> Option<Patch>,
    {
        let mut conflicts: u32 = 0;

        loop {
            // Always a fresh read; never retry against a stale snapshot
            let current = documents::read(&self.store, id)?;

            let patch = match update_fn(&current) {
                Some(patch) => patch,
                // Idempotent short-circuit: nothing to write
                None => return Ok(current),
            };

            match documents::conditional_update(&self.store, id, current.version, &patch, None) {
                Ok(updated) => return Ok(updated),
                Err(CoordError::VersionConflict { .. }) => {
                    if conflicts >= max_retries {
                        return Err(CoordError::RetryExhausted {
                            id: id.to_string(),
                            attempts: conflicts + 1,
                        });
                    }
                    thread::sleep(self.backoff.delay_for(conflicts));
                    conflicts += 1;
                }
                Err(other) => return Err(other),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn open_store() -> (Arc<SharedStore>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store =
            Arc::new(SharedStore::with_state_path(temp_dir.path().join("coord.jsonl")).unwrap());
        (store, temp_dir)
    }

    fn fast_backoff() -> Backoff {
        Backoff {
            base_ms: 1,
            cap_ms: 4,
            jitter_ms: 2,
        }
    }

    fn status_patch(status: &str) -> Patch {
        let mut patch = Patch::new();
        patch.insert("status".to_string(), json!(status));
        patch
    }

    #[test]
    fn test_backoff_is_monotonic_up_to_the_cap() {
        let backoff = Backoff {
            base_ms: 50,
            cap_ms: 5_000,
            jitter_ms: 0,
        };
        assert_eq!(backoff.delay_for(0), Duration::from_millis(50));
        assert_eq!(backoff.delay_for(1), Duration::from_millis(100));
        assert_eq!(backoff.delay_for(2), Duration::from_millis(200));
        // Capped
        assert_eq!(backoff.delay_for(10), Duration::from_millis(5_000));
        assert_eq!(backoff.delay_for(63), Duration::from_millis(5_000));
    }

    #[test]
    fn test_backoff_jitter_is_additive() {
        let backoff = Backoff {
            base_ms: 100,
            cap_ms: 1_000,
            jitter_ms: 50,
        };
        for _ in 0..32 {
            let delay = backoff.delay_for(0).as_millis() as u64;
            // Never below the deterministic term, never past it by >= jitter
            assert!((100..150).contains(&delay));
        }
    }

    #[test]
    fn test_successful_update_applies_transform() {
        let (store, _tmp) = open_store();
        store
            .create_document("LOAN-1", json!({"status": "pending"}), None)
            .unwrap();

        let updater = RetryingUpdater::new(store.clone());
        let updated = updater
            .update_with_retry("LOAN-1", 3, |_doc| Some(status_patch("approved")))
            .unwrap();

        assert_eq!(updated.version, 2);
        assert_eq!(updated.field("status"), Some(&json!("approved")));
    }

    #[test]
    fn test_no_change_short_circuit_skips_the_write() {
        let (store, _tmp) = open_store();
        store
            .create_document("LOAN-1", json!({"status": "approved"}), None)
            .unwrap();

        let updater = RetryingUpdater::new(store.clone());
        let result = updater
            .update_with_retry("LOAN-1", 3, |doc| {
                if doc.field("status") == Some(&json!("approved")) {
                    None
                } else {
                    Some(status_patch("approved"))
                }
            })
            .unwrap();

        // No version churn
        assert_eq!(result.version, 1);
        assert_eq!(store.read_document("LOAN-1").unwrap().version, 1);
    }

    #[test]
    fn test_not_found_fails_immediately_without_retrying() {
        let (store, _tmp) = open_store();
        let updater = RetryingUpdater::new(store).with_backoff(fast_backoff());

        let mut calls = 0;
        let result = updater.update_with_retry("ghost", 5, |_doc| {
            calls += 1;
            Some(Patch::new())
        });

        match result {
            Err(CoordError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {:?}", other),
        }
        // The update function never ran: the read itself failed
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_zero_retries_means_single_attempt_then_fail_fast() {
        let (store, _tmp) = open_store();
        store
            .create_document("LOAN-1", json!({"n": 0}), None)
            .unwrap();

        let updater = RetryingUpdater::new(store.clone()).with_backoff(fast_backoff());

        // Sabotage every attempt by advancing the version between the
        // updater's read and its conditional write.
        let saboteur = store.clone();
        let mut attempts = 0;
        let result = updater.update_with_retry("LOAN-1", 0, move |doc| {
            attempts += 1;
            let mut bump = Patch::new();
            bump.insert("other".to_string(), json!(attempts));
            saboteur
                .conditional_update("LOAN-1", doc.version, &bump, None)
                .unwrap();
            Some(status_patch("late"))
        });

        match result {
            Err(CoordError::RetryExhausted { attempts, .. }) => assert_eq!(attempts, 1),
            other => panic!("expected RetryExhausted, got {:?}", other),
        }
    }

    #[test]
    fn test_conflict_retry_re_reads_the_fresh_document() {
        let (store, _tmp) = open_store();
        store
            .create_document("LOAN-1", json!({"status": "pending"}), None)
            .unwrap();

        let updater = RetryingUpdater::new(store.clone()).with_backoff(fast_backoff());

        // First invocation sees version 1 and sabotages it; the retry must
        // observe version 2, not the stale snapshot.
        let saboteur = store.clone();
        let mut seen_versions = Vec::new();
        let updated = updater
            .update_with_retry("LOAN-1", 3, |doc| {
                seen_versions.push(doc.version);
                if doc.version == 1 {
                    saboteur
                        .conditional_update("LOAN-1", 1, &status_patch("meddled"), None)
                        .unwrap();
                }
                Some(status_patch("final"))
            })
            .unwrap();

        assert_eq!(updated.version, 3);
        assert_eq!(updated.field("status"), Some(&json!("final")));
        // The update function ran once per attempt, on fresh state each time
        assert_eq!(seen_versions, vec![1, 2]);
    }
}
