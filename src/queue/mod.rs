//! Durable event queue
//!
//! Publish/claim/complete/fail queue for deferring slow side-effects off the
//! request path. Claims are TTL-bounded: a crashed worker's claim expires and
//! the event becomes reclaimable, so delivery is at-least-once and consumers
//! must be idempotent. Failures are retried with exponential delay up to the
//! event's retry budget, then dead-lettered for manual inspection.

mod stats;

use std::sync::Arc;

use serde_json::Value;

use crate::store::SharedStore;
use crate::types::{CoordError, CoordResult, FailOutcome, PublishOptions, QueuedEvent};
use crate::utils::now_millis;

/// Delay schedule for failed events: `min(cap, base * 2^attempts)`
///
/// Deterministic (no jitter): this is a server-side schedule and callers may
/// assume monotonic growth.
#[derive(Debug, Clone)]
pub struct RetrySchedule {
    pub base_ms: i64,
    pub cap_ms: i64,
}

impl Default for RetrySchedule {
    fn default() -> Self {
        Self {
            base_ms: 1_000,
            cap_ms: 300_000,
        }
    }
}

impl RetrySchedule {
    /// Delay before an event that has been attempted `attempts` times
    /// becomes claimable again
    pub fn delay_for(&self, attempts: u32) -> i64 {
        let factor = 1i64 << attempts.min(20);
        self.base_ms.saturating_mul(factor).min(self.cap_ms)
    }
}

/// The durable publish/claim/complete/fail queue
pub struct EventQueue {
    store: Arc<SharedStore>,
    schedule: RetrySchedule,
}

impl EventQueue {
    /// Create a queue with the default retry schedule
    pub fn new(store: Arc<SharedStore>) -> Self {
        Self {
            store,
            schedule: RetrySchedule::default(),
        }
    }

    /// Override the retry schedule
    pub fn with_schedule(mut self, schedule: RetrySchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub(crate) fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Publish an event; returns its id
    ///
    /// The event becomes claimable at `now + delay_ms` (default immediately).
    pub fn publish(
        &self,
        event_type: &str,
        payload: Value,
        opts: PublishOptions,
    ) -> CoordResult<u64> {
        let now = now_millis();
        let mut state = self.store.lock_state();

        let event_id = state.next_event_id;
        state.next_event_id += 1;

        state.events.push(QueuedEvent {
            event_id,
            event_type: event_type.to_string(),
            payload,
            created_at: now,
            available_at: now + opts.delay_ms.max(0),
            locked_until: None,
            locked_by: None,
            attempts: 0,
            max_retries: opts.max_retries,
            priority: opts.priority,
            processed: false,
            failed: false,
            processed_at: None,
            result: None,
            last_error: None,
        });

        self.store.persist(&state)?;
        Ok(event_id)
    }

    /// Claim at most one event for `worker_id`
    ///
    /// Among claimable events (optionally filtered by type) the one with the
    /// highest priority is selected, ties broken by creation order. The
    /// selected event is atomically locked for `lock_duration_ms` and its
    /// attempt counter incremented. `Ok(None)` means nothing was claimable,
    /// a normal empty result rather than an error.
    pub fn claim(
        &self,
        event_type: Option<&str>,
        worker_id: &str,
        lock_duration_ms: i64,
    ) -> CoordResult<Option<QueuedEvent>> {
        let now = now_millis();
        let mut state = self.store.lock_state();

        let mut best: Option<usize> = None;
        for (idx, event) in state.events.iter().enumerate() {
            if !event.is_claimable_at(now) {
                continue;
            }
            if let Some(wanted) = event_type {
                if event.event_type != wanted {
                    continue;
                }
            }
            best = match best {
                None => Some(idx),
                Some(current) => {
                    let cur = &state.events[current];
                    // Priority desc, then createdAt asc, then id asc
                    let better = (event.priority, -event.created_at, u64::MAX - event.event_id)
                        > (cur.priority, -cur.created_at, u64::MAX - cur.event_id);
                    if better { Some(idx) } else { Some(current) }
                }
            };
        }

        let Some(idx) = best else {
            return Ok(None);
        };

        let event = &mut state.events[idx];
        event.locked_until = Some(now + lock_duration_ms);
        event.locked_by = Some(worker_id.to_string());
        event.attempts += 1;
        let claimed = event.clone();

        self.store.persist(&state)?;
        Ok(Some(claimed))
    }

    /// Fetch one event by id (operator inspection of dead letters)
    pub fn get(&self, event_id: u64) -> CoordResult<QueuedEvent> {
        let state = self.store.lock_state();
        state
            .events
            .iter()
            .find(|e| e.event_id == event_id)
            .cloned()
            .ok_or(CoordError::EventNotFound(event_id))
    }

    /// Mark an event processed and record its result
    ///
    /// Guarded by `worker_id`: if the caller's claim has lapsed and another
    /// worker re-claimed the event (or already finished it), this is a
    /// harmless no-op returning `false`.
    pub fn complete(
        &self,
        event_id: u64,
        worker_id: &str,
        result: Option<Value>,
    ) -> CoordResult<bool> {
        let mut state = self.store.lock_state();

        let event = state
            .events
            .iter_mut()
            .find(|e| e.event_id == event_id)
            .ok_or(CoordError::EventNotFound(event_id))?;

        if event.processed || event.locked_by.as_deref() != Some(worker_id) {
            return Ok(false);
        }

        event.processed = true;
        event.failed = false;
        event.processed_at = Some(now_millis());
        event.result = result;
        event.locked_until = None;
        event.locked_by = None;

        self.store.persist(&state)?;
        Ok(true)
    }

    /// Record a failure for a claimed event
    ///
    /// If the retry budget is exhausted (`attempts >= max_retries`) the event
    /// is permanently dead-lettered (`processed = true, failed = true`) and
    /// excluded from all future claims. Otherwise a retry is scheduled at
    /// `now + min(cap, base * 2^attempts)` and the claim is cleared so any
    /// worker may pick it up. Like `complete`, a caller whose claim has
    /// lapsed gets `Ignored`.
    pub fn fail(&self, event_id: u64, worker_id: &str, error: &str) -> CoordResult<FailOutcome> {
        let now = now_millis();
        let mut state = self.store.lock_state();

        let event = state
            .events
            .iter_mut()
            .find(|e| e.event_id == event_id)
            .ok_or(CoordError::EventNotFound(event_id))?;

        if event.processed || event.locked_by.as_deref() != Some(worker_id) {
            return Ok(FailOutcome::Ignored);
        }

        event.last_error = Some(error.to_string());
        event.locked_until = None;
        event.locked_by = None;

        let outcome = if event.attempts >= event.max_retries {
            event.processed = true;
            event.failed = true;
            event.processed_at = Some(now);
            FailOutcome::DeadLettered
        } else {
            let next_available_at = now + self.schedule.delay_for(event.attempts);
            event.available_at = next_available_at;
            FailOutcome::Retried { next_available_at }
        };

        self.store.persist(&state)?;
        Ok(outcome)
    }
}
