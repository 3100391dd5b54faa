//! Queue observability and retention
//!
//! Counters for dashboards plus the retention cleanup that deletes processed
//! events past a configured window. Dead-lettered events count as `failed`
//! and are retained (and eventually cleaned up) like completed ones.

use crate::types::{CoordResult, QueueStats};
use crate::utils::now_millis;

use super::EventQueue;

const MILLIS_PER_DAY: i64 = 86_400_000;

impl EventQueue {
    /// Counts by pending/processing/completed/failed
    pub fn stats(&self) -> QueueStats {
        let now = now_millis();
        let state = self.store().lock_state();

        let mut stats = QueueStats {
            total: state.events.len(),
            ..Default::default()
        };
        for event in &state.events {
            if event.processed {
                if event.failed {
                    stats.failed += 1;
                } else {
                    stats.completed += 1;
                }
            } else if event.has_live_claim_at(now) {
                stats.processing += 1;
            } else {
                stats.pending += 1;
            }
        }
        stats
    }

    /// Delete processed events older than `older_than_days`
    ///
    /// Returns the number of events removed. Unprocessed events are never
    /// touched, whatever their age.
    pub fn cleanup(&self, older_than_days: i64) -> CoordResult<usize> {
        let cutoff = now_millis() - older_than_days.max(0) * MILLIS_PER_DAY;
        let mut state = self.store().lock_state();

        let before = state.events.len();
        state
            .events
            .retain(|e| !e.processed || e.processed_at.unwrap_or(e.created_at) >= cutoff);
        let removed = before - state.events.len();

        if removed > 0 {
            self.store().persist(&state)?;
        }
        Ok(removed)
    }
}
