//! Shared persistent store
//!
//! The single source of truth for documents, leases and queued events. The
//! whole state lives behind one mutex; every primitive locks, mutates and
//! persists before unlocking, which makes each operation a single atomic
//! read-modify-write as seen by any number of concurrent callers. No caller
//! may trust a process-local copy of a version or a lease across requests.
//!
//! Persistence is a JSONL file of tagged records, rewritten atomically
//! (temp file + fsync + rename) on every mutation and loaded line by line
//! on startup.

mod documents;
mod retry;

pub use retry::{Backoff, RetryingUpdater};

use std::collections::HashMap;
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};

use crate::types::{CoordResult, Lease, QueuedEvent, VersionedDocument};
use crate::utils::atomic::{atomic_write_with, cleanup_temp_files};
use crate::utils::{current_user, now_millis};

/// Configuration for the shared store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the JSONL state file
    pub state_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from("coord.jsonl"),
        }
    }
}

impl StoreConfig {
    /// Create config with a custom state file path
    pub fn with_state_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            state_path: path.as_ref().to_path_buf(),
        }
    }

    /// Resolve config from the environment
    ///
    /// `COORD_STATE_PATH` selects the state file; relative paths are resolved
    /// against the current directory.
    pub fn from_env() -> Self {
        let current_dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let state_path = match env::var("COORD_STATE_PATH") {
            Ok(path) => {
                if Path::new(&path).is_absolute() {
                    PathBuf::from(path)
                } else {
                    current_dir.join(path)
                }
            }
            Err(_) => current_dir.join("coord.jsonl"),
        };
        Self { state_path }
    }

    /// Get the state file path
    pub fn state_path(&self) -> &Path {
        &self.state_path
    }
}

/// One line of the persisted state file
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum Record {
    Document(VersionedDocument),
    Lease(Lease),
    Event(QueuedEvent),
}

/// In-memory image of the persisted state
#[derive(Default)]
pub(crate) struct StoreState {
    pub documents: HashMap<String, VersionedDocument>,
    pub leases: HashMap<String, Lease>,
    pub events: Vec<QueuedEvent>,
    /// Next event id to assign on publish
    pub next_event_id: u64,
}

/// Counts of live rows, for the health endpoint
#[derive(Debug, Clone, Serialize)]
pub struct StoreCounts {
    pub documents: usize,
    pub leases: usize,
    pub events: usize,
}

/// Result of an expiry sweep
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    /// Expired leases deleted
    pub leases_removed: usize,
    /// Expired event claims cleared (the events become reclaimable)
    pub claims_released: usize,
}

/// The shared store all three coordination primitives are built on
pub struct SharedStore {
    config: StoreConfig,
    state: Mutex<StoreState>,
    current_user: String,
}

impl SharedStore {
    /// Open the store configured from the environment
    pub fn new() -> CoordResult<Self> {
        Self::open(StoreConfig::from_env())
    }

    /// Open the store with a custom state file path
    pub fn with_state_path<P: AsRef<Path>>(path: P) -> CoordResult<Self> {
        Self::open(StoreConfig::with_state_path(path))
    }

    /// Open the store: clean stale temp files, then load the state file
    pub fn open(config: StoreConfig) -> CoordResult<Self> {
        if let Some(parent) = config.state_path().parent() {
            cleanup_temp_files(parent)?;
        }
        let state = Self::load_state(config.state_path())?;
        Ok(Self {
            config,
            state: Mutex::new(state),
            current_user: current_user(),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Identity stamped on writes that do not name a user
    pub fn current_user(&self) -> &str {
        &self.current_user
    }

    /// Load state from the JSONL file, skipping unparseable lines
    fn load_state(path: &Path) -> CoordResult<StoreState> {
        let mut state = StoreState {
            next_event_id: 1,
            ..Default::default()
        };

        if !path.exists() {
            return Ok(state);
        }

        let content = fs::read_to_string(path)?;
        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<Record>(line) {
                Ok(Record::Document(doc)) => {
                    state.documents.insert(doc.id.clone(), doc);
                }
                Ok(Record::Lease(lease)) => {
                    state.leases.insert(lease.resource_key.clone(), lease);
                }
                Ok(Record::Event(event)) => {
                    if event.event_id >= state.next_event_id {
                        state.next_event_id = event.event_id + 1;
                    }
                    state.events.push(event);
                }
                Err(e) => {
                    eprintln!(
                        "Warning: skipping unparseable state line {}: {}",
                        line_num + 1,
                        e
                    );
                }
            }
        }

        Ok(state)
    }

    /// Lock the state for a single atomic read-modify-write
    ///
    /// Callers that mutate must call `persist` before dropping the guard.
    pub(crate) fn lock_state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock()
    }

    /// Persist the full state to the JSONL file (caller holds the lock)
    pub(crate) fn persist(&self, state: &StoreState) -> CoordResult<()> {
        let mut lines = Vec::with_capacity(
            state.documents.len() + state.leases.len() + state.events.len(),
        );
        for doc in state.documents.values() {
            lines.push(serde_json::to_string(&Record::Document(doc.clone()))?);
        }
        for lease in state.leases.values() {
            lines.push(serde_json::to_string(&Record::Lease(lease.clone()))?);
        }
        for event in &state.events {
            lines.push(serde_json::to_string(&Record::Event(event.clone()))?);
        }

        atomic_write_with(self.config.state_path(), |file| {
            for line in &lines {
                writeln!(file, "{}", line)?;
            }
            Ok(())
        })
    }

    /// Counts of live rows
    pub fn counts(&self) -> StoreCounts {
        let state = self.lock_state();
        StoreCounts {
            documents: state.documents.len(),
            leases: state.leases.len(),
            events: state.events.len(),
        }
    }

    /// Remove expired leases and clear expired event claims
    ///
    /// Expiry is already enforced at every acquire/claim decision point; the
    /// sweep garbage-collects expired rows so they do not accumulate. Run
    /// periodically by the server binary.
    pub fn sweep_expired(&self) -> CoordResult<SweepReport> {
        let now = now_millis();
        let mut state = self.lock_state();

        let before = state.leases.len();
        state.leases.retain(|_, lease| !lease.is_expired_at(now));
        let leases_removed = before - state.leases.len();

        let mut claims_released = 0;
        for event in state.events.iter_mut() {
            if !event.processed
                && event.locked_until.is_some()
                && !event.has_live_claim_at(now)
            {
                event.locked_until = None;
                event.locked_by = None;
                claims_released += 1;
            }
        }

        if leases_removed > 0 || claims_released > 0 {
            self.persist(&state)?;
        }

        Ok(SweepReport {
            leases_removed,
            claims_released,
        })
    }
}
