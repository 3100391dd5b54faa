//! Coord Store - concurrency coordination toolkit
//!
//! Lets many independent, stateless server processes safely mutate shared
//! documents, obtain exclusive access to named resources, and defer slow
//! side-effects without losing work or corrupting state.
//!
//! # Primitives
//!
//! - **Versioned documents**: point reads plus an atomic conditional write
//!   (compare-and-swap on a version field), with a retrying updater on top
//! - **Leases**: distributed mutual exclusion with TTL auto-expiry
//! - **Event queue**: durable publish/claim/complete/fail with priorities,
//!   delayed visibility, bounded retries and dead-lettering
//!
//! Every mutation goes through exactly one of these primitives - never a raw
//! unconditional write. An operation spanning multiple documents should take
//! one lease for the logical group and call the retrying updater per document
//! inside it.
//!
//! # Modules
//!
//! - `types`: core data structures and the error taxonomy
//! - `store`: the shared persistent store, document CAS and the updater
//! - `lease`: the distributed lock
//! - `queue`: the durable event queue
//! - `api`: axum REST layer serving the toolkit to worker processes
//! - `utils`: timestamps and atomic file writes
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use coord_store::{LeaseManager, RetryingUpdater, SharedStore};
//! use serde_json::json;
//!
//! fn main() -> coord_store::CoordResult<()> {
//!     let store = Arc::new(SharedStore::new()?);
//!     store.create_document("LOAN-1", json!({"status": "pending"}), None)?;
//!
//!     let updater = RetryingUpdater::new(store.clone());
//!     let leases = LeaseManager::new(store.clone());
//!
//!     leases.with_lease("loan-batch", 30_000, 3, 200, || {
//!         updater.update_with_retry("LOAN-1", 3, |_doc| {
//!             let mut patch = serde_json::Map::new();
//!             patch.insert("status".into(), json!("approved"));
//!             Some(patch)
//!         })?;
//!         Ok(())
//!     })?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod lease;
pub mod queue;
pub mod store;
pub mod types;
pub mod utils;

// Re-export commonly used items at crate root
pub use lease::LeaseManager;
pub use queue::{EventQueue, RetrySchedule};
pub use store::{Backoff, RetryingUpdater, SharedStore, StoreConfig};
pub use types::{
    CoordError, CoordResult, FailOutcome, Lease, LeaseGrant, Patch, PublishOptions, QueueStats,
    QueuedEvent, VersionedDocument,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
