//! Data types for the coordination toolkit
//!
//! This module contains the core data structures shared by the store,
//! the lease manager and the event queue, plus the error taxonomy.

mod document;
mod error;
mod event;
mod lease;

pub use document::{Patch, VersionedDocument};
pub use error::{CoordError, CoordResult};
pub use event::{FailOutcome, PublishOptions, QueueStats, QueuedEvent};
pub use lease::{Lease, LeaseGrant};
