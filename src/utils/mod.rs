//! Utility functions (timestamps, atomic file writes)

pub mod atomic;
pub mod time;

pub use time::{current_user, now_millis};
