//! Shared application state for API handlers

use std::sync::Arc;

use crate::lease::LeaseManager;
use crate::queue::EventQueue;
use crate::store::SharedStore;

/// State handed to every handler: the store plus the managers built on it
pub struct AppState {
    pub store: Arc<SharedStore>,
    pub leases: LeaseManager,
    pub queue: EventQueue,
}

impl AppState {
    /// Build the managers over one shared store
    pub fn new(store: Arc<SharedStore>) -> Self {
        Self {
            leases: LeaseManager::new(store.clone()),
            queue: EventQueue::new(store.clone()),
            store,
        }
    }
}
