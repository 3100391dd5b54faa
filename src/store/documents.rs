//! Versioned document operations
//!
//! All three operations hold the store lock for their entire
//! read-modify-persist span, so each is atomic with respect to every other
//! store operation. A conditional update that names a stale version fails
//! without touching the document.

use serde_json::Value;

use crate::types::{CoordError, CoordResult, Patch, VersionedDocument};
use crate::utils::now_millis;

use super::SharedStore;

/// Point read of a document by id
pub fn read(store: &SharedStore, id: &str) -> CoordResult<VersionedDocument> {
    let state = store.lock_state();
    state
        .documents
        .get(id)
        .cloned()
        .ok_or_else(|| CoordError::NotFound(id.to_string()))
}

/// Create a document at version 1
///
/// Fails with `DocumentExists` if the id is already present; creation is the
/// owning application's job and happens exactly once per document. The
/// payload must be a JSON object, since patches are object merges.
pub fn create(
    store: &SharedStore,
    id: &str,
    payload: Value,
    updated_by: Option<&str>,
) -> CoordResult<VersionedDocument> {
    if !payload.is_object() {
        return Err(CoordError::InvalidPayload(id.to_string()));
    }

    let mut state = store.lock_state();
    if state.documents.contains_key(id) {
        return Err(CoordError::DocumentExists(id.to_string()));
    }

    let user = updated_by.unwrap_or(store.current_user()).to_string();
    let doc = VersionedDocument::new(id.to_string(), payload, user, now_millis());

    state.documents.insert(id.to_string(), doc.clone());
    store.persist(&state)?;
    Ok(doc)
}

/// Compare-and-swap write
///
/// Succeeds only if the stored version equals `expected_version`; then merges
/// the patch, sets version = expected_version + 1 and stamps
/// `updatedAt`/`updatedBy`. On a stale version, fails with `VersionConflict`
/// carrying the current version and leaves the document unchanged.
pub fn conditional_update(
    store: &SharedStore,
    id: &str,
    expected_version: u64,
    patch: &Patch,
    updated_by: Option<&str>,
) -> CoordResult<VersionedDocument> {
    let mut state = store.lock_state();
    let current_version = match state.documents.get(id) {
        Some(doc) => doc.version,
        None => return Err(CoordError::NotFound(id.to_string())),
    };

    if current_version != expected_version {
        return Err(CoordError::VersionConflict {
            id: id.to_string(),
            expected: expected_version,
            current: current_version,
        });
    }

    let user = updated_by.unwrap_or(store.current_user()).to_string();
    // Version matched: apply the patch and advance the version by exactly one
    if let Some(doc) = state.documents.get_mut(id) {
        doc.apply_patch(patch);
        doc.version = expected_version + 1;
        doc.updated_at = now_millis();
        doc.updated_by = user;
    }

    let updated = state
        .documents
        .get(id)
        .cloned()
        .ok_or_else(|| CoordError::NotFound(id.to_string()))?;
    store.persist(&state)?;
    Ok(updated)
}

impl SharedStore {
    /// See [`read`]
    pub fn read_document(&self, id: &str) -> CoordResult<VersionedDocument> {
        read(self, id)
    }

    /// See [`create`]
    pub fn create_document(
        &self,
        id: &str,
        payload: Value,
        updated_by: Option<&str>,
    ) -> CoordResult<VersionedDocument> {
        create(self, id, payload, updated_by)
    }

    /// See [`conditional_update`]
    pub fn conditional_update(
        &self,
        id: &str,
        expected_version: u64,
        patch: &Patch,
        updated_by: Option<&str>,
    ) -> CoordResult<VersionedDocument> {
        conditional_update(self, id, expected_version, patch, updated_by)
    }
}
