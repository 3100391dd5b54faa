//! Distributed lease manager
//!
//! True mutual exclusion for critical sections that span multiple documents
//! or an external rate-limited resource, where per-document versioning is not
//! enough. Acquisition is a single insert-if-absent-or-expired performed
//! under the store lock: when two callers race, exactly one wins. A crashed
//! holder self-heals because exclusivity ends when the TTL elapses, with no
//! explicit release required.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use uuid::Uuid;

use crate::store::SharedStore;
use crate::types::{CoordError, CoordResult, Lease, LeaseGrant};
use crate::utils::now_millis;

/// Manager for TTL-bounded exclusive leases
pub struct LeaseManager {
    store: Arc<SharedStore>,
}

impl LeaseManager {
    pub fn new(store: Arc<SharedStore>) -> Self {
        Self { store }
    }

    /// Try to acquire the lease on `resource_key` for `ttl_ms`
    ///
    /// Atomic insert-if-absent-or-expired: the decision is made against the
    /// store's own clock while the state lock is held, so two racing callers
    /// can never both be told they acquired. If no owner token is supplied a
    /// fresh one is generated and returned in the grant.
    pub fn acquire(
        &self,
        resource_key: &str,
        ttl_ms: i64,
        owner_token: Option<String>,
    ) -> CoordResult<LeaseGrant> {
        let now = now_millis();
        let mut state = self.store.lock_state();

        if let Some(existing) = state.leases.get(resource_key) {
            if !existing.is_expired_at(now) {
                return Ok(LeaseGrant::denied(existing.expires_at));
            }
            // Expired: fall through and supersede it
        }

        let token = owner_token.unwrap_or_else(|| Uuid::new_v4().to_string());
        let lease = Lease {
            resource_key: resource_key.to_string(),
            owner_token: token.clone(),
            acquired_at: now,
            expires_at: now + ttl_ms,
        };
        let expires_at = lease.expires_at;
        state.leases.insert(resource_key.to_string(), lease);
        self.store.persist(&state)?;

        Ok(LeaseGrant::granted(token, expires_at))
    }

    /// Release the lease, but only if `owner_token` still owns it
    ///
    /// Returns `true` if the lease was removed. A timed-out caller whose
    /// lease has since passed to someone else gets `false` and must not
    /// assume anything about the new holder.
    pub fn release(&self, resource_key: &str, owner_token: &str) -> CoordResult<bool> {
        let mut state = self.store.lock_state();

        let owned = matches!(
            state.leases.get(resource_key),
            Some(lease) if lease.owner_token == owner_token
        );
        if !owned {
            return Ok(false);
        }

        state.leases.remove(resource_key);
        self.store.persist(&state)?;
        Ok(true)
    }

    /// Push the expiry forward by `additional_ttl_ms`, keeping ownership
    ///
    /// Heartbeat for long critical sections. Succeeds only while the lease is
    /// still owned by `owner_token` and unexpired; returns the new expiry, or
    /// `None` if the lease was lost. Extension only moves the expiry forward:
    /// a negative TTL is treated as zero.
    pub fn extend(
        &self,
        resource_key: &str,
        owner_token: &str,
        additional_ttl_ms: i64,
    ) -> CoordResult<Option<i64>> {
        let now = now_millis();
        let mut state = self.store.lock_state();

        let new_expiry = match state.leases.get_mut(resource_key) {
            Some(lease) if lease.owner_token == owner_token && !lease.is_expired_at(now) => {
                lease.expires_at += additional_ttl_ms.max(0);
                lease.expires_at
            }
            _ => return Ok(None),
        };

        self.store.persist(&state)?;
        Ok(Some(new_expiry))
    }

    /// Run `f` under the lease, retrying acquisition up to `retries` times
    ///
    /// The lease is released on both the success and the error path before
    /// this function returns. If acquisition still fails after the retries,
    /// fails with `LockUnavailable` and `f` never runs.
    pub fn with_lease<T, F>(
        &self,
        resource_key: &str,
        ttl_ms: i64,
        retries: u32,
        retry_delay_ms: u64,
        f: F,
    ) -> CoordResult<T>
    where
        F: FnOnce() -> CoordResult<T>,
    {
        let mut token = None;
        for attempt in 0..=retries {
            let grant = self.acquire(resource_key, ttl_ms, None)?;
            if grant.acquired {
                token = grant.owner_token;
                break;
            }
            if attempt < retries {
                thread::sleep(Duration::from_millis(retry_delay_ms));
            }
        }

        let Some(token) = token else {
            return Err(CoordError::LockUnavailable {
                resource: resource_key.to_string(),
                retries,
            });
        };

        let result = f();
        let released = self.release(resource_key, &token);

        match result {
            // Surface a release failure only when the closure itself succeeded
            Ok(value) => released.map(|_| value),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_manager() -> (LeaseManager, Arc<SharedStore>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store =
            Arc::new(SharedStore::with_state_path(temp_dir.path().join("coord.jsonl")).unwrap());
        (LeaseManager::new(store.clone()), store, temp_dir)
    }

    #[test]
    fn test_acquire_generates_token_when_none_supplied() {
        let (leases, _store, _tmp) = open_manager();
        let grant = leases.acquire("batch", 60_000, None).unwrap();
        assert!(grant.acquired);
        assert!(grant.owner_token.is_some());
    }

    #[test]
    fn test_second_acquire_is_denied_while_lease_is_live() {
        let (leases, _store, _tmp) = open_manager();
        let first = leases.acquire("batch", 60_000, None).unwrap();
        assert!(first.acquired);

        let second = leases.acquire("batch", 60_000, None).unwrap();
        assert!(!second.acquired);
        assert!(second.owner_token.is_none());
        assert_eq!(second.expires_at, first.expires_at);
    }

    #[test]
    fn test_expired_lease_is_acquirable_without_release() {
        let (leases, _store, _tmp) = open_manager();
        // ttl of 0 is expired the instant it is granted
        let first = leases.acquire("batch", 0, Some("old-owner".to_string())).unwrap();
        assert!(first.acquired);

        let second = leases.acquire("batch", 60_000, Some("new-owner".to_string())).unwrap();
        assert!(second.acquired);
        assert_eq!(second.owner_token.as_deref(), Some("new-owner"));
    }

    #[test]
    fn test_release_with_wrong_token_never_removes_the_lease() {
        let (leases, _store, _tmp) = open_manager();
        leases
            .acquire("batch", 60_000, Some("owner-a".to_string()))
            .unwrap();

        assert!(!leases.release("batch", "owner-b").unwrap());

        // Still held by owner-a
        let retry = leases.acquire("batch", 60_000, Some("owner-b".to_string())).unwrap();
        assert!(!retry.acquired);
    }

    #[test]
    fn test_release_by_owner_frees_the_resource() {
        let (leases, _store, _tmp) = open_manager();
        leases
            .acquire("batch", 60_000, Some("owner-a".to_string()))
            .unwrap();
        assert!(leases.release("batch", "owner-a").unwrap());

        let next = leases.acquire("batch", 60_000, None).unwrap();
        assert!(next.acquired);
    }

    #[test]
    fn test_extend_pushes_expiry_forward_for_the_owner_only() {
        let (leases, _store, _tmp) = open_manager();
        let grant = leases
            .acquire("batch", 60_000, Some("owner-a".to_string()))
            .unwrap();

        let new_expiry = leases.extend("batch", "owner-a", 30_000).unwrap();
        assert_eq!(new_expiry, Some(grant.expires_at + 30_000));

        // Wrong token: no-op
        assert_eq!(leases.extend("batch", "owner-b", 30_000).unwrap(), None);
    }

    #[test]
    fn test_extend_never_pulls_expiry_backward() {
        let (leases, _store, _tmp) = open_manager();
        let grant = leases
            .acquire("batch", 60_000, Some("owner-a".to_string()))
            .unwrap();

        let after = leases.extend("batch", "owner-a", -50_000).unwrap();
        assert_eq!(after, Some(grant.expires_at));
    }

    #[test]
    fn test_extend_of_expired_lease_is_refused() {
        let (leases, _store, _tmp) = open_manager();
        leases.acquire("batch", 0, Some("owner-a".to_string())).unwrap();
        assert_eq!(leases.extend("batch", "owner-a", 30_000).unwrap(), None);
    }

    #[test]
    fn test_with_lease_releases_on_success() {
        let (leases, _store, _tmp) = open_manager();

        let out = leases
            .with_lease("batch", 60_000, 0, 1, || Ok(42))
            .unwrap();
        assert_eq!(out, 42);

        // Released: immediately acquirable again
        assert!(leases.acquire("batch", 60_000, None).unwrap().acquired);
    }

    #[test]
    fn test_with_lease_releases_on_error_and_rethrows() {
        let (leases, _store, _tmp) = open_manager();

        let result: CoordResult<()> = leases.with_lease("batch", 60_000, 0, 1, || {
            Err(CoordError::NotFound("inner".to_string()))
        });
        match result {
            Err(CoordError::NotFound(id)) => assert_eq!(id, "inner"),
            other => panic!("expected the closure error, got {:?}", other),
        }

        assert!(leases.acquire("batch", 60_000, None).unwrap().acquired);
    }

    #[test]
    fn test_with_lease_exhausts_retries_with_lock_unavailable() {
        let (leases, _store, _tmp) = open_manager();
        leases
            .acquire("batch", 60_000, Some("someone-else".to_string()))
            .unwrap();

        let mut ran = false;
        let result = leases.with_lease("batch", 60_000, 2, 1, || {
            ran = true;
            Ok(())
        });

        match result {
            Err(CoordError::LockUnavailable { resource, retries }) => {
                assert_eq!(resource, "batch");
                assert_eq!(retries, 2);
            }
            other => panic!("expected LockUnavailable, got {:?}", other),
        }
        assert!(!ran);
    }
}
