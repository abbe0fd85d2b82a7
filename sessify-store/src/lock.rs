//! Exclusive per-session locking
//!
//! The lock is a row-level flag taken and released through the record
//! store's conditional updates, so mutual exclusion holds across worker
//! processes without any in-process synchronization. Ownership is proved by
//! the lock token: a monotonically increasing generation counter bumped on
//! every successful acquisition. A caller acting with an outdated token
//! updates zero rows — its view of the world is stale and someone else has
//! already moved on.

use chrono::{Duration, Utc};
use sessify_core::{SessionKey, SessionResult};
use tracing::debug;

use crate::store::RecordStore;

/// Grants and releases the single exclusive lock per session
#[derive(Debug, Clone)]
pub struct LockManager {
    store: RecordStore,
}

impl LockManager {
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }

    /// Try to take the lock. Returns whether this caller now holds it;
    /// "not acquired" means the record is held by someone else, expired,
    /// or missing — the subsequent lookup tells which.
    pub async fn try_acquire(&self, key: &SessionKey) -> SessionResult<bool> {
        self.store.try_lock(key, Utc::now()).await
    }

    /// Bump the token past `previous_token` and persist the new generation
    /// together with the initialization-flag reset. Called only after this
    /// caller's acquisition succeeded, so the row cannot change under us.
    pub async fn grant(&self, key: &SessionKey, previous_token: i64) -> SessionResult<i64> {
        let token = previous_token + 1;
        self.store.assign_token(key, token).await?;
        debug!(
            session_id = %key.session_id,
            token,
            "exclusive lock granted"
        );
        Ok(token)
    }

    /// Release the lock held under `token` and push the expiry out by
    /// `timeout_minutes`. A stale token releases nothing.
    pub async fn release(
        &self,
        key: &SessionKey,
        token: i64,
        timeout_minutes: u32,
    ) -> SessionResult<()> {
        let new_expiry = Utc::now() + Duration::minutes(i64::from(timeout_minutes));
        let released = self.store.release(key, token, new_expiry).await?;
        if released {
            debug!(session_id = %key.session_id, token, "exclusive lock released");
        } else {
            debug!(
                session_id = %key.session_id,
                token,
                "stale lock token on release, ignoring"
            );
        }
        Ok(())
    }
}
