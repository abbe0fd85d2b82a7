//! The host-facing session store contract
//!
//! The hosting framework calls these operations once per request phase:
//! a shared or exclusive read at request begin, and a write-and-release or
//! plain release at request end. Implementations must stay correct under
//! concurrent calls from independent workers, including separate processes.

use crate::error::SessionResult;
use crate::types::{SessionFetch, SessionKey, SessionState};
use async_trait::async_trait;

/// Capability set implemented by a session state backend
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read the current session content without acquiring the lock.
    /// An expired record is deleted and reported as not found.
    async fn read_shared(&self, key: &SessionKey) -> SessionResult<SessionFetch>;

    /// Attempt to acquire the exclusive lock and read the session content.
    /// Returns `Locked` immediately when another caller holds the record;
    /// waiting and retrying is the host's policy, never this store's.
    async fn read_exclusive(&self, key: &SessionKey) -> SessionResult<SessionFetch>;

    /// Store the session content and release the lock. With `is_new` the
    /// record is inserted fresh (any expired leftover under the key is
    /// cleared first and `lock_token` is ignored); otherwise the write is
    /// keyed by `lock_token` and silently abandoned when the token is stale.
    async fn write_and_release(
        &self,
        key: &SessionKey,
        state: SessionState,
        lock_token: Option<i64>,
        is_new: bool,
    ) -> SessionResult<()>;

    /// Release the exclusive lock and refresh the expiry. A stale token is
    /// a no-op.
    async fn release(&self, key: &SessionKey, lock_token: i64) -> SessionResult<()>;

    /// Delete the record. A stale token is a no-op.
    async fn remove(&self, key: &SessionKey, lock_token: i64) -> SessionResult<()>;

    /// Insert a placeholder record whose content is not yet meaningful;
    /// it yields a fresh empty session on its first exclusive read.
    async fn create_uninitialized(
        &self,
        key: &SessionKey,
        timeout_minutes: u32,
    ) -> SessionResult<()>;

    /// Refresh the record expiry, regardless of lock state.
    async fn reset_timeout(&self, key: &SessionKey) -> SessionResult<()>;

    /// Construct an empty in-memory session value; no storage access.
    fn create_empty(&self, timeout_minutes: u32) -> SessionState;
}
