//! SQLite session state provider
//!
//! The lifecycle controller behind the [`SessionStore`] contract: it
//! composes the lock manager and the record store into the per-request
//! operations, translates expiration into deletion, and applies the
//! configured error policy uniformly. Every operation is a small, bounded
//! number of storage round trips; nothing here ever waits for a lock.

use sessify_core::{
    async_trait, SessionError, SessionFetch, SessionFlags, SessionKey, SessionRecord,
    SessionResult, SessionState, SessionStore, SessionStoreConfig,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
use sqlx::SqlitePool;
use tracing::{debug, error, info};

use crate::lock::LockManager;
use crate::schema;
use crate::store::RecordStore;
use crate::sweeper::ExpirationSweeper;

/// SQLite-backed implementation of the session store contract
#[derive(Debug, Clone)]
pub struct SqliteSessionProvider {
    store: RecordStore,
    lock: LockManager,
    config: SessionStoreConfig,
}

impl SqliteSessionProvider {
    /// Open (creating if missing) the backing database, provision the
    /// schema, and return a ready provider.
    pub async fn connect(config: SessionStoreConfig) -> SessionResult<Self> {
        config.validate()?;

        let pool = open_pool(&config.database_path).await?;
        schema::ensure_schema(&pool).await?;

        info!(
            database_path = %config.database_path,
            timeout_minutes = config.session_timeout_minutes,
            "session store ready"
        );

        Ok(Self::with_pool(pool, config))
    }

    /// Build a provider over an existing pool whose schema is already
    /// provisioned
    pub fn with_pool(pool: SqlitePool, config: SessionStoreConfig) -> Self {
        let store = RecordStore::new(pool);
        let lock = LockManager::new(store.clone());
        Self {
            store,
            lock,
            config,
        }
    }

    pub fn config(&self) -> &SessionStoreConfig {
        &self.config
    }

    /// The underlying record store; the sweeper runs against it directly
    pub fn record_store(&self) -> &RecordStore {
        &self.store
    }

    /// An expiration sweeper for this store, with its period derived from
    /// the configured session timeout
    pub fn sweeper(&self) -> ExpirationSweeper {
        ExpirationSweeper::new(self.store.clone(), self.config.sweep_interval())
    }

    /// Uniform error policy: storage faults are reported to the diagnostic
    /// log; with masking enabled the caller then sees only a generic error
    /// with the detail deliberately omitted.
    fn guard<T>(&self, operation: &str, result: SessionResult<T>) -> SessionResult<T> {
        match result {
            Err(err) if err.is_storage_fault() => {
                error!(operation, error = %err, "session store operation failed");
                if self.config.mask_storage_errors {
                    Err(SessionError::Opaque)
                } else {
                    Err(err)
                }
            }
            other => other,
        }
    }

    /// Shared path of both reads. On the exclusive path the lock attempt
    /// happens first; the lookup then decides, in order: missing row,
    /// expired row (deleted on sight, lock state irrelevant), row held by
    /// someone else, or a granted read with a freshly bumped token.
    async fn fetch_session(&self, key: &SessionKey, exclusive: bool) -> SessionResult<SessionFetch> {
        let acquired = if exclusive {
            self.lock.try_acquire(key).await?
        } else {
            false
        };

        let Some(record) = self.store.fetch(key).await? else {
            return Ok(SessionFetch::NotFound);
        };

        let now = chrono::Utc::now();
        if record.is_expired(now) {
            self.store.delete_expired(key, now).await?;
            debug!(session_id = %key.session_id, "expired session removed on read");
            return Ok(SessionFetch::NotFound);
        }

        if exclusive && !acquired {
            return Ok(SessionFetch::Locked {
                lock_age: record.lock_age(now),
                lock_token: record.lock_token,
            });
        }

        if exclusive {
            let lock_token = self.lock.grant(key, record.lock_token).await?;
            let state = if record.flags == SessionFlags::Uninitialized {
                // Placeholder content is not meaningful; hand out a fresh
                // empty session with the configured timeout instead.
                SessionState::empty(self.config.session_timeout_minutes)
            } else {
                record.state()
            };
            return Ok(SessionFetch::Found { state, lock_token });
        }

        Ok(SessionFetch::Found {
            state: record.state(),
            lock_token: record.lock_token,
        })
    }

    async fn store_session(
        &self,
        key: &SessionKey,
        state: SessionState,
        lock_token: Option<i64>,
        is_new: bool,
    ) -> SessionResult<()> {
        if is_new {
            let now = chrono::Utc::now();
            // A just-expired predecessor may still occupy the key.
            self.store.delete_expired(key, now).await?;
            let record = SessionRecord::new(key, &state, now);
            self.store.insert(&record).await?;
            return Ok(());
        }

        let token = lock_token.unwrap_or(0);
        let new_expiry =
            chrono::Utc::now() + chrono::Duration::minutes(i64::from(state.timeout_minutes));
        let stored = self
            .store
            .store_and_release(key, token, &state.items, new_expiry)
            .await?;
        if !stored {
            // A newer holder has taken over; this caller's write is stale
            // and is abandoned rather than surfaced as an error.
            debug!(
                session_id = %key.session_id,
                token,
                "stale lock token on write, abandoning"
            );
        }
        Ok(())
    }

    async fn remove_session(&self, key: &SessionKey, lock_token: i64) -> SessionResult<()> {
        let removed = self.store.delete_with_token(key, lock_token).await?;
        if removed {
            debug!(session_id = %key.session_id, "session removed");
        } else {
            debug!(
                session_id = %key.session_id,
                token = lock_token,
                "stale lock token on remove, ignoring"
            );
        }
        Ok(())
    }

    async fn insert_uninitialized(
        &self,
        key: &SessionKey,
        timeout_minutes: u32,
    ) -> SessionResult<()> {
        let record = SessionRecord::uninitialized(key, timeout_minutes, chrono::Utc::now());
        self.store.insert(&record).await
    }

    async fn touch_session(&self, key: &SessionKey) -> SessionResult<()> {
        let new_expiry = chrono::Utc::now() + self.config.timeout();
        self.store.touch(key, new_expiry).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for SqliteSessionProvider {
    async fn read_shared(&self, key: &SessionKey) -> SessionResult<SessionFetch> {
        let result = self.fetch_session(key, false).await;
        self.guard("read_shared", result)
    }

    async fn read_exclusive(&self, key: &SessionKey) -> SessionResult<SessionFetch> {
        let result = self.fetch_session(key, true).await;
        self.guard("read_exclusive", result)
    }

    async fn write_and_release(
        &self,
        key: &SessionKey,
        state: SessionState,
        lock_token: Option<i64>,
        is_new: bool,
    ) -> SessionResult<()> {
        let result = self.store_session(key, state, lock_token, is_new).await;
        self.guard("write_and_release", result)
    }

    async fn release(&self, key: &SessionKey, lock_token: i64) -> SessionResult<()> {
        let result = self
            .lock
            .release(key, lock_token, self.config.session_timeout_minutes)
            .await;
        self.guard("release", result)
    }

    async fn remove(&self, key: &SessionKey, lock_token: i64) -> SessionResult<()> {
        let result = self.remove_session(key, lock_token).await;
        self.guard("remove", result)
    }

    async fn create_uninitialized(
        &self,
        key: &SessionKey,
        timeout_minutes: u32,
    ) -> SessionResult<()> {
        let result = self.insert_uninitialized(key, timeout_minutes).await;
        self.guard("create_uninitialized", result)
    }

    async fn reset_timeout(&self, key: &SessionKey) -> SessionResult<()> {
        let result = self.touch_session(key).await;
        self.guard("reset_timeout", result)
    }

    fn create_empty(&self, timeout_minutes: u32) -> SessionState {
        SessionState::empty(timeout_minutes)
    }
}

/// Open the connection pool, creating the database file and its parent
/// directory when missing
async fn open_pool(database_path: &str) -> SessionResult<SqlitePool> {
    let options = if database_path.contains(":memory:") {
        SqliteConnectOptions::new().in_memory(true).shared_cache(true)
    } else {
        if let Some(parent) = std::path::Path::new(database_path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    SessionError::storage_with_source(
                        format!("failed to create database directory: {}", e),
                        Box::new(e),
                    )
                })?;
            }
        }

        // WAL plus a busy timeout lets independent connections queue on the
        // engine's internal locking instead of failing outright.
        SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
    };

    SqlitePool::connect_with(options).await.map_err(|e| {
        SessionError::storage_with_source(
            format!("failed to connect to session database: {}", e),
            Box::new(e),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_provider(mask_storage_errors: bool) -> (tempfile::TempDir, SqliteSessionProvider) {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = SessionStoreConfig {
            database_path: dir
                .path()
                .join("sessions.db")
                .to_string_lossy()
                .into_owned(),
            session_timeout_minutes: 20,
            mask_storage_errors,
        };
        let provider = SqliteSessionProvider::connect(config)
            .await
            .expect("provider should connect");
        (dir, provider)
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_config() {
        let config = SessionStoreConfig {
            database_path: String::new(),
            ..Default::default()
        };
        let result = SqliteSessionProvider::connect(config).await;
        assert!(matches!(result, Err(SessionError::Config { .. })));
    }

    #[tokio::test]
    async fn test_duplicate_create_surfaces_constraint_when_unmasked() {
        let (_dir, provider) = test_provider(false).await;
        let key = SessionKey::new("dup", "/app");

        provider.create_uninitialized(&key, 20).await.unwrap();
        let result = provider.create_uninitialized(&key, 20).await;

        assert!(matches!(result, Err(SessionError::Constraint { .. })));
    }

    #[tokio::test]
    async fn test_duplicate_create_is_masked_when_configured() {
        let (_dir, provider) = test_provider(true).await;
        let key = SessionKey::new("dup-masked", "/app");

        provider.create_uninitialized(&key, 20).await.unwrap();
        let result = provider.create_uninitialized(&key, 20).await;

        assert!(matches!(result, Err(SessionError::Opaque)));
    }

    #[tokio::test]
    async fn test_create_empty_is_pure() {
        let (_dir, provider) = test_provider(false).await;

        let state = provider.create_empty(30);

        assert!(state.is_empty());
        assert_eq!(state.timeout_minutes, 30);
    }
}
