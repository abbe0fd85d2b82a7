//! Session record persistence
//!
//! `RecordStore` is the only layer that talks SQL. Point lookups, inserts,
//! and deletes go by primary key; everything that must stay atomic under
//! concurrency is a single conditional UPDATE or DELETE whose
//! `rows_affected` (0 or 1) reports whether the predicate held. Zero
//! affected rows is not an error, it is the signal that somebody else won
//! the race — callers treat it as a normal outcome.

use chrono::{DateTime, Utc};
use sessify_core::{SessionError, SessionFlags, SessionKey, SessionRecord, SessionResult};
use sqlx::SqlitePool;

/// Database row image of a session record
#[derive(Debug, Clone, sqlx::FromRow)]
struct SessionRow {
    session_id: String,
    application: String,
    created: DateTime<Utc>,
    expires: DateTime<Utc>,
    lock_date: DateTime<Utc>,
    lock_token: i64,
    timeout_minutes: u32,
    locked: bool,
    items: Vec<u8>,
    flags: i64,
}

impl SessionRow {
    /// Convert to the domain record
    fn into_record(self) -> SessionRecord {
        SessionRecord {
            session_id: self.session_id,
            application: self.application,
            created: self.created,
            expires: self.expires,
            lock_date: self.lock_date,
            lock_token: self.lock_token,
            timeout_minutes: self.timeout_minutes,
            locked: self.locked,
            items: self.items,
            flags: SessionFlags::from_raw(self.flags),
        }
    }
}

/// Durable table of session records over a SQLite pool
#[derive(Debug, Clone)]
pub struct RecordStore {
    pool: SqlitePool,
}

impl RecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert a full record. A live duplicate under the same key violates
    /// the primary key and surfaces as a constraint error.
    pub async fn insert(&self, record: &SessionRecord) -> SessionResult<()> {
        sqlx::query(
            "INSERT INTO sessions (session_id, application, created, expires, lock_date, \
             lock_token, timeout_minutes, locked, items, flags) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.session_id)
        .bind(&record.application)
        .bind(record.created)
        .bind(record.expires)
        .bind(record.lock_date)
        .bind(record.lock_token)
        .bind(record.timeout_minutes)
        .bind(record.locked)
        .bind(&record.items)
        .bind(record.flags.as_raw())
        .execute(&self.pool)
        .await
        .map_err(|e| classify("failed to insert session record", e))?;

        Ok(())
    }

    /// Point lookup by primary key
    pub async fn fetch(&self, key: &SessionKey) -> SessionResult<Option<SessionRecord>> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT session_id, application, created, expires, lock_date, lock_token, \
             timeout_minutes, locked, items, flags \
             FROM sessions WHERE session_id = ? AND application = ?",
        )
        .bind(&key.session_id)
        .bind(&key.application)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify("failed to fetch session record", e))?;

        Ok(row.map(SessionRow::into_record))
    }

    /// Delete the record only if it has already expired. Used both to clean
    /// up an expired row a read stumbled over and to clear a stale leftover
    /// before re-inserting under the same key; a freshly recreated live row
    /// never matches the predicate.
    pub async fn delete_expired(
        &self,
        key: &SessionKey,
        now: DateTime<Utc>,
    ) -> SessionResult<bool> {
        let result = sqlx::query(
            "DELETE FROM sessions WHERE session_id = ? AND application = ? AND expires < ?",
        )
        .bind(&key.session_id)
        .bind(&key.application)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| classify("failed to delete expired session record", e))?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete the record only when the caller still holds the lock it names
    pub async fn delete_with_token(&self, key: &SessionKey, token: i64) -> SessionResult<bool> {
        let result = sqlx::query(
            "DELETE FROM sessions WHERE session_id = ? AND application = ? AND lock_token = ?",
        )
        .bind(&key.session_id)
        .bind(&key.application)
        .bind(token)
        .execute(&self.pool)
        .await
        .map_err(|e| classify("failed to remove session record", e))?;

        Ok(result.rows_affected() > 0)
    }

    /// Take the exclusive lock if the record is unlocked and not expired.
    /// Returns whether this call acquired it.
    pub async fn try_lock(&self, key: &SessionKey, now: DateTime<Utc>) -> SessionResult<bool> {
        let result = sqlx::query(
            "UPDATE sessions SET locked = TRUE, lock_date = ? \
             WHERE session_id = ? AND application = ? AND locked = FALSE AND expires > ?",
        )
        .bind(now)
        .bind(&key.session_id)
        .bind(&key.application)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| classify("failed to lock session record", e))?;

        Ok(result.rows_affected() > 0)
    }

    /// Persist a freshly granted lock token, clearing the initialization
    /// flag in the same statement
    pub async fn assign_token(&self, key: &SessionKey, token: i64) -> SessionResult<()> {
        sqlx::query(
            "UPDATE sessions SET lock_token = ?, flags = 0 \
             WHERE session_id = ? AND application = ?",
        )
        .bind(token)
        .bind(&key.session_id)
        .bind(&key.application)
        .execute(&self.pool)
        .await
        .map_err(|e| classify("failed to assign lock token", e))?;

        Ok(())
    }

    /// Clear the lock and refresh the expiry, keyed by the lock token
    pub async fn release(
        &self,
        key: &SessionKey,
        token: i64,
        new_expiry: DateTime<Utc>,
    ) -> SessionResult<bool> {
        let result = sqlx::query(
            "UPDATE sessions SET locked = FALSE, expires = ? \
             WHERE session_id = ? AND application = ? AND lock_token = ?",
        )
        .bind(new_expiry)
        .bind(&key.session_id)
        .bind(&key.application)
        .bind(token)
        .execute(&self.pool)
        .await
        .map_err(|e| classify("failed to release session record", e))?;

        Ok(result.rows_affected() > 0)
    }

    /// Store the item blob, clear the lock, and refresh the expiry in one
    /// statement, keyed by the lock token
    pub async fn store_and_release(
        &self,
        key: &SessionKey,
        token: i64,
        items: &[u8],
        new_expiry: DateTime<Utc>,
    ) -> SessionResult<bool> {
        let result = sqlx::query(
            "UPDATE sessions SET items = ?, expires = ?, locked = FALSE \
             WHERE session_id = ? AND application = ? AND lock_token = ?",
        )
        .bind(items)
        .bind(new_expiry)
        .bind(&key.session_id)
        .bind(&key.application)
        .bind(token)
        .execute(&self.pool)
        .await
        .map_err(|e| classify("failed to store session record", e))?;

        Ok(result.rows_affected() > 0)
    }

    /// Refresh the expiry only, regardless of lock state
    pub async fn touch(&self, key: &SessionKey, new_expiry: DateTime<Utc>) -> SessionResult<bool> {
        let result = sqlx::query(
            "UPDATE sessions SET expires = ? WHERE session_id = ? AND application = ?",
        )
        .bind(new_expiry)
        .bind(&key.session_id)
        .bind(&key.application)
        .execute(&self.pool)
        .await
        .map_err(|e| classify("failed to reset session timeout", e))?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete every record past its expiry; returns how many were removed
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> SessionResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires < ?")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| classify("failed to purge expired session records", e))?;

        Ok(result.rows_affected())
    }
}

/// Map a driver error into the crate taxonomy: unique-key violations are
/// constraint defects, everything else is a storage fault.
fn classify(context: &str, error: sqlx::Error) -> SessionError {
    let unique_violation = error
        .as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false);

    if unique_violation {
        SessionError::constraint(format!("{}: {}", context, error))
    } else {
        SessionError::storage_with_source(format!("{}: {}", context, error), Box::new(error))
    }
}
