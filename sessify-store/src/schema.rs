//! Schema provisioning for the session table
//!
//! Provisioning is idempotent: every statement is a no-op when the schema is
//! already in place, so it is safe to run on each startup.

use sessify_core::{SessionError, SessionResult};
use sqlx::SqlitePool;

/// Create the sessions table and its supporting index if missing
pub async fn ensure_schema(pool: &SqlitePool) -> SessionResult<()> {
    tracing::debug!("Provisioning sessions table");
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            session_id      TEXT    NOT NULL,
            application     TEXT    NOT NULL,
            created         TEXT    NOT NULL,
            expires         TEXT    NOT NULL,
            lock_date       TEXT    NOT NULL,
            lock_token      INTEGER NOT NULL DEFAULT 0,
            timeout_minutes INTEGER NOT NULL,
            locked          BOOLEAN NOT NULL DEFAULT FALSE,
            items           BLOB    NOT NULL,
            flags           INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (session_id, application)
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| {
        SessionError::storage_with_source(
            format!("failed to create sessions table: {}", e),
            Box::new(e),
        )
    })?;

    // The sweeper deletes by expiry; keep that from scanning the table.
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions (expires)")
        .execute(pool)
        .await
        .map_err(|e| {
            SessionError::storage_with_source(
                format!("failed to create expires index: {}", e),
                Box::new(e),
            )
        })?;

    Ok(())
}
