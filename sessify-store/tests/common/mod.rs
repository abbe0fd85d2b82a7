//! Shared fixtures for the integration suites
#![allow(dead_code)]

use std::sync::LazyLock;

use chrono::Utc;
use sessify_store::{
    SessionKey, SessionRecord, SessionState, SessionStoreConfig, SqliteSessionProvider,
};
use tempfile::TempDir;
use uuid::Uuid;

// Initialize tracing once per test binary; opt into output with TEST_LOG.
static TRACING: LazyLock<()> = LazyLock::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer(std::io::sink)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
});

/// A provider over its own temp-file database, kept alive for the test
pub struct TestStore {
    pub provider: SqliteSessionProvider,
    _dir: TempDir,
}

/// Spin up a provider with the default 20-minute session timeout
pub async fn spawn_store() -> TestStore {
    spawn_store_with_timeout(20).await
}

/// Spin up a provider with a specific configured session timeout
pub async fn spawn_store_with_timeout(session_timeout_minutes: u32) -> TestStore {
    LazyLock::force(&TRACING);

    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let config = SessionStoreConfig {
        database_path: dir
            .path()
            .join("sessions.db")
            .to_string_lossy()
            .into_owned(),
        session_timeout_minutes,
        mask_storage_errors: false,
    };
    let provider = SqliteSessionProvider::connect(config)
        .await
        .expect("failed to connect session provider");

    TestStore {
        provider,
        _dir: dir,
    }
}

/// A session key that cannot collide across tests
pub fn unique_key() -> SessionKey {
    SessionKey::new(Uuid::new_v4().to_string(), "/test-app")
}

/// Insert a record whose expiry already passed (created in the past with a
/// timeout that ran out), bypassing the provider's lifecycle
pub async fn insert_expired(provider: &SqliteSessionProvider, key: &SessionKey) {
    let created = Utc::now() - chrono::Duration::minutes(40);
    let record = SessionRecord::new(key, &SessionState::new(b"stale".to_vec(), 20), created);
    provider
        .record_store()
        .insert(&record)
        .await
        .expect("failed to insert expired record");
}
