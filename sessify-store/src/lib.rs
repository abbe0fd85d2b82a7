//! Sessify Store - SQLite session state backend
//!
//! Persists session records in a single SQLite table and enforces the
//! per-session exclusive lock through atomic conditional updates, so the
//! store stays correct across independent worker processes. An expiration
//! sweeper periodically deletes dead records; request-serving reads also
//! self-clean any expired record they encounter.

pub mod lock;
pub mod provider;
pub mod schema;
pub mod store;
pub mod sweeper;

// Re-export main types
pub use lock::LockManager;
pub use provider::SqliteSessionProvider;
pub use store::RecordStore;
pub use sweeper::{ExpirationSweeper, SweeperHandle};

pub use sessify_core::{
    SessionError, SessionFetch, SessionFlags, SessionKey, SessionRecord, SessionResult,
    SessionState, SessionStore, SessionStoreConfig,
};
