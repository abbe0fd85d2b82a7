//! Core data type definitions

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length of a session id, matching the persisted schema
pub const MAX_SESSION_ID_LEN: usize = 80;
/// Maximum length of an application namespace, matching the persisted schema
pub const MAX_APPLICATION_LEN: usize = 255;

/// Primary key of a session record: the host-supplied session id scoped to
/// one logical application, so the same id can exist under different
/// applications without colliding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    /// Session identifier issued by the hosting framework (≤ 80 chars)
    pub session_id: String,
    /// Application namespace (≤ 255 chars)
    pub application: String,
}

impl SessionKey {
    pub fn new<S: Into<String>, A: Into<String>>(session_id: S, application: A) -> Self {
        Self {
            session_id: session_id.into(),
            application: application.into(),
        }
    }
}

/// Record flags stored alongside a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionFlags {
    /// Fully initialized record
    Normal,
    /// Placeholder record created before its content is known (e.g. cookie
    /// pre-creation across a redirect); cleared on first exclusive read.
    Uninitialized,
}

impl SessionFlags {
    /// Decode from the stored integer representation
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            1 => Self::Uninitialized,
            _ => Self::Normal,
        }
    }

    /// Encode to the stored integer representation
    pub fn as_raw(self) -> i64 {
        match self {
            Self::Normal => 0,
            Self::Uninitialized => 1,
        }
    }
}

/// In-memory session value exchanged with the hosting framework.
///
/// The item blob is externally serialized and never interpreted here; the
/// store only persists and returns it byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// Opaque serialized session items
    pub items: Vec<u8>,
    /// Timeout in minutes used to compute the record expiry on write
    pub timeout_minutes: u32,
}

impl SessionState {
    pub fn new(items: Vec<u8>, timeout_minutes: u32) -> Self {
        Self {
            items,
            timeout_minutes,
        }
    }

    /// Construct an empty session value, the "new session" factory
    pub fn empty(timeout_minutes: u32) -> Self {
        Self {
            items: Vec::new(),
            timeout_minutes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// One persisted session record, the full row image
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub session_id: String,
    pub application: String,
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
    pub lock_date: DateTime<Utc>,
    /// Lock generation counter; bumped on each successful exclusive
    /// acquisition and echoed by the holder on write/release/remove
    pub lock_token: i64,
    pub timeout_minutes: u32,
    pub locked: bool,
    pub items: Vec<u8>,
    pub flags: SessionFlags,
}

impl SessionRecord {
    /// Build a fresh unlocked record for `state` under `key`, created `now`
    /// and expiring after the state's timeout
    pub fn new(key: &SessionKey, state: &SessionState, now: DateTime<Utc>) -> Self {
        Self {
            session_id: key.session_id.clone(),
            application: key.application.clone(),
            created: now,
            expires: now + Duration::minutes(i64::from(state.timeout_minutes)),
            lock_date: now,
            lock_token: 0,
            timeout_minutes: state.timeout_minutes,
            locked: false,
            items: state.items.clone(),
            flags: SessionFlags::Normal,
        }
    }

    /// Build a placeholder record with no meaningful content yet
    pub fn uninitialized(key: &SessionKey, timeout_minutes: u32, now: DateTime<Utc>) -> Self {
        let mut record = Self::new(key, &SessionState::empty(timeout_minutes), now);
        record.flags = SessionFlags::Uninitialized;
        record
    }

    pub fn key(&self) -> SessionKey {
        SessionKey::new(self.session_id.clone(), self.application.clone())
    }

    /// A record past its expiry is logically dead: never lockable, and any
    /// read of it behaves as "not found"
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires < now
    }

    /// How long the current lock has been held
    pub fn lock_age(&self, now: DateTime<Utc>) -> Duration {
        now - self.lock_date
    }

    /// The in-memory session value carried by this record
    pub fn state(&self) -> SessionState {
        SessionState::new(self.items.clone(), self.timeout_minutes)
    }
}

/// Outcome of a read operation. "Not found" and "locked" are normal results
/// of concurrent operation, not faults.
#[derive(Debug, Clone)]
pub enum SessionFetch {
    /// No live record exists under the key
    NotFound,
    /// The record is exclusively held by another caller; retry is the
    /// host's policy. Carries the age and generation of the current lock.
    Locked {
        lock_age: Duration,
        lock_token: i64,
    },
    /// The record was read; on the exclusive path `lock_token` is the newly
    /// granted generation the caller must echo on write/release
    Found {
        state: SessionState,
        lock_token: i64,
    },
}

impl SessionFetch {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_round_trip() {
        assert_eq!(SessionFlags::from_raw(0), SessionFlags::Normal);
        assert_eq!(SessionFlags::from_raw(1), SessionFlags::Uninitialized);
        assert_eq!(SessionFlags::Normal.as_raw(), 0);
        assert_eq!(SessionFlags::Uninitialized.as_raw(), 1);
        // Unknown raw values decode as Normal rather than failing the read.
        assert_eq!(SessionFlags::from_raw(42), SessionFlags::Normal);
    }

    #[test]
    fn test_empty_state_has_no_items() {
        let state = SessionState::empty(20);
        assert!(state.is_empty());
        assert_eq!(state.timeout_minutes, 20);
    }

    #[test]
    fn test_new_record_is_unlocked_with_zero_token() {
        let key = SessionKey::new("s1", "/app");
        let now = Utc::now();
        let record = SessionRecord::new(&key, &SessionState::empty(20), now);

        assert!(!record.locked);
        assert_eq!(record.lock_token, 0);
        assert_eq!(record.flags, SessionFlags::Normal);
        assert_eq!(record.expires, now + Duration::minutes(20));
        assert!(!record.is_expired(now));
        assert!(record.is_expired(now + Duration::minutes(21)));
    }

    #[test]
    fn test_uninitialized_record_is_flagged() {
        let key = SessionKey::new("s2", "/app");
        let record = SessionRecord::uninitialized(&key, 20, Utc::now());

        assert_eq!(record.flags, SessionFlags::Uninitialized);
        assert!(record.items.is_empty());
        assert!(!record.locked);
    }

    #[test]
    fn test_lock_age_measures_from_lock_date() {
        let key = SessionKey::new("s3", "/app");
        let now = Utc::now();
        let mut record = SessionRecord::new(&key, &SessionState::empty(20), now);
        record.locked = true;
        record.lock_date = now - Duration::seconds(90);

        assert_eq!(record.lock_age(now), Duration::seconds(90));
    }
}
