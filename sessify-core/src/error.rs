//! Error types for the session store
//!
//! Faults are kept separate from normal outcomes: "record not found" and
//! "lock not acquired" are result states (see [`crate::types::SessionFetch`]),
//! never errors. Only storage-level failures surface here.

use thiserror::Error;

/// Result type for session store operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Error type for the sessify system
#[derive(Debug, Error)]
pub enum SessionError {
    /// The backing store could not be reached or a statement failed.
    #[error("session store unavailable: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A storage constraint was violated, e.g. an insert hit an existing
    /// primary key. Treated as a defect in the caller, not a normal outcome.
    #[error("session record constraint violated: {message}")]
    Constraint { message: String },

    /// Invalid configuration detected at startup.
    #[error("invalid session store configuration: {message}")]
    Config { message: String },

    /// Generic replacement error returned when storage error masking is
    /// enabled; deliberately carries no storage detail.
    #[error("an error occurred communicating with the session store")]
    Opaque,
}

impl SessionError {
    /// Create a storage error without an underlying source
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Create a storage error wrapping the underlying driver error
    pub fn storage_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a constraint violation error
    pub fn constraint<S: Into<String>>(message: S) -> Self {
        Self::Constraint {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error originates from the backing store (as opposed to
    /// configuration), i.e. whether the masking policy applies to it.
    pub fn is_storage_fault(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Constraint { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_build_expected_variants() {
        assert!(matches!(
            SessionError::storage("boom"),
            SessionError::Storage { .. }
        ));
        assert!(matches!(
            SessionError::constraint("duplicate"),
            SessionError::Constraint { .. }
        ));
        assert!(matches!(
            SessionError::config("bad path"),
            SessionError::Config { .. }
        ));
    }

    #[test]
    fn test_masking_applies_to_storage_faults_only() {
        assert!(SessionError::storage("boom").is_storage_fault());
        assert!(SessionError::constraint("duplicate").is_storage_fault());
        assert!(!SessionError::config("bad path").is_storage_fault());
        assert!(!SessionError::Opaque.is_storage_fault());
    }

    #[test]
    fn test_opaque_message_carries_no_detail() {
        let masked = SessionError::Opaque.to_string();
        assert!(!masked.contains("sqlite"));
        assert!(!masked.contains("sql"));
    }
}
