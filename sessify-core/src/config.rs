//! Configuration for the session store

use crate::error::{SessionError, SessionResult};
use serde::{Deserialize, Serialize};

/// Configuration consumed at startup by the provider and the sweeper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStoreConfig {
    /// Path of the backing SQLite database file
    pub database_path: String,
    /// Default session timeout in minutes; also drives the sweep interval
    pub session_timeout_minutes: u32,
    /// If true, storage errors are reported to the diagnostic log and
    /// replaced with a generic error before reaching the caller. If false,
    /// they are propagated verbatim.
    pub mask_storage_errors: bool,
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            database_path: "sessions.db".to_string(),
            session_timeout_minutes: 20,
            mask_storage_errors: false,
        }
    }
}

impl SessionStoreConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            database_path: std::env::var("SESSIFY_DATABASE_PATH")
                .unwrap_or(defaults.database_path),
            session_timeout_minutes: std::env::var("SESSIFY_SESSION_TIMEOUT_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.session_timeout_minutes),
            mask_storage_errors: std::env::var("SESSIFY_MASK_STORAGE_ERRORS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.mask_storage_errors),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> SessionResult<()> {
        if self.database_path.trim().is_empty() {
            return Err(SessionError::config(
                "database_path must be specified for the session store",
            ));
        }

        if self.session_timeout_minutes == 0 {
            return Err(SessionError::config(
                "session_timeout_minutes must be greater than 0",
            ));
        }

        Ok(())
    }

    /// The configured session timeout as a chrono duration
    pub fn timeout(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.session_timeout_minutes))
    }

    /// Sweep interval derived from the session timeout
    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(u64::from(self.session_timeout_minutes) * 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionStoreConfig::default();
        assert_eq!(config.database_path, "sessions.db");
        assert_eq!(config.session_timeout_minutes, 20);
        assert!(!config.mask_storage_errors);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_database_path() {
        let config = SessionStoreConfig {
            database_path: "   ".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SessionError::Config { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = SessionStoreConfig {
            session_timeout_minutes: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SessionError::Config { .. })
        ));
    }

    #[test]
    fn test_sweep_interval_tracks_timeout() {
        let config = SessionStoreConfig {
            session_timeout_minutes: 20,
            ..Default::default()
        };
        assert_eq!(
            config.sweep_interval(),
            std::time::Duration::from_secs(20 * 60)
        );
        assert_eq!(config.timeout(), chrono::Duration::minutes(20));
    }
}
