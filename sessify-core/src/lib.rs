//! Sessify Core - Shared types and the session store contract
//!
//! This crate defines the data model, error taxonomy, configuration, and the
//! backend trait implemented by the storage crates of the sessify system.

pub mod config;
pub mod error;
pub mod logging;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::*;
pub use logging::*;
pub use traits::*;
pub use types::*;

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use chrono;
pub use tracing;
