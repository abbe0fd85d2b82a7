//! Background expiration sweeping
//!
//! The sweeper deletes every record past its expiry on a fixed period,
//! independent of any session's lock state: a locked record with a future
//! expiry is never touched, and a record that expires mid-hold is removed —
//! the holder's later release or write then updates zero rows and is
//! naturally absorbed. A failed sweep is logged and the next tick tries
//! again; it never affects request-serving operations, which self-clean
//! expired records they encounter anyway.

use std::time::Duration;

use chrono::Utc;
use sessify_core::SessionResult;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::store::RecordStore;

/// Periodic task deleting expired session records
#[derive(Debug)]
pub struct ExpirationSweeper {
    store: RecordStore,
    period: Duration,
}

impl ExpirationSweeper {
    pub fn new(store: RecordStore, period: Duration) -> Self {
        Self { store, period }
    }

    /// Run a single sweep; returns how many records were removed
    pub async fn sweep_once(&self) -> SessionResult<u64> {
        self.store.purge_expired(Utc::now()).await
    }

    /// Start the periodic sweep on the runtime. The task runs until the
    /// returned handle shuts it down (or is dropped).
    pub fn spawn(self) -> SweeperHandle {
        info!(period_secs = self.period.as_secs(), "expiration sweeper started");
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.period);
            loop {
                interval.tick().await;
                match self.sweep_once().await {
                    Ok(0) => {}
                    Ok(removed) => info!(removed, "swept expired sessions"),
                    Err(err) => warn!(error = %err, "session sweep failed"),
                }
            }
        });
        SweeperHandle { task }
    }
}

/// Handle for stopping the background sweeper at process teardown
#[derive(Debug)]
pub struct SweeperHandle {
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweep task
    pub fn shutdown(self) {
        self.task.abort();
        info!("expiration sweeper stopped");
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
