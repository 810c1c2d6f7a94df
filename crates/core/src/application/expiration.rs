// ExpirationScheduler — scheduled destruction cleanup (spec §4.5 "Scheduled expiration").

use crate::port::{JobStore, TimeProvider};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info};

/// Runs on a fixed interval and deletes any job with `destruction_time <= now`.
pub struct ExpirationScheduler {
    store: Arc<dyn JobStore>,
    time: Arc<dyn TimeProvider>,
    interval_secs: u64,
}

impl ExpirationScheduler {
    pub fn new(store: Arc<dyn JobStore>, time: Arc<dyn TimeProvider>, interval_secs: u64) -> Self {
        Self {
            store,
            time,
            interval_secs,
        }
    }

    pub async fn run(self) {
        info!(interval_secs = self.interval_secs, "expiration scheduler started");
        let mut tick = interval(Duration::from_secs(self.interval_secs));
        loop {
            tick.tick().await;
            if let Err(e) = self.run_now().await {
                error!(error = ?e, "scheduled expiration sweep failed");
            }
        }
    }

    pub async fn run_now(&self) -> crate::error::Result<u64> {
        let deleted = self.store.expire_jobs(self.time.now_millis()).await?;
        if deleted > 0 {
            info!(deleted, "expired destroyed jobs");
        }
        Ok(deleted)
    }
}
