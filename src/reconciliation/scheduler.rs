//! Periodic daily snapshot writer.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::interval;
use tracing::{error, info};

use super::ReconciliationEngine;

/// Writes today's snapshot on every tick. Rows already captured for the
/// day are left as they are, so only the first successful tick of a day
/// writes anything.
pub struct SnapshotScheduler {
    engine: Arc<ReconciliationEngine>,
    every: Duration,
}

impl SnapshotScheduler {
    pub fn new(engine: Arc<ReconciliationEngine>, every: Duration) -> Self {
        Self { engine, every }
    }

    /// Run the scheduler loop. Never returns.
    pub async fn run(&self) {
        info!(interval = ?self.every, "starting snapshot scheduler");
        let mut ticker = interval(self.every);

        loop {
            ticker.tick().await;
            let today = Utc::now().date_naive();
            if let Err(e) = self.engine.snapshot_day(today, false).await {
                error!(date = %today, error = %e, "daily snapshot failed");
            }
        }
    }
}
