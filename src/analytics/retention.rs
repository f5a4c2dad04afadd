//! Scheduled deletion of old exchange records.
//!
//! # Responsibilities
//! - Periodically purge records older than the configured age
//! - Keep running when a purge fails
//! - Exit on the shutdown broadcast

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::analytics::{AnalyticsError, AnalyticsSink};
use crate::config::RetentionConfig;
use crate::observability::metrics;

pub struct RetentionJob {
    sink: Arc<dyn AnalyticsSink>,
    interval: Duration,
    max_age: Duration,
}

impl RetentionJob {
    pub fn new(sink: Arc<dyn AnalyticsSink>, config: &RetentionConfig) -> Self {
        Self {
            sink,
            interval: Duration::from_secs(config.interval_secs),
            max_age: Duration::from_secs(config.max_age_secs),
        }
    }

    /// Run one purge pass.
    pub async fn run_once(&self) -> Result<u64, AnalyticsError> {
        let deleted = self.sink.purge_older_than(self.max_age).await?;
        metrics::record_retention_deleted(deleted);
        tracing::info!(
            deleted,
            max_age_secs = self.max_age.as_secs(),
            "Old exchange records purged"
        );
        Ok(deleted)
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            max_age_secs = self.max_age.as_secs(),
            "Retention job starting"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        tracing::error!(error = %e, "Retention purge failed");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Retention job received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
