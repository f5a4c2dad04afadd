//! In-memory analytics store for tests and local runs.

use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::analytics::{AnalyticsError, AnalyticsSink, ExchangeRecord};

#[derive(Default)]
pub struct MemoryAnalyticsSink {
    records: Mutex<Vec<(SystemTime, ExchangeRecord)>>,
    notify: Notify,
}

impl MemoryAnalyticsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ExchangeRecord> {
        self.records.lock().iter().map(|(_, r)| r.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert a record with an explicit timestamp.
    pub fn insert_at(&self, at: SystemTime, record: ExchangeRecord) {
        self.records.lock().push((at, record));
        self.notify.notify_waiters();
    }

    /// Wait until at least `count` records exist or `timeout` elapses.
    ///
    /// Records are written on detached tasks, so callers observing them
    /// must wait rather than read immediately.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<ExchangeRecord> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.notify.notified();
            if self.len() >= count {
                break;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                break;
            }
        }
        self.records()
    }
}

#[async_trait]
impl AnalyticsSink for MemoryAnalyticsSink {
    async fn record(&self, record: ExchangeRecord) -> Result<(), AnalyticsError> {
        self.insert_at(SystemTime::now(), record);
        Ok(())
    }

    async fn purge_older_than(&self, age: Duration) -> Result<u64, AnalyticsError> {
        let cutoff = SystemTime::now()
            .checked_sub(age)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|(at, _)| *at >= cutoff);
        Ok((before - records.len()) as u64)
    }
}
