//! Exchange analytics subsystem.
//!
//! # Data Flow
//! ```text
//! Gateway::handle finishes a response
//!     → ExchangeRecord (credentials stripped)
//!     → tokio::spawn(sink.record(..))   detached, errors only logged
//!
//! RetentionJob (interval)
//!     → sink.purge_older_than(max_age)
//! ```
//!
//! # Design Decisions
//! - The sink is injected into the gateway; there is no global handle
//! - A failed write never reaches the caller and is never retried
//! - SQLite access runs on the blocking pool behind a mutex

pub mod memory;
pub mod record;
pub mod retention;
pub mod sqlite;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryAnalyticsSink;
pub use record::ExchangeRecord;
pub use retention::RetentionJob;
pub use sqlite::SqliteAnalyticsSink;

/// Errors from an analytics store.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("analytics store error: {0}")]
    Store(String),

    #[error("analytics task failed: {0}")]
    Task(String),
}

/// Persists finished exchanges and prunes old ones.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    /// Persist one exchange.
    async fn record(&self, record: ExchangeRecord) -> Result<(), AnalyticsError>;

    /// Delete records older than `age`; returns the number removed.
    async fn purge_older_than(&self, age: Duration) -> Result<u64, AnalyticsError>;
}
