//! SQLite-backed analytics store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::analytics::{AnalyticsError, AnalyticsSink, ExchangeRecord};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS requests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    request_id TEXT,
    method TEXT NOT NULL,
    url TEXT NOT NULL,
    headers TEXT NOT NULL,
    status_code INTEGER NOT NULL,
    error TEXT,
    user_agent TEXT,
    client_ip TEXT,
    client_country TEXT,
    service_id TEXT,
    service_name TEXT,
    identifier_for_vendor TEXT,
    bundle_identifier TEXT,
    bundle_version TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_requests_created_at ON requests (created_at);";

const COLUMNS: &str = "request_id, method, url, headers, status_code, error, user_agent, \
    client_ip, client_country, service_id, service_name, identifier_for_vendor, \
    bundle_identifier, bundle_version";

#[derive(Clone)]
pub struct SqliteAnalyticsSink {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteAnalyticsSink {
    /// Open (or create) the database at `path` and ensure the schema exists.
    pub fn open(path: &str) -> Result<Self, AnalyticsError> {
        let conn = Connection::open(path).map_err(store_err)?;
        let sink = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        sink.ensure_schema()?;
        tracing::info!(path = %path, "Analytics store opened");
        Ok(sink)
    }

    pub fn open_in_memory() -> Result<Self, AnalyticsError> {
        Self::open(":memory:")
    }

    fn ensure_schema(&self) -> Result<(), AnalyticsError> {
        self.conn.lock().execute_batch(SCHEMA).map_err(store_err)
    }

    /// Latest record for a client install identifier.
    pub fn find_by_identifier_for_vendor(
        &self,
        identifier: &str,
    ) -> Result<Option<ExchangeRecord>, AnalyticsError> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!(
                "SELECT {} FROM requests WHERE identifier_for_vendor = ?1 ORDER BY id DESC LIMIT 1",
                COLUMNS
            ),
            params![identifier],
            from_row,
        )
        .optional()
        .map_err(store_err)
    }

    pub fn count(&self) -> Result<u64, AnalyticsError> {
        let conn = self.conn.lock();
        conn.query_row("SELECT COUNT(*) FROM requests", [], |row| row.get::<_, i64>(0))
            .map(|n| n as u64)
            .map_err(store_err)
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, AnalyticsError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            f(&conn)
        })
        .await
        .map_err(|e| AnalyticsError::Task(e.to_string()))?
        .map_err(store_err)
    }
}

#[async_trait]
impl AnalyticsSink for SqliteAnalyticsSink {
    async fn record(&self, record: ExchangeRecord) -> Result<(), AnalyticsError> {
        self.blocking(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO requests ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                    COLUMNS
                ),
                params![
                    record.request_id,
                    record.method,
                    record.url,
                    record.headers,
                    record.status_code,
                    record.error,
                    record.user_agent,
                    record.client_ip,
                    record.client_country,
                    record.service_id,
                    record.service_name,
                    record.identifier_for_vendor,
                    record.bundle_identifier,
                    record.bundle_version,
                ],
            )
            .map(|_| ())
        })
        .await
    }

    async fn purge_older_than(&self, age: Duration) -> Result<u64, AnalyticsError> {
        let modifier = format!("-{} seconds", age.as_secs());
        self.blocking(move |conn| {
            conn.execute(
                "DELETE FROM requests WHERE created_at < datetime('now', ?1)",
                params![modifier],
            )
            .map(|n| n as u64)
        })
        .await
    }
}

fn from_row(row: &Row<'_>) -> Result<ExchangeRecord, rusqlite::Error> {
    Ok(ExchangeRecord {
        request_id: row.get(0)?,
        method: row.get(1)?,
        url: row.get(2)?,
        headers: row.get(3)?,
        status_code: row.get(4)?,
        error: row.get(5)?,
        user_agent: row.get(6)?,
        client_ip: row.get(7)?,
        client_country: row.get(8)?,
        service_id: row.get(9)?,
        service_name: row.get(10)?,
        identifier_for_vendor: row.get(11)?,
        bundle_identifier: row.get(12)?,
        bundle_version: row.get(13)?,
    })
}

fn store_err(err: rusqlite::Error) -> AnalyticsError {
    AnalyticsError::Store(err.to_string())
}
