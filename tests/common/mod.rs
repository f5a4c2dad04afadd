//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use service_gateway::analytics::{ExchangeRecord, SqliteAnalyticsSink};
use service_gateway::config::GatewayConfig;
use service_gateway::lifecycle::{self, Shutdown};

/// Serve `router` on an ephemeral local port.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Upstream that reflects what it received as JSON.
///
/// `/status/{code}` answers with that status; `/events` streams three
/// server-sent events; `/events/empty` is an event stream with no body.
pub async fn start_mock_upstream() -> SocketAddr {
    let router = Router::new()
        .route("/status/{code}", any(status))
        .route("/events", get(events))
        .route("/events/empty", get(empty_events))
        .route("/{*path}", any(echo))
        .route("/", any(echo));
    serve(router).await
}

async fn echo(request: Request) -> Json<Value> {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    let headers: HashMap<String, Vec<String>> = parts
        .headers
        .keys()
        .map(|name| {
            let values = parts
                .headers
                .get_all(name)
                .iter()
                .map(|v| v.to_str().unwrap_or_default().to_string())
                .collect();
            (name.as_str().to_string(), values)
        })
        .collect();

    Json(json!({
        "method": parts.method.as_str(),
        "path": parts.uri.path(),
        "query": parts.uri.query(),
        "headers": headers,
        "body": String::from_utf8_lossy(&body),
    }))
}

async fn status(axum::extract::Path(code): axum::extract::Path<u16>) -> Response {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({"upstream_status": code}))).into_response()
}

async fn events() -> Response {
    let frames = ["data: one\n\n", "data: two\n\n", "data: [DONE]\n\n"];
    let stream = futures_util::stream::iter(
        frames
            .into_iter()
            .map(|f| Ok::<_, std::convert::Infallible>(Bytes::from_static(f.as_bytes()))),
    );
    (
        [(header::CONTENT_TYPE, "text/event-stream; charset=utf-8")],
        Body::from_stream(stream),
    )
        .into_response()
}

async fn empty_events() -> Response {
    ([(header::CONTENT_TYPE, "text/event-stream")], Body::empty()).into_response()
}

/// A gateway bound to a local port, forwarding over plain HTTP.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub database: Option<PathBuf>,
    _dir: tempfile::TempDir,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Wait for the analytics row tagged with `identifier` to be written.
    pub async fn analytics_for(&self, identifier: &str) -> Option<ExchangeRecord> {
        let path = self.database.as_ref()?;
        let store = SqliteAnalyticsSink::open(path.to_str()?).ok()?;
        let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
        loop {
            if let Ok(Some(record)) = store.find_by_identifier_for_vendor(identifier) {
                return Some(record);
            }
            if tokio::time::Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    }
}

/// Start a gateway with the given static secrets and analytics on a temp SQLite file.
pub async fn start_gateway(secrets: &[(&str, &str)]) -> TestGateway {
    start_gateway_with(secrets, |_| {}).await
}

pub async fn start_gateway_with(
    secrets: &[(&str, &str)],
    customize: impl FnOnce(&mut GatewayConfig),
) -> TestGateway {
    let dir = tempfile::tempdir().unwrap();
    let database = dir.path().join("analytics.db");

    let mut config = GatewayConfig::default();
    config.upstream.scheme = "http".to_string();
    config.analytics.database_path = database.to_string_lossy().into_owned();
    config.retention.enabled = false;
    config.secrets = secrets
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    customize(&mut config);

    let components = lifecycle::build(&config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        components.server.run(listener, rx).await.unwrap();
    });

    TestGateway {
        addr,
        shutdown,
        database: config.analytics.enabled.then_some(database),
        _dir: dir,
    }
}

/// Secret-mapping key for a local upstream, e.g. `127_0_0_1_4000_API_KEY`.
pub fn secret_key(addr: SocketAddr) -> String {
    service_gateway::gateway::credentials::secret_key_for_host(&addr.to_string())
}
