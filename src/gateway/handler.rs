//! Per-request orchestration.
//!
//! # Data Flow
//! ```text
//! Request
//!     → GatewayDirective::from_headers      (MissingTarget → 400)
//!     → credentials::resolve                (MissingCredential → 400)
//!     → headers::for_upstream + auth::inject
//!     → Dispatcher::dispatch                (UpstreamUnreachable → 502)
//!     → relay::relay                        (EmptyStreamBody → 500)
//!     → Response
//!     ↘ tokio::spawn(analytics.record(..))  detached; for 4xx/5xx
//!       upstream replies, after the body has been sent
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::Request,
    response::{IntoResponse, Response},
};

use crate::analytics::{AnalyticsSink, ExchangeRecord};
use crate::config::UpstreamConfig;
use crate::gateway::credentials::{self, SecretMap};
use crate::gateway::directive::GatewayDirective;
use crate::gateway::dispatch::{self, Dispatcher, OutboundRequest};
use crate::gateway::error::GatewayError;
use crate::gateway::relay::{self, RelayMode};
use crate::gateway::capture::{self, CAPTURE_LIMIT};
use crate::gateway::{auth, headers};
use crate::observability::metrics;

/// The forwarding gateway. Stateless apart from its injected collaborators.
pub struct Gateway {
    secrets: Arc<SecretMap>,
    dispatcher: Arc<dyn Dispatcher>,
    analytics: Option<Arc<dyn AnalyticsSink>>,
    scheme: String,
}

impl Gateway {
    pub fn new(
        secrets: Arc<SecretMap>,
        dispatcher: Arc<dyn Dispatcher>,
        analytics: Option<Arc<dyn AnalyticsSink>>,
        upstream: &UpstreamConfig,
    ) -> Self {
        Self {
            secrets,
            dispatcher,
            analytics,
            scheme: upstream.scheme.clone(),
        }
    }

    /// Handle one inbound request end to end. Never fails; errors become responses.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let method = request.method().to_string();
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        let exchange = self.analytics.as_ref().map(|_| {
            ExchangeRecord::capture(request.method(), request.uri(), request.headers(), peer)
        });

        let (response, mode, error) = match self.forward(request).await {
            Ok((mode, response)) => (response, mode.as_str(), None),
            Err(err) => {
                tracing::warn!(method = %method, status = %err.status(), error = %err, "Request rejected");
                if let GatewayError::UpstreamUnreachable(detail) = &err {
                    tracing::error!(error = %detail, "Upstream error");
                }
                let body = err.body().to_json();
                (err.into_response(), "error", Some(body))
            }
        };

        let status = response.status();
        metrics::record_request(&method, status.as_u16(), mode, start);

        let (Some(sink), Some(exchange)) = (&self.analytics, exchange) else {
            return response;
        };
        let sink = Arc::clone(sink);

        // Upstream failures are recorded with their body text once it has been sent.
        if error.is_none() && (status.is_client_error() || status.is_server_error()) {
            return capture::capture(response, CAPTURE_LIMIT, move |body| {
                let error = Some(body).filter(|b| !b.is_empty());
                spawn_record(sink, exchange.finish(status.as_u16(), error));
            });
        }

        spawn_record(sink, exchange.finish(status.as_u16(), error));
        response
    }

    async fn forward(&self, request: Request<Body>) -> Result<(RelayMode, Response), GatewayError> {
        let (parts, body) = request.into_parts();

        let directive = GatewayDirective::from_headers(&parts.headers)?;
        let credential = credentials::resolve(&directive, &self.secrets)?;

        let mut outbound_headers = headers::for_upstream(&parts.headers);
        let mut url = dispatch::target_url(&self.scheme, &directive.target_host, &parts.uri)?;
        auth::inject(&directive, &credential, &mut outbound_headers, &mut url)?;

        tracing::debug!(
            method = %parts.method,
            target_host = %directive.target_host,
            path = %url.path(),
            "Forwarding request"
        );

        let upstream = self
            .dispatcher
            .dispatch(OutboundRequest {
                method: parts.method,
                url,
                headers: outbound_headers,
                body,
            })
            .await?;

        relay::relay(upstream).await
    }
}

/// Persist the exchange on a detached task; failures are logged and dropped.
fn spawn_record(sink: Arc<dyn AnalyticsSink>, exchange: ExchangeRecord) {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        tracing::warn!("No runtime to persist exchange analytics");
        return;
    };
    runtime.spawn(async move {
        if let Err(e) = sink.record(exchange).await {
            metrics::record_analytics_failure();
            tracing::warn!(error = %e, "Failed to persist exchange analytics");
        }
    });
}
