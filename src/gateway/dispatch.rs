//! Upstream dispatch.
//!
//! # Responsibilities
//! - Build the target URL from the directive host and the original path/query
//! - Issue exactly one outbound call with the original method and body
//! - Hand back status, headers and a chunk stream for the relay
//!
//! # Design Decisions
//! - No retry, no timeout beyond the transport default
//! - Request and response bodies are streamed, never buffered here
//! - `Dispatcher` is a trait so the orchestrator can run against fakes

use async_trait::async_trait;
use axum::body::{Body, HttpBody};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use bytes::Bytes;
use futures_util::stream::{BoxStream, StreamExt};
use url::Url;

use crate::config::UpstreamConfig;
use crate::gateway::directive::SERVICE_HOST;
use crate::gateway::error::GatewayError;

/// Chunked response body as received from upstream.
pub type BodyStream = BoxStream<'static, Result<Bytes, std::io::Error>>;

/// A fully prepared request owned by the dispatcher for one call.
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Body,
}

impl std::fmt::Debug for OutboundRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Header values may carry the injected credential.
        f.debug_struct("OutboundRequest")
            .field("method", &self.method)
            .field("host", &self.url.host_str())
            .field("path", &self.url.path())
            .finish()
    }
}

/// Response handed from the dispatcher to the relay.
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: BodyStream,
}

impl UpstreamResponse {
    /// Convenience for fakes and tests: a response from in-memory chunks.
    pub fn from_chunks<I>(status: StatusCode, headers: HeaderMap, chunks: I) -> Self
    where
        I: IntoIterator<Item = Bytes>,
        I::IntoIter: Send + 'static,
    {
        let stream = futures_util::stream::iter(chunks.into_iter().map(Ok));
        Self {
            status,
            headers,
            body: stream.boxed(),
        }
    }
}

/// Issues the single outbound call for a request.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, request: OutboundRequest) -> Result<UpstreamResponse, GatewayError>;
}

/// Build `{scheme}://{host}{path}?{query}` for the upstream.
pub fn target_url(scheme: &str, host: &str, original: &Uri) -> Result<Url, GatewayError> {
    let path_and_query = original
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    if !is_bare_authority(host) {
        return Err(invalid_host());
    }

    let url = Url::parse(&format!("{}://{}{}", scheme, host, path_and_query))
        .map_err(|_| invalid_host())?;
    if url.host_str().is_none() {
        return Err(invalid_host());
    }
    Ok(url)
}

/// A host (optionally with port) and nothing else: no path, query, userinfo or whitespace.
fn is_bare_authority(host: &str) -> bool {
    !host.is_empty()
        && !host
            .chars()
            .any(|c| matches!(c, '/' | '?' | '#' | '@' | '\\') || c.is_whitespace())
}

fn invalid_host() -> GatewayError {
    GatewayError::InvalidDirective(format!("{} header is invalid.", SERVICE_HOST))
}

/// `reqwest`-backed dispatcher used in production.
#[derive(Clone)]
pub struct HttpDispatcher {
    client: reqwest::Client,
    user_agent: Option<HeaderValue>,
}

impl HttpDispatcher {
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        let user_agent = config.user_agent.as_deref().and_then(|ua| {
            HeaderValue::from_str(ua)
                .inspect_err(|_| tracing::warn!("Ignoring invalid upstream.user_agent"))
                .ok()
        });
        Ok(Self { client, user_agent })
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn dispatch(&self, request: OutboundRequest) -> Result<UpstreamResponse, GatewayError> {
        let OutboundRequest {
            method,
            url,
            mut headers,
            body,
        } = request;

        if let Some(ua) = &self.user_agent {
            headers.entry(header::USER_AGENT).or_insert_with(|| ua.clone());
        }

        let mut builder = self.client.request(method, url).headers(headers);
        if !body.is_end_stream() {
            builder = builder.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| GatewayError::UpstreamUnreachable(e.to_string()))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other))
            .boxed();

        Ok(UpstreamResponse { status, headers, body })
    }
}
