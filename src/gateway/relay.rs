//! Response relay.
//!
//! # Responsibilities
//! - Pick the relay mode once per response from the upstream content type
//! - Buffered: forward status, headers and body as received
//! - Streamed: pipe event-stream chunks through a chunked response
//!
//! # Data Flow
//! ```text
//! UpstreamResponse
//!     → RelayMode::for_headers
//!         Buffered → passthrough (strip framing headers)
//!         Streamed → wait for first chunk → chain(first, rest) → chunked body
//! ```
//!
//! # Design Decisions
//! - Streamed mode never collects the body; chunks leave in arrival order
//! - An event stream with no bytes at all is an error, not an empty 200
//! - Dropping the response body drops the upstream stream (client disconnect)

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue},
    response::Response,
};
use futures_util::stream::{self, StreamExt};

use crate::gateway::dispatch::{BodyStream, UpstreamResponse};
use crate::gateway::error::GatewayError;
use crate::gateway::headers::strip_hop_by_hop;

pub const EVENT_STREAM: &str = "text/event-stream";

/// Content type set on every streamed response.
pub const STREAMED_CONTENT_TYPE: &str = "application/json";

/// How a response body travels back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMode {
    Buffered,
    Streamed,
}

impl RelayMode {
    /// `Streamed` iff the media type (parameters ignored) is `text/event-stream`.
    pub fn for_headers(headers: &HeaderMap) -> Self {
        let is_event_stream = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(EVENT_STREAM));

        if is_event_stream {
            RelayMode::Streamed
        } else {
            RelayMode::Buffered
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelayMode::Buffered => "buffered",
            RelayMode::Streamed => "streamed",
        }
    }
}

/// Turn the upstream response into the caller's response.
pub async fn relay(upstream: UpstreamResponse) -> Result<(RelayMode, Response), GatewayError> {
    let mode = RelayMode::for_headers(&upstream.headers);
    let response = match mode {
        RelayMode::Buffered => passthrough(upstream),
        RelayMode::Streamed => stream_events(upstream).await?,
    };
    Ok((mode, response))
}

fn passthrough(upstream: UpstreamResponse) -> Response {
    let UpstreamResponse {
        status,
        mut headers,
        body,
    } = upstream;

    // The server re-frames the body; stale length/encoding headers would lie.
    strip_hop_by_hop(&mut headers);
    headers.remove(header::CONTENT_LENGTH);

    let mut response = Response::new(Body::from_stream(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

async fn stream_events(upstream: UpstreamResponse) -> Result<Response, GatewayError> {
    let UpstreamResponse { status, body, .. } = upstream;
    let (first, rest) = first_chunk(body).await?;

    let chunks = stream::once(async move { Ok::<_, std::io::Error>(first) }).chain(rest);

    let mut response = Response::new(Body::from_stream(chunks));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(STREAMED_CONTENT_TYPE));
    headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
    Ok(response)
}

/// Wait for the first non-empty chunk; an exhausted stream means no body.
async fn first_chunk(mut body: BodyStream) -> Result<(bytes::Bytes, BodyStream), GatewayError> {
    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(bytes) if bytes.is_empty() => continue,
            Ok(bytes) => return Ok((bytes, body)),
            Err(e) => return Err(GatewayError::UpstreamUnreachable(e.to_string())),
        }
    }
    Err(GatewayError::EmptyStreamBody)
}
