//! Failure-body capture for analytics.
//!
//! # Design Decisions
//! - The caller receives every byte unchanged; only a capped copy is kept
//! - The completion callback fires once: at end of stream, on a body error,
//!   or when the body is dropped early (client disconnect)

use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::{Body, BodyDataStream};
use axum::response::Response;
use bytes::Bytes;
use futures_util::Stream;

/// Upper bound on the failure body kept for analytics.
pub const CAPTURE_LIMIT: usize = 64 * 1024;

type OnComplete = Box<dyn FnOnce(String) + Send>;

/// A response body that tees a capped copy of what it yields.
pub struct CapturedBody {
    inner: BodyDataStream,
    captured: Vec<u8>,
    limit: usize,
    on_complete: Option<OnComplete>,
}

impl CapturedBody {
    pub fn new(
        body: Body,
        limit: usize,
        on_complete: impl FnOnce(String) + Send + 'static,
    ) -> Self {
        Self {
            inner: body.into_data_stream(),
            captured: Vec::new(),
            limit,
            on_complete: Some(Box::new(on_complete)),
        }
    }

    fn complete(&mut self) {
        if let Some(on_complete) = self.on_complete.take() {
            on_complete(String::from_utf8_lossy(&self.captured).into_owned());
        }
    }
}

impl Stream for CapturedBody {
    type Item = Result<Bytes, axum::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_next(cx);
        match &polled {
            Poll::Ready(Some(Ok(chunk))) => {
                let room = this.limit.saturating_sub(this.captured.len());
                this.captured.extend_from_slice(&chunk[..chunk.len().min(room)]);
            }
            Poll::Ready(Some(Err(_))) | Poll::Ready(None) => this.complete(),
            Poll::Pending => {}
        }
        polled
    }
}

impl Drop for CapturedBody {
    fn drop(&mut self) {
        self.complete();
    }
}

/// Rewrap `response` so its body text reaches `on_complete` once fully sent.
pub fn capture(
    response: Response,
    limit: usize,
    on_complete: impl FnOnce(String) + Send + 'static,
) -> Response {
    let (parts, body) = response.into_parts();
    Response::from_parts(parts, Body::from_stream(CapturedBody::new(body, limit, on_complete)))
}
