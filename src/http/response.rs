//! Response handling and transformation.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions
//! - Detect chunked backend responses
//! - Stream chunked bodies through while tracking how the copy ended
//! - Build JSON error bodies for the client
//!
//! # Design Decisions
//! - Streaming responses never buffer; frames are forwarded as the server polls them
//! - Dropping the streamed body releases the backend connection
//! - `Transfer-Encoding` on responses is left to the server's framing layer

use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use hyper::body::{Body as HttpBody, Frame, Incoming, SizeHint};
use serde_json::json;

/// Headers that apply to a single connection and must not be forwarded.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "upgrade",
];

/// Strip hop-by-hop headers from a request about to be forwarded upstream.
///
/// Also drops `Transfer-Encoding`; the outbound connection picks its own framing.
pub fn strip_request_hop_by_hop(headers: &mut HeaderMap) {
    strip_hop_by_hop(headers);
    headers.remove(header::TRANSFER_ENCODING);
}

/// Strip hop-by-hop headers from a backend response before it reaches the client.
pub fn strip_response_hop_by_hop(headers: &mut HeaderMap) {
    strip_hop_by_hop(headers);
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers named by `Connection` are hop-by-hop too.
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(*name);
    }
}

/// True when the response declares chunked transfer encoding.
pub fn is_chunked(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::TRANSFER_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.to_ascii_lowercase().contains("chunked"))
}

/// `{"error": message}` with the given status.
pub fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// A streamed backend body that logs how the copy to the client ended.
///
/// The server polls this body only as fast as the client connection drains,
/// so backpressure reaches the backend socket unchanged.
#[derive(Debug)]
pub struct TrackedBody {
    inner: Incoming,
    route: String,
    request_id: String,
    bytes: u64,
    finished: bool,
}

impl TrackedBody {
    pub fn new(inner: Incoming, route: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            inner,
            route: route.into(),
            request_id: request_id.into(),
            bytes: 0,
            finished: false,
        }
    }
}

impl HttpBody for TrackedBody {
    type Data = Bytes;
    type Error = hyper::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.bytes += data.len() as u64;
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(Some(Err(e))) => {
                this.finished = true;
                tracing::warn!(
                    request_id = %this.request_id,
                    route = %this.route,
                    bytes = this.bytes,
                    error = %e,
                    "Upstream stream failed mid-copy"
                );
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.finished = true;
                tracing::debug!(
                    request_id = %this.request_id,
                    route = %this.route,
                    bytes = this.bytes,
                    "Stream complete"
                );
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for TrackedBody {
    fn drop(&mut self) {
        if !self.finished && !self.inner.is_end_stream() {
            tracing::warn!(
                request_id = %self.request_id,
                route = %self.route,
                bytes = self.bytes,
                "Client went away mid-stream, releasing upstream body"
            );
        }
    }
}
