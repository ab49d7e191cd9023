//! Proxy error taxonomy.
//!
//! Every failure the engine can hit after a route is claimed ends up here and
//! is answered with `502 Bad Gateway`. The client only ever sees a short
//! generic message; the cause goes to the log.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::http::response::json_error;
use crate::transcode::TranscodeError;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The rewritten backend URI could not be assembled.
    #[error("invalid backend uri: {0}")]
    InvalidUri(#[from] axum::http::Error),

    /// The backend could not be reached or failed before sending headers.
    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    /// The backend body failed or exceeded the buffer limit while being read.
    #[error("failed to read upstream body: {0}")]
    BodyRead(#[source] axum::Error),

    #[error(transparent)]
    Transcode(#[from] TranscodeError),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        StatusCode::BAD_GATEWAY
    }

    /// Client-facing message; deliberately free of upstream detail.
    pub fn public_message(&self) -> &'static str {
        match self {
            ProxyError::InvalidUri(_) | ProxyError::Upstream(_) => "Proxy error",
            ProxyError::BodyRead(_) | ProxyError::Transcode(_) => "Invalid response from upstream",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        json_error(self.status(), self.public_message())
    }
}
