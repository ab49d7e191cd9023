//! Proxy engine: one inbound request in, one backend call, one response out.
//!
//! # Request lifecycle
//! ```text
//! Received → Routed → Dispatched ─┬→ StreamingCopy      → Closed
//!                                 ├→ BufferedTranscode  → Closed
//!                                 ├→ Passthrough        → Closed
//!                                 └→ ErrorResponded (502)
//! ```
//!
//! # Design Decisions
//! - Exactly one outbound request per inbound request; nothing is retried
//! - Routing happens once; the decision travels in a `ForwardContext`
//!   so response handling never re-derives the endpoint from the backend path
//! - Chunked responses stream; everything else on a transcoding route is buffered
//! - Each branch takes ownership of the backend body, so it is consumed or
//!   dropped exactly once

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use hyper::body::Incoming;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::{TokioExecutor, TokioTimer};
use url::Url;

use crate::config::{BackendConfig, ValidationError};
use crate::http::error::ProxyError;
use crate::http::response::{
    is_chunked, strip_request_hop_by_hop, strip_response_hop_by_hop, TrackedBody,
};
use crate::observability::metrics;
use crate::routing::{join_path, RouteTable};
use crate::transcode::TranscodeKind;

/// Carries the original client path to the backend.
pub const X_FORWARDED_PATH: HeaderName = HeaderName::from_static("x-forwarded-path");
pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Scheme, authority and base path of the backend, parsed once at startup.
#[derive(Debug, Clone)]
pub struct BackendTarget {
    scheme: Scheme,
    authority: Authority,
    base_path: String,
}

impl BackendTarget {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let invalid = |reason: String| ValidationError::BackendUrl {
            url: raw.to_string(),
            reason,
        };

        let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
        let scheme = url
            .scheme()
            .parse::<Scheme>()
            .map_err(|e| invalid(e.to_string()))?;
        let host = url
            .host_str()
            .ok_or_else(|| invalid("missing host".to_string()))?;
        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
        .parse::<Authority>()
        .map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            scheme,
            authority,
            base_path: url.path().to_string(),
        })
    }

    /// Backend URI for a routed path, with the client query copied verbatim.
    pub fn uri_for(&self, backend_path: &str, query: Option<&str>) -> Result<Uri, ProxyError> {
        let path = join_path(&self.base_path, backend_path);
        let path_and_query = match query {
            Some(q) => format!("{}?{}", path, q),
            None => path,
        };
        let path_and_query =
            PathAndQuery::try_from(path_and_query).map_err(axum::http::Error::from)?;

        Ok(Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()?)
    }
}

/// Per-request routing decision carried from dispatch to response handling.
#[derive(Debug, Clone)]
pub struct ForwardContext {
    pub request_id: String,
    pub method: Method,
    /// Path as the client sent it.
    pub client_path: String,
    /// Route name for logs and metrics.
    pub route: String,
    /// Routed path before the backend base path is joined on.
    pub backend_path: String,
    pub transcode: Option<TranscodeKind>,
}

/// Which branch owns the backend body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Chunked: copy frames to the client as they arrive.
    Streaming,
    /// Fixed-length on a transcoding route: buffer, convert, re-frame.
    Transcode(TranscodeKind),
    /// Fixed-length, no conversion: status, headers and bytes unchanged.
    Passthrough,
}

impl ResponseMode {
    pub fn select(ctx: &ForwardContext, status: StatusCode, headers: &HeaderMap) -> Self {
        if is_chunked(headers) {
            return ResponseMode::Streaming;
        }
        match ctx.transcode {
            // HEAD carries no body and error statuses carry the backend's own error shape.
            // Non-2xx bodies pass through as-is instead of being decoded into a model list.
            Some(kind) if ctx.method != Method::HEAD && status.is_success() => {
                ResponseMode::Transcode(kind)
            }
            _ => ResponseMode::Passthrough,
        }
    }
}

/// Owns the pooled backend client and the immutable route table.
#[derive(Clone)]
pub struct ProxyEngine {
    client: Client<HttpConnector, Body>,
    target: Arc<BackendTarget>,
    routes: Arc<RouteTable>,
    max_buffered_body_bytes: usize,
}

impl ProxyEngine {
    pub fn new(backend: &BackendConfig, routes: RouteTable) -> Result<Self, ValidationError> {
        let target = BackendTarget::parse(&backend.url)?;
        let client = Client::builder(TokioExecutor::new())
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(Duration::from_secs(backend.pool_idle_timeout_secs))
            .pool_max_idle_per_host(backend.pool_max_idle_per_host)
            .build(HttpConnector::new());

        Ok(Self {
            client,
            target: Arc::new(target),
            routes: Arc::new(routes),
            max_buffered_body_bytes: backend.max_buffered_body_bytes,
        })
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Proxy one request. Never fails: errors become a JSON `502`.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let ctx = self.context_for(&request);

        tracing::debug!(
            request_id = %ctx.request_id,
            method = %ctx.method,
            path = %ctx.client_path,
            route = %ctx.route,
            backend_path = %ctx.backend_path,
            "Proxying request"
        );

        let response = match self.forward(request, &ctx).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    request_id = %ctx.request_id,
                    route = %ctx.route,
                    path = %ctx.client_path,
                    error = %e,
                    "Proxy error"
                );
                e.into_response()
            }
        };

        metrics::record_request(
            ctx.method.as_str(),
            response.status().as_u16(),
            &ctx.route,
            start,
        );
        response
    }

    /// Route the request and capture everything response handling needs.
    pub fn context_for(&self, request: &Request<Body>) -> ForwardContext {
        let client_path = request.uri().path();
        let resolution = self.routes.resolve(client_path);
        let request_id = request
            .headers()
            .get(&X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        ForwardContext {
            request_id,
            method: request.method().clone(),
            client_path: client_path.to_string(),
            route: resolution.name.to_string(),
            backend_path: resolution.backend_path.to_string(),
            transcode: resolution.transcode,
        }
    }

    async fn forward(
        &self,
        request: Request<Body>,
        ctx: &ForwardContext,
    ) -> Result<Response, ProxyError> {
        let outbound = self.build_outbound(request, ctx)?;
        let upstream = self.client.request(outbound).await?;
        self.respond(ctx, upstream).await
    }

    /// Rewrite scheme, authority and path; keep query, method and body; clone headers.
    pub fn build_outbound(
        &self,
        request: Request<Body>,
        ctx: &ForwardContext,
    ) -> Result<Request<Body>, ProxyError> {
        let client_addr = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        let (parts, body) = request.into_parts();

        let uri = self.target.uri_for(&ctx.backend_path, parts.uri.query())?;

        let mut headers = parts.headers.clone();
        strip_request_hop_by_hop(&mut headers);
        // The client fills in Host from the backend URI.
        headers.remove(header::HOST);
        if ctx.transcode.is_some() {
            // Transcoding needs an identity-encoded body.
            headers.remove(header::ACCEPT_ENCODING);
        }
        if let Ok(value) = HeaderValue::from_str(&ctx.client_path) {
            headers.insert(X_FORWARDED_PATH, value);
        }
        if let Ok(value) = HeaderValue::from_str(&ctx.request_id) {
            headers.insert(X_REQUEST_ID, value);
        }
        if let Some(ip) = client_addr {
            let forwarded = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
                Some(prior) => format!("{}, {}", prior, ip),
                None => ip.to_string(),
            };
            if let Ok(value) = HeaderValue::from_str(&forwarded) {
                headers.insert(X_FORWARDED_FOR, value);
            }
        }

        let mut outbound = Request::builder()
            .method(parts.method)
            .uri(uri)
            .body(body)?;
        *outbound.headers_mut() = headers;
        Ok(outbound)
    }

    async fn respond(
        &self,
        ctx: &ForwardContext,
        upstream: Response<Incoming>,
    ) -> Result<Response, ProxyError> {
        let mode = ResponseMode::select(ctx, upstream.status(), upstream.headers());
        let (mut parts, body) = upstream.into_parts();
        strip_response_hop_by_hop(&mut parts.headers);

        tracing::debug!(
            request_id = %ctx.request_id,
            route = %ctx.route,
            status = %parts.status,
            mode = ?mode,
            "Upstream responded"
        );

        match mode {
            ResponseMode::Streaming => {
                let body = TrackedBody::new(body, ctx.route.as_str(), ctx.request_id.as_str());
                Ok(Response::from_parts(parts, Body::new(body)))
            }
            ResponseMode::Passthrough => Ok(Response::from_parts(parts, Body::new(body))),
            ResponseMode::Transcode(kind) => {
                let raw = axum::body::to_bytes(Body::new(body), self.max_buffered_body_bytes)
                    .await
                    .map_err(ProxyError::BodyRead)?;
                let encoded = kind.apply(&raw)?;

                parts.headers.insert(header::CONTENT_LENGTH, HeaderValue::from(encoded.len()));
                tracing::debug!(
                    request_id = %ctx.request_id,
                    route = %ctx.route,
                    transcode = kind.as_str(),
                    upstream_bytes = raw.len(),
                    client_bytes = encoded.len(),
                    "Transcoded response"
                );
                Ok(Response::from_parts(parts, Body::from(encoded)))
            }
        }
    }
}
