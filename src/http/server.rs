//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy handler claiming every path
//! - Wire up middleware (request ID, tracing)
//! - Bind server to listener
//! - Serve until the shutdown signal, then drain

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{validate_config, ConfigError, ProxyConfig};
use crate::http::proxy::ProxyEngine;
use crate::http::response::json_error;
use crate::routing::RouteTable;

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Validate the configuration and build the server.
    pub fn new(config: ProxyConfig) -> Result<Self, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let routes = RouteTable::from_config(&config.routes);
        let engine = ProxyEngine::new(&config.backend, routes)
            .map_err(|e| ConfigError::Validation(vec![e]))?;

        tracing::info!(
            backend = %config.backend.url,
            routes = engine.routes().len(),
            "Proxy engine ready"
        );

        let router = Self::build_router(engine);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(engine: ProxyEngine) -> Router {
        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .fallback(not_found)
            .with_state(engine)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The assembled router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backend = %self.config.backend.url,
            "HTTP server starting"
        );

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler; every path the router matches lands here.
async fn proxy_handler(State(engine): State<ProxyEngine>, request: Request<Body>) -> Response {
    engine.handle(request).await
}

async fn not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "Not found")
}
