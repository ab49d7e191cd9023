//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → proxy.rs (route, rewrite, dispatch to backend)
//!     → response.rs (stream through, or buffer and transcode)
//!     → Send to client
//! ```

pub mod error;
pub mod proxy;
pub mod response;
pub mod server;

pub use error::ProxyError;
pub use proxy::{ForwardContext, ProxyEngine, ResponseMode, X_FORWARDED_PATH, X_REQUEST_ID};
pub use server::HttpServer;
