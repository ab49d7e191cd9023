//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Proxy engine and middleware produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (request counters, latency histograms)
//!
//! Consumers:
//!     → stdout (fmt layer, filtered by RUST_LOG or config)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every proxy log line and on to the backend
//! - Payload bytes are never logged
//! - Metric recording is a no-op until an exporter is installed

pub mod logging;
pub mod metrics;
