//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → router.rs (exact lookup in the route table)
//!     → Return: mapped backend path, or the same path when unmapped
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → exact-match map keyed by client path
//!     → Freeze as immutable RouteTable (shared via Arc)
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Exact equality only: no prefixes, no patterns
//! - Unmapped paths are not an error; they pass through unchanged

pub mod router;

pub use router::{join_path, Resolution, RouteTable, PASSTHROUGH_ROUTE};
