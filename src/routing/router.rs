//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled client path → backend path mappings
//! - Resolve a client path to its backend path and response handling
//! - Join the resolved path onto the backend base path
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) lookup via HashMap
//! - Identity passthrough rather than an explicit no-match

use std::collections::HashMap;

use crate::config::RouteConfig;
use crate::transcode::TranscodeKind;

/// Route name reported for paths that are not in the table.
pub const PASSTHROUGH_ROUTE: &str = "passthrough";

#[derive(Debug, Clone)]
struct RouteEntry {
    name: String,
    backend_path: String,
    transcode: Option<TranscodeKind>,
}

/// Outcome of resolving one client path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution<'a> {
    /// Route name for logs and metrics.
    pub name: &'a str,
    /// Path to request on the backend, before joining the base path.
    pub backend_path: &'a str,
    /// Conversion for a buffered response, if the route has one.
    pub transcode: Option<TranscodeKind>,
}

/// Fixed table of exact client path → backend path mappings.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: HashMap<String, RouteEntry>,
}

impl RouteTable {
    /// Compile the table from configuration. Later duplicates win; validation
    /// rejects them before this point.
    pub fn from_config(routes: &[RouteConfig]) -> Self {
        let routes = routes
            .iter()
            .map(|r| {
                (
                    r.client_path.clone(),
                    RouteEntry {
                        name: r.name.clone(),
                        backend_path: r.backend_path.clone(),
                        transcode: r.transcode,
                    },
                )
            })
            .collect();
        Self { routes }
    }

    /// Map a client path to its backend path. Unmapped paths come back unchanged.
    pub fn route<'a>(&'a self, client_path: &'a str) -> &'a str {
        self.resolve(client_path).backend_path
    }

    /// Full routing decision for a client path.
    pub fn resolve<'a>(&'a self, client_path: &'a str) -> Resolution<'a> {
        match self.routes.get(client_path) {
            Some(entry) => Resolution {
                name: &entry.name,
                backend_path: &entry.backend_path,
                transcode: entry.transcode,
            },
            None => Resolution {
                name: PASSTHROUGH_ROUTE,
                backend_path: client_path,
                transcode: None,
            },
        }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::from_config(&RouteConfig::ollama_defaults())
    }
}

/// Concatenate two path segments with exactly one slash between them.
pub fn join_path(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapped_paths() {
        let table = RouteTable::default();
        assert_eq!(table.route("/api/tags"), "/v1/models");
        assert_eq!(table.route("/api/chat"), "/v1/chat/completions");

        let tags = table.resolve("/api/tags");
        assert_eq!(tags.name, "list_models");
        assert_eq!(tags.transcode, Some(TranscodeKind::ModelList));

        let chat = table.resolve("/api/chat");
        assert_eq!(chat.name, "chat");
        assert_eq!(chat.transcode, None);
    }

    #[test]
    fn test_unmapped_paths_are_identity() {
        let table = RouteTable::default();
        for path in ["/", "/api/generate", "/v1/embeddings", "/custom/thing"] {
            let res = table.resolve(path);
            assert_eq!(res.backend_path, path);
            assert_eq!(res.name, PASSTHROUGH_ROUTE);
            assert_eq!(res.transcode, None);
        }
    }

    #[test]
    fn test_exact_match_only() {
        let table = RouteTable::default();
        assert_eq!(table.route("/api/tags/"), "/api/tags/");
        assert_eq!(table.route("/api/tagsx"), "/api/tagsx");
        assert_eq!(table.route("/api/chat/extra"), "/api/chat/extra");
        assert_eq!(table.route("/API/TAGS"), "/API/TAGS");
    }

    #[test]
    fn test_routing_backend_paths_is_noop() {
        let table = RouteTable::default();
        for path in ["/api/tags", "/api/chat", "/other"] {
            let once = table.route(path);
            assert_eq!(table.route(once), once);
        }
    }

    #[test]
    fn test_from_config_custom_table() {
        let table = RouteTable::from_config(&[RouteConfig::new(
            "generate",
            "/api/generate",
            "/v1/completions",
            None,
        )]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.route("/api/generate"), "/v1/completions");
        assert_eq!(table.route("/api/tags"), "/api/tags");
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/", "/v1/models"), "/v1/models");
        assert_eq!(join_path("", "/v1/models"), "/v1/models");
        assert_eq!(join_path("/base", "/v1/models"), "/base/v1/models");
        assert_eq!(join_path("/base/", "/v1/models"), "/base/v1/models");
        assert_eq!(join_path("/base", "v1/models"), "/base/v1/models");
        assert_eq!(join_path("/base/", "v1/models"), "/base/v1/models");
    }
}
