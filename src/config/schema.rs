//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::transcode::TranscodeKind;

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The OpenAI-compatible backend every request is forwarded to.
    pub backend: BackendConfig,

    /// Client path → backend path mappings. Replaces the default table when set.
    pub routes: Vec<RouteConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            backend: BackendConfig::default(),
            routes: RouteConfig::ollama_defaults(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:1323").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:1323".to_string(),
        }
    }
}

/// Backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL: scheme, host and optional base path (e.g., "http://10.0.0.2:8000/openai").
    pub url: String,

    /// How long an idle pooled connection is kept, in seconds.
    pub pool_idle_timeout_secs: u64,

    /// Maximum idle pooled connections kept per backend host.
    pub pool_max_idle_per_host: usize,

    /// Upper bound on a response body read into memory for transcoding.
    pub max_buffered_body_bytes: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".to_string(),
            pool_idle_timeout_secs: 90,
            pool_max_idle_per_host: 32,
            max_buffered_body_bytes: 16 * 1024 * 1024,
        }
    }
}

/// A single exact-match path mapping.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Client-facing (Ollama) path, matched exactly.
    pub client_path: String,

    /// Backend (OpenAI) path, joined onto the backend base path.
    pub backend_path: String,

    /// Body conversion for non-streamed responses on this route.
    #[serde(default)]
    pub transcode: Option<TranscodeKind>,
}

impl RouteConfig {
    pub fn new(
        name: impl Into<String>,
        client_path: impl Into<String>,
        backend_path: impl Into<String>,
        transcode: Option<TranscodeKind>,
    ) -> Self {
        Self {
            name: name.into(),
            client_path: client_path.into(),
            backend_path: backend_path.into(),
            transcode,
        }
    }

    /// The Ollama endpoints served out of the box.
    pub fn ollama_defaults() -> Vec<Self> {
        vec![
            Self::new(
                "list_models",
                "/api/tags",
                "/v1/models",
                Some(TranscodeKind::ModelList),
            ),
            Self::new("chat", "/api/chat", "/v1/chat/completions", None),
        ]
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
