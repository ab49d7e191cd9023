//! Schema transcoding subsystem.
//!
//! # Data Flow
//! ```text
//! Buffered backend body (OpenAI-shaped JSON)
//!     → decode into the backend schema (models.rs)
//!     → pure conversion to the client schema
//!     → encode → new body bytes (caller recomputes Content-Length)
//! ```
//!
//! # Design Decisions
//! - Conversions are pure and total over well-formed input
//! - Malformed input surfaces as `TranscodeError::Decode`, never a panic
//! - Which transcoding applies is chosen by the route, not by the response

pub mod models;

use axum::body::Bytes;
use serde::{Deserialize, Serialize};

pub use models::{
    to_client_model, BackendModel, BackendModelList, ClientModel, ClientModelList,
};

/// Errors raised while converting a backend body.
#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    // Position and category only: serde messages can quote payload fragments.
    #[error(
        "failed to decode backend payload: {:?} error at line {} column {}",
        .0.classify(),
        .0.line(),
        .0.column()
    )]
    Decode(#[source] serde_json::Error),
    #[error("failed to encode client payload: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Selects the body conversion applied to a buffered backend response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscodeKind {
    /// OpenAI `{"data":[{"id",...}]}` → Ollama `{"models":[{"name","model"}]}`.
    ModelList,
}

impl TranscodeKind {
    /// Convert a complete backend body into the client-facing body.
    pub fn apply(self, body: &[u8]) -> Result<Bytes, TranscodeError> {
        match self {
            TranscodeKind::ModelList => {
                let backend: BackendModelList =
                    serde_json::from_slice(body).map_err(TranscodeError::Decode)?;
                let client = to_client_model(backend);
                let encoded = serde_json::to_vec(&client).map_err(TranscodeError::Encode)?;
                Ok(Bytes::from(encoded))
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TranscodeKind::ModelList => "model_list",
        }
    }
}
