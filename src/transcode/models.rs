//! List-models schemas on both sides of the proxy.
//!
//! The backend speaks the OpenAI `GET /v1/models` shape; clients expect the
//! Ollama `GET /api/tags` shape. The backend has no separate "name" and
//! "model", so both client fields carry the backend `id`.

use serde::{Deserialize, Serialize};

/// One entry of the OpenAI model listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BackendModel {
    pub id: String,
    #[serde(default)]
    pub object: String,
}

/// OpenAI `GET /v1/models` response body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct BackendModelList {
    #[serde(default)]
    pub data: Vec<BackendModel>,
}

/// One entry of the Ollama tag listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClientModel {
    pub name: String,
    pub model: String,
}

/// Ollama `GET /api/tags` response body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClientModelList {
    pub models: Vec<ClientModel>,
}

impl From<BackendModel> for ClientModel {
    fn from(model: BackendModel) -> Self {
        Self {
            name: model.id.clone(),
            model: model.id,
        }
    }
}

/// Map every backend entry to a client entry, preserving order.
pub fn to_client_model(list: BackendModelList) -> ClientModelList {
    ClientModelList {
        models: list.data.into_iter().map(ClientModel::from).collect(),
    }
}
