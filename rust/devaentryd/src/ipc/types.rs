use serde::Deserialize;

use crate::engine::Engine;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub engine: Engine,
    /// Backend name reported by `health`.
    pub backend: String,
}
