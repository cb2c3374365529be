use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use crate::types::activity::supported_formats;

pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "supportedFormats": supported_formats()
    }))
}
