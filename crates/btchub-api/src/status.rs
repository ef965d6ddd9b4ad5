use axum::Json;
use chrono::Utc;
use serde_json::{Value, json};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

/// Server clock, which the frontend shows as the data timestamp.
pub async fn last_updated() -> Json<String> {
    Json(Utc::now().to_rfc3339())
}
