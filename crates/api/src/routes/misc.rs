use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use crate::GlobalState;

/// Liveness probe. Mounted outside the rate-limited `/api` tree and replies
/// without an envelope.
pub fn misc_routes() -> Router<GlobalState> {
    Router::new().route("/health",
        get(health)
    )
}

async fn health() -> Json<Value> {
    let environment = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
    Json(json!({
        "status": "OK",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "environment": environment,
    }))
}
