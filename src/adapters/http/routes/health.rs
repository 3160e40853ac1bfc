use axum::{Json, Router, response::IntoResponse, routing::get};

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health))
}

/// GET /api/health
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
