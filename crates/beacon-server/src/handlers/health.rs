//! `GET /healthz` — liveness probe.

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub async fn healthz() -> impl IntoResponse {
  (StatusCode::OK, Json(json!({ "status": "ok" })))
}
