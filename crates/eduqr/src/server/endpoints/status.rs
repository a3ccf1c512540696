use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::types::AppState;

/// GET /health
pub async fn get_health(State(s): State<Arc<AppState>>) -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "token_lead_minutes": s.config.attendance.token_lead_minutes,
        })),
    )
        .into_response()
}
