//! QR attendance endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::server::types::ApiErrorType;
use crate::types::AppState;

#[derive(Debug, Deserialize)]
pub struct TokenBody {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ScanBody {
    pub token: String,
    pub student_id: i64,
}

/// GET /courses/:id/attendance-token
pub async fn get_attendance_token(
    Path(course_id): Path<i64>,
    State(s): State<Arc<AppState>>,
) -> Response {
    info!("GET /courses/{}/attendance-token", course_id);

    match s.attendance.generate_token(course_id, Utc::now()) {
        Ok(issued) => (StatusCode::OK, Json(issued)).into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}

/// POST /attendance/validate
pub async fn post_validate_token(
    State(s): State<Arc<AppState>>,
    Json(body): Json<TokenBody>,
) -> Response {
    info!("POST /attendance/validate");

    match s.attendance.validate_token(&body.token, Utc::now()) {
        Ok(validation) => (StatusCode::OK, Json(validation)).into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}

/// POST /attendance/scan
pub async fn post_scan(State(s): State<Arc<AppState>>, Json(body): Json<ScanBody>) -> Response {
    info!("POST /attendance/scan - student {}", body.student_id);

    match s.attendance.scan(&body.token, body.student_id, Utc::now()) {
        Ok(presence) => (StatusCode::CREATED, Json(presence)).into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}

/// POST /courses/:id/roll-call
pub async fn post_roll_call(Path(course_id): Path<i64>, State(s): State<Arc<AppState>>) -> Response {
    info!("POST /courses/{}/roll-call", course_id);

    match s.attendance.open_roll_call(course_id) {
        Ok(created) => (StatusCode::OK, Json(json!({ "created": created }))).into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}

/// GET /courses/:id/presences
pub async fn get_course_presences(
    Path(course_id): Path<i64>,
    State(s): State<Arc<AppState>>,
) -> Response {
    info!("GET /courses/{}/presences", course_id);

    match s.attendance.presences_by_course(course_id) {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}

/// GET /courses/:id/presence-stats
pub async fn get_presence_stats(
    Path(course_id): Path<i64>,
    State(s): State<Arc<AppState>>,
) -> Response {
    info!("GET /courses/{}/presence-stats", course_id);

    match s.attendance.presence_stats(course_id) {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}

/// GET /students/:id/presences
pub async fn get_student_presences(
    Path(student_id): Path<i64>,
    State(s): State<Arc<AppState>>,
) -> Response {
    info!("GET /students/{}/presences", student_id);

    match s.attendance.presences_by_student(student_id) {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}
