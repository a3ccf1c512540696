//! Course scheduling endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::SchedulingError;
use crate::scheduling::{validate_duration, Candidate, CoursePatch, CourseRequest};
use crate::server::types::ApiErrorType;
use crate::types::AppState;

#[derive(Debug, Deserialize)]
pub struct RangeParams {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A bare slot to check, independent of any course
#[derive(Debug, Deserialize)]
pub struct SlotBody {
    pub room_id: i64,
    pub start_time: DateTime<Utc>,
    /// Minutes
    pub duration: i64,
    #[serde(default)]
    pub exclude: Vec<i64>,
}

fn error_response(err: SchedulingError) -> Response {
    if err.is_fatal() {
        warn!("Request failed: {}", err);
    }
    ApiErrorType::from(err).into_response()
}

/// POST /courses
pub async fn post_course(
    State(s): State<Arc<AppState>>,
    Json(req): Json<CourseRequest>,
) -> Response {
    info!("POST /courses - room {} at {}", req.room_id, req.start_time);

    match s.scheduler.create_course(&req) {
        Ok(scheduled) => (StatusCode::CREATED, Json(scheduled)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /courses/:id
pub async fn get_course(Path(id): Path<i64>, State(s): State<Arc<AppState>>) -> Response {
    info!("GET /courses/{}", id);

    match s.scheduler.get_course(id) {
        Ok(course) => (StatusCode::OK, Json(course)).into_response(),
        Err(e) => error_response(e),
    }
}

/// PUT /courses/:id
///
/// Updating a recurring parent replaces the series; the response carries the
/// new parent id.
pub async fn put_course(
    Path(id): Path<i64>,
    State(s): State<Arc<AppState>>,
    Json(patch): Json<CoursePatch>,
) -> Response {
    info!("PUT /courses/{}", id);

    match s.scheduler.update_course(id, &patch) {
        Ok(scheduled) => (StatusCode::OK, Json(scheduled)).into_response(),
        Err(e) => error_response(e),
    }
}

/// DELETE /courses/:id
pub async fn delete_course(Path(id): Path<i64>, State(s): State<Arc<AppState>>) -> Response {
    info!("DELETE /courses/{}", id);

    match s.scheduler.delete_course(id) {
        Ok(removed) => (StatusCode::OK, Json(json!({ "deleted": removed }))).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /courses?start=..&end=..
pub async fn get_courses_in_range(
    State(s): State<Arc<AppState>>,
    Query(params): Query<RangeParams>,
) -> Response {
    info!("GET /courses - {} to {}", params.start, params.end);

    match s.scheduler.courses_in_range(params.start, params.end) {
        Ok(courses) => (StatusCode::OK, Json(courses)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /rooms/:id/courses
pub async fn get_room_courses(Path(room_id): Path<i64>, State(s): State<Arc<AppState>>) -> Response {
    info!("GET /rooms/{}/courses", room_id);

    match s.scheduler.courses_by_room(room_id) {
        Ok(courses) => (StatusCode::OK, Json(courses)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /teachers/:id/courses
pub async fn get_teacher_courses(
    Path(teacher_id): Path<i64>,
    State(s): State<Arc<AppState>>,
) -> Response {
    info!("GET /teachers/{}/courses", teacher_id);

    match s.scheduler.courses_by_teacher(teacher_id) {
        Ok(courses) => (StatusCode::OK, Json(courses)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /courses/:id/series
pub async fn get_series(Path(id): Path<i64>, State(s): State<Arc<AppState>>) -> Response {
    info!("GET /courses/{}/series", id);

    match s.scheduler.series(id) {
        Ok(series) => (StatusCode::OK, Json(series)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /courses/check-conflicts
///
/// Dry run of a create request.
pub async fn post_check_conflicts(
    State(s): State<Arc<AppState>>,
    Json(req): Json<CourseRequest>,
) -> Response {
    info!("POST /courses/check-conflicts - room {}", req.room_id);

    match s.scheduler.check_conflicts_for_request(&req) {
        Ok(conflicts) => (
            StatusCode::OK,
            Json(json!({
                "has_conflicts": !conflicts.is_empty(),
                "conflicts": conflicts,
            })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /courses/:id/check-conflicts
///
/// Dry run of an update.
pub async fn post_check_update_conflicts(
    Path(id): Path<i64>,
    State(s): State<Arc<AppState>>,
    Json(patch): Json<CoursePatch>,
) -> Response {
    info!("POST /courses/{}/check-conflicts", id);

    match s.scheduler.check_conflicts_for_update(id, &patch) {
        Ok(conflicts) => (
            StatusCode::OK,
            Json(json!({
                "has_conflicts": !conflicts.is_empty(),
                "conflicts": conflicts,
            })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /conflicts
///
/// Checks a raw slot against the room's contention group.
pub async fn post_check_slot(
    State(s): State<Arc<AppState>>,
    Json(body): Json<SlotBody>,
) -> Response {
    info!("POST /conflicts - room {} at {}", body.room_id, body.start_time);

    if let Err(e) = validate_duration(body.duration) {
        return error_response(e);
    }
    let candidate = Candidate::new(body.room_id, body.start_time, body.duration);
    let exclude: HashSet<i64> = body.exclude.into_iter().collect();

    match s.scheduler.check_conflicts(&candidate, &exclude) {
        Ok(conflicts) => (
            StatusCode::OK,
            Json(json!({
                "has_conflicts": !conflicts.is_empty(),
                "conflicts": conflicts,
            })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}
