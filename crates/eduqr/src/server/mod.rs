use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::server::endpoints::{attendance, courses, status};
use crate::types::AppState;

mod endpoints;
mod types;

pub use types::ApiErrorType;

/// Creates a router that can be used by `axum`.
///
/// # Parameters
/// - `app_state`: The app server state.
///
/// # Returns
/// The router.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let course_router = Router::new()
        .route(
            "/courses",
            get(courses::get_courses_in_range).post(courses::post_course),
        )
        .route("/courses/check-conflicts", post(courses::post_check_conflicts))
        .route(
            "/courses/:id",
            get(courses::get_course)
                .put(courses::put_course)
                .delete(courses::delete_course),
        )
        .route("/courses/:id/series", get(courses::get_series))
        .route(
            "/courses/:id/check-conflicts",
            post(courses::post_check_update_conflicts),
        )
        .route("/conflicts", post(courses::post_check_slot))
        .route("/rooms/:id/courses", get(courses::get_room_courses))
        .route("/teachers/:id/courses", get(courses::get_teacher_courses));

    let attendance_router = Router::new()
        .route(
            "/courses/:id/attendance-token",
            get(attendance::get_attendance_token),
        )
        .route("/courses/:id/roll-call", post(attendance::post_roll_call))
        .route("/courses/:id/presences", get(attendance::get_course_presences))
        .route(
            "/courses/:id/presence-stats",
            get(attendance::get_presence_stats),
        )
        .route("/attendance/validate", post(attendance::post_validate_token))
        .route("/attendance/scan", post(attendance::post_scan))
        .route(
            "/students/:id/presences",
            get(attendance::get_student_presences),
        );

    Router::new()
        .route("/health", get(status::get_health))
        .merge(course_router)
        .merge(attendance_router)
        .with_state(app_state)
}
