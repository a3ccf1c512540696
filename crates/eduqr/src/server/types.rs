use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::SchedulingError;
use crate::scheduling::ConflictInfo;

/// JSON error body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiErrorType {
    #[serde(skip)]
    status: StatusCode,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    conflicts: Option<Vec<ConflictInfo>>,
}

impl From<(StatusCode, &str, Option<String>)> for ApiErrorType {
    fn from((status, error, message): (StatusCode, &str, Option<String>)) -> Self {
        Self {
            status,
            error: error.to_string(),
            message,
            conflicts: None,
        }
    }
}

impl From<SchedulingError> for ApiErrorType {
    fn from(err: SchedulingError) -> Self {
        let (status, error) = match &err {
            SchedulingError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            SchedulingError::InvalidRole { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_role"),
            SchedulingError::ConflictDetected { .. } => (StatusCode::CONFLICT, "conflict_detected"),
            SchedulingError::RecurrenceWindowInvalid => {
                (StatusCode::UNPROCESSABLE_ENTITY, "recurrence_window_invalid")
            }
            SchedulingError::ChildEditForbidden { .. } => (StatusCode::FORBIDDEN, "child_edit_forbidden"),
            SchedulingError::AlreadyScanned => (StatusCode::CONFLICT, "already_scanned"),
            SchedulingError::WindowClosed { .. } => (StatusCode::GONE, "window_closed"),
            SchedulingError::TokenInvalid => (StatusCode::BAD_REQUEST, "token_invalid"),
            SchedulingError::InvalidRequest { .. } => (StatusCode::BAD_REQUEST, "invalid_request"),
            SchedulingError::Storage { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
        };

        let message = err.to_string();
        let conflicts = match err {
            SchedulingError::ConflictDetected { conflicts } => Some(conflicts),
            _ => None,
        };

        Self {
            status,
            error: error.to_string(),
            message: Some(message),
            conflicts,
        }
    }
}

impl IntoResponse for ApiErrorType {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (SchedulingError::AlreadyScanned, StatusCode::CONFLICT),
            (SchedulingError::TokenInvalid, StatusCode::BAD_REQUEST),
            (SchedulingError::WindowClosed { course_id: 1 }, StatusCode::GONE),
            (SchedulingError::ChildEditForbidden { course_id: 1 }, StatusCode::FORBIDDEN),
            (SchedulingError::RecurrenceWindowInvalid, StatusCode::UNPROCESSABLE_ENTITY),
            (
                SchedulingError::Storage { message: "disk".to_string() },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiErrorType::from(err).status, status);
        }
    }

    #[test]
    fn test_conflicts_are_included_in_body() {
        let body = serde_json::to_value(ApiErrorType::from(SchedulingError::ConflictDetected {
            conflicts: vec![],
        }))
        .unwrap();
        assert_eq!(body["error"], "conflict_detected");
        assert!(body["conflicts"].is_array());

        let body = serde_json::to_value(ApiErrorType::from(SchedulingError::TokenInvalid)).unwrap();
        assert!(body.get("conflicts").is_none());
    }
}
