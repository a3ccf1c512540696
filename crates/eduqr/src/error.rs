//! Error types for the scheduling and attendance core.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::db::Role;
use crate::scheduling::ConflictInfo;

/// The kind of record a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Subject,
    Teacher,
    Student,
    Room,
    Course,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::Subject => "subject",
            Entity::Teacher => "teacher",
            Entity::Student => "student",
            Entity::Room => "room",
            Entity::Course => "course",
        };
        f.write_str(name)
    }
}

/// Errors returned by course scheduling and attendance operations.
///
/// Every variant except `Storage` is an expected business outcome that the
/// caller can report back to the user.
#[derive(Debug, Error, Clone)]
pub enum SchedulingError {
    /// A referenced record does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: i64 },

    /// The referenced user exists but lacks the required role
    #[error("user {user_id} does not have the {expected} role")]
    InvalidRole { user_id: i64, expected: Role },

    /// The requested slot overlaps existing bookings in the room's contention group
    #[error("booking overlaps {} existing course(s)", .conflicts.len())]
    ConflictDetected { conflicts: Vec<ConflictInfo> },

    /// Recurrence end date does not fall after the course start
    #[error("recurrence end date must be after the course start date")]
    RecurrenceWindowInvalid,

    /// Occurrences of a series are only editable through their parent
    #[error("course {course_id} is an occurrence of a recurring series; edit the series parent instead")]
    ChildEditForbidden { course_id: i64 },

    /// The student already has a scanned attendance record for this course
    #[error("attendance already recorded for this course")]
    AlreadyScanned,

    /// Token requested or used outside the course's attendance window
    #[error("attendance window is closed for course {course_id}")]
    WindowClosed { course_id: i64 },

    /// Token could not be decoded or references a missing course
    #[error("attendance token is invalid")]
    TokenInvalid,

    /// Request failed boundary validation
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// Underlying storage failure
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl SchedulingError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        SchedulingError::InvalidRequest {
            message: message.into(),
        }
    }

    /// Returns true if the request cannot be completed because storage failed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SchedulingError::Storage { .. })
    }

    /// Returns true if this error reports a room booking conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, SchedulingError::ConflictDetected { .. })
    }
}

impl From<rusqlite::Error> for SchedulingError {
    fn from(err: rusqlite::Error) -> Self {
        SchedulingError::Storage {
            message: err.to_string(),
        }
    }
}
