//! QR attendance: token issuing, token validation and scan recording.

mod token;
mod window;

pub use token::{fingerprint, AttendanceToken};
pub use window::AttendanceWindow;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::audit::{AuditAction, AuditEvent, AuditSink};
use crate::db::{catalog, courses, presences, Course, Presence, Role, ScheduleDb};
use crate::error::{Entity, SchedulingError};

/// A freshly generated token and the period it is accepted in.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub course_id: i64,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenValidation {
    pub course_id: i64,
    pub course_name: String,
    pub room_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_valid: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresenceStats {
    pub course_id: i64,
    pub present: i64,
    pub late: i64,
    pub absent: i64,
    pub total_students: i64,
    /// `(present + late) / total_students * 100`, 0 without students
    pub attendance_rate: f64,
}

pub struct AttendanceService {
    db: Arc<ScheduleDb>,
    window: AttendanceWindow,
    audit: AuditSink,
}

impl AttendanceService {
    pub fn new(db: Arc<ScheduleDb>, window: AttendanceWindow, audit: AuditSink) -> Self {
        Self { db, window, audit }
    }

    /// Issues a token for `course_id`, allowed from shortly before the course
    /// starts until it ends.
    pub fn generate_token(
        &self,
        course_id: i64,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, SchedulingError> {
        let course = self.db.read(|conn| find_course(conn, course_id))?;
        if !self.window.can_issue(&course, now) {
            return Err(SchedulingError::WindowClosed { course_id });
        }

        let token = AttendanceToken::issue(course_id, now).encode()?;
        debug!(course_id, token = %fingerprint(&token), "Attendance token issued");

        Ok(IssuedToken {
            token,
            course_id,
            valid_from: course.start_time,
            valid_until: course.end_time,
        })
    }

    /// Decodes `raw` and reports whether the course accepts scans at `now`.
    pub fn validate_token(
        &self,
        raw: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenValidation, SchedulingError> {
        let token = AttendanceToken::decode(raw)?;
        self.db.read(|conn| {
            let course = courses::find(conn, token.course_id)?.ok_or(SchedulingError::TokenInvalid)?;
            let room_name = catalog::find_room(conn, course.room_id)?
                .map(|room| room.name)
                .unwrap_or_default();
            Ok(TokenValidation {
                course_id: course.id,
                is_valid: self.window.is_open(&course, now),
                course_name: course.name,
                room_name,
                start_time: course.start_time,
                end_time: course.end_time,
            })
        })
    }

    /// Records a scan of `raw` by `student_id` at `now`.
    ///
    /// The status depends only on how long after the course start the scan
    /// happens. A student gets exactly one successful scan per course; a roll
    /// call row that was never scanned still accepts one.
    pub fn scan(
        &self,
        raw: &str,
        student_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Presence, SchedulingError> {
        let token = AttendanceToken::decode(raw)?;

        let presence = self.db.transaction(|tx| {
            let course = courses::find(tx, token.course_id)?.ok_or(SchedulingError::TokenInvalid)?;
            if !self.window.is_open(&course, now) {
                return Err(SchedulingError::WindowClosed {
                    course_id: course.id,
                });
            }
            validate_student(tx, student_id)?;

            let status = self.window.classify(course.start_time, now);
            presences::record_scan(tx, student_id, course.id, status, now)?
                .ok_or(SchedulingError::AlreadyScanned)
        })?;

        info!(
            course_id = presence.course_id,
            student_id,
            status = presence.status.as_str(),
            token = %fingerprint(raw),
            "Attendance scanned"
        );
        self.audit.record(AuditEvent::new(
            AuditAction::Scan,
            presence.id,
            format!(
                "student {student_id} scanned course {} as {}",
                presence.course_id,
                presence.status.as_str()
            ),
        ));

        Ok(presence)
    }

    /// Creates an unscanned `absent` row for every student that has none yet
    /// for `course_id`. Returns how many rows were created.
    pub fn open_roll_call(&self, course_id: i64) -> Result<usize, SchedulingError> {
        let created = self.db.transaction(|tx| {
            find_course(tx, course_id)?;
            let mut created = 0;
            for student_id in catalog::user_ids_with_role(tx, Role::Student)? {
                if presences::insert_unscanned(tx, student_id, course_id)? {
                    created += 1;
                }
            }
            Ok::<_, SchedulingError>(created)
        })?;

        info!(course_id, created, "Roll call opened");
        Ok(created)
    }

    pub fn presence_stats(&self, course_id: i64) -> Result<PresenceStats, SchedulingError> {
        self.db.read(|conn| {
            find_course(conn, course_id)?;
            let (present, late, absent) = presences::status_counts(conn, course_id)?;
            let total_students = catalog::count_users_with_role(conn, Role::Student)?;
            let attendance_rate = if total_students > 0 {
                (present + late) as f64 / total_students as f64 * 100.0
            } else {
                0.0
            };
            Ok(PresenceStats {
                course_id,
                present,
                late,
                absent,
                total_students,
                attendance_rate,
            })
        })
    }

    pub fn presences_by_course(&self, course_id: i64) -> Result<Vec<Presence>, SchedulingError> {
        self.db.read(|conn| {
            find_course(conn, course_id)?;
            Ok(presences::by_course(conn, course_id)?)
        })
    }

    pub fn presences_by_student(&self, student_id: i64) -> Result<Vec<Presence>, SchedulingError> {
        self.db.read(|conn| {
            validate_student(conn, student_id)?;
            Ok(presences::by_student(conn, student_id)?)
        })
    }
}

fn find_course(conn: &Connection, course_id: i64) -> Result<Course, SchedulingError> {
    courses::find(conn, course_id)?.ok_or(SchedulingError::NotFound {
        entity: Entity::Course,
        id: course_id,
    })
}

fn validate_student(conn: &Connection, student_id: i64) -> Result<(), SchedulingError> {
    let user = catalog::find_user(conn, student_id)?.ok_or(SchedulingError::NotFound {
        entity: Entity::Student,
        id: student_id,
    })?;
    if user.role != Role::Student {
        return Err(SchedulingError::InvalidRole {
            user_id: student_id,
            expected: Role::Student,
        });
    }
    Ok(())
}
