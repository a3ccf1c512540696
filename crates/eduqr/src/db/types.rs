/// Database types for rooms, courses and attendance records
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::scheduling::RecurrencePattern;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Teacher,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "super_admin" => Some(Role::SuperAdmin),
            "admin" => Some(Role::Admin),
            "teacher" | "professeur" => Some(Role::Teacher),
            "student" | "etudiant" => Some(Role::Student),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for Role {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Role {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        Role::parse(raw).ok_or_else(|| FromSqlError::Other(format!("unknown role `{raw}`").into()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

/// A bookable room.
///
/// Rooms form at most two levels: a modular parent (`is_modular`, no parent)
/// with sub-rooms pointing at it through `parent_id`, or a standalone room.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Room {
    pub id: i64,
    pub name: String,
    pub building: Option<String>,
    pub floor: Option<String>,
    pub is_modular: bool,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct NewRoom {
    pub name: String,
    pub building: Option<String>,
    pub floor: Option<String>,
    pub is_modular: bool,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub subject_id: i64,
    pub teacher_id: i64,
    pub room_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Minutes, always `end_time - start_time`
    pub duration: i64,
    pub is_recurring: bool,
    /// Parent of the series; `None` on the parent and on standalone courses
    pub recurrence_id: Option<i64>,
    pub recurrence_pattern: Option<RecurrencePattern>,
    /// Exclusive upper bound of the expansion
    pub recurrence_end_date: Option<NaiveDate>,
    /// Stored and returned, never consulted by the expansion
    pub exclude_holidays: bool,
}

impl Course {
    /// True for the parent row of a recurring series.
    pub fn is_series_parent(&self) -> bool {
        self.is_recurring && self.recurrence_id.is_none()
    }

    /// The parent id of the series this course belongs to, if any.
    pub fn series_id(&self) -> Option<i64> {
        match self.recurrence_id {
            Some(parent) => Some(parent),
            None if self.is_recurring => Some(self.id),
            None => None,
        }
    }
}

/// An existing course together with the name of the room it occupies.
#[derive(Debug, Clone)]
pub struct RoomBooking {
    pub course: Course,
    pub room_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    Present,
    Late,
    Absent,
}

impl PresenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceStatus::Present => "present",
            PresenceStatus::Late => "late",
            PresenceStatus::Absent => "absent",
        }
    }
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for PresenceStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for PresenceStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "present" => Ok(PresenceStatus::Present),
            "late" => Ok(PresenceStatus::Late),
            "absent" => Ok(PresenceStatus::Absent),
            other => Err(FromSqlError::Other(format!("unknown status `{other}`").into())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Presence {
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,
    pub status: PresenceStatus,
    /// `None` until the student scans
    pub scanned_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub id: i64,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<i64>,
    pub description: String,
}
