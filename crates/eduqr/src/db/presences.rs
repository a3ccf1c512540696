//! Attendance rows, one per (student, course).

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::types::{Presence, PresenceStatus};

const PRESENCE_COLUMNS: &str = "id, student_id, course_id, status, scanned_at";

fn presence_from_row(row: &Row<'_>) -> rusqlite::Result<Presence> {
    Ok(Presence {
        id: row.get(0)?,
        student_id: row.get(1)?,
        course_id: row.get(2)?,
        status: row.get(3)?,
        scanned_at: row.get(4)?,
    })
}

pub fn find(
    conn: &Connection,
    student_id: i64,
    course_id: i64,
) -> rusqlite::Result<Option<Presence>> {
    conn.query_row(
        &format!("SELECT {PRESENCE_COLUMNS} FROM presences WHERE student_id = ?1 AND course_id = ?2"),
        [student_id, course_id],
        presence_from_row,
    )
    .optional()
}

/// Records a scan for (student, course).
///
/// Inserts the row, or fills in an existing row that has never been scanned.
/// A row whose `scanned_at` is already set is left untouched and `None` is
/// returned, which makes this the single guard against double scans.
pub fn record_scan(
    conn: &Connection,
    student_id: i64,
    course_id: i64,
    status: PresenceStatus,
    scanned_at: DateTime<Utc>,
) -> rusqlite::Result<Option<Presence>> {
    conn.query_row(
        &format!(
            "INSERT INTO presences (student_id, course_id, status, scanned_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, datetime('now'), datetime('now'))
             ON CONFLICT (student_id, course_id) DO UPDATE SET
                status = excluded.status,
                scanned_at = excluded.scanned_at,
                updated_at = excluded.updated_at
             WHERE presences.scanned_at IS NULL
             RETURNING {PRESENCE_COLUMNS}"
        ),
        params![student_id, course_id, status, scanned_at],
        presence_from_row,
    )
    .optional()
}

/// Creates an unscanned `absent` row unless one already exists.
/// Returns true if a row was created.
pub fn insert_unscanned(conn: &Connection, student_id: i64, course_id: i64) -> rusqlite::Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO presences (student_id, course_id, status, scanned_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, NULL, datetime('now'), datetime('now'))",
        params![student_id, course_id, PresenceStatus::Absent],
    )?;
    Ok(inserted > 0)
}

pub fn by_course(conn: &Connection, course_id: i64) -> rusqlite::Result<Vec<Presence>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PRESENCE_COLUMNS} FROM presences WHERE course_id = ? ORDER BY student_id"
    ))?;
    let rows = stmt.query_map([course_id], presence_from_row)?;
    rows.collect()
}

pub fn by_student(conn: &Connection, student_id: i64) -> rusqlite::Result<Vec<Presence>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PRESENCE_COLUMNS} FROM presences WHERE student_id = ? ORDER BY course_id"
    ))?;
    let rows = stmt.query_map([student_id], presence_from_row)?;
    rows.collect()
}

/// Number of rows for `course_id` in each status: (present, late, absent)
pub fn status_counts(conn: &Connection, course_id: i64) -> rusqlite::Result<(i64, i64, i64)> {
    conn.query_row(
        "SELECT
            COALESCE(SUM(status = 'present'), 0),
            COALESCE(SUM(status = 'late'), 0),
            COALESCE(SUM(status = 'absent'), 0)
         FROM presences WHERE course_id = ?",
        [course_id],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )
}
