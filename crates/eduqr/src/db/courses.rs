//! Course rows and the range queries used by conflict detection.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::types::{Course, RoomBooking};
use super::{from_millis, to_millis};

const COURSE_COLUMNS: &str = "c.id, c.name, c.description, c.subject_id, c.teacher_id, c.room_id,
     c.start_ms, c.end_ms, c.duration_minutes, c.is_recurring, c.recurrence_id,
     c.recurrence_pattern, c.recurrence_end_date, c.exclude_holidays";

fn course_from_row(row: &Row<'_>) -> rusqlite::Result<Course> {
    Ok(Course {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        subject_id: row.get(3)?,
        teacher_id: row.get(4)?,
        room_id: row.get(5)?,
        start_time: from_millis(6, row.get(6)?)?,
        end_time: from_millis(7, row.get(7)?)?,
        duration: row.get(8)?,
        is_recurring: row.get(9)?,
        recurrence_id: row.get(10)?,
        recurrence_pattern: row.get(11)?,
        recurrence_end_date: row.get(12)?,
        exclude_holidays: row.get(13)?,
    })
}

fn query_courses<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> rusqlite::Result<Vec<Course>> {
    let mut stmt = conn.prepare(sql)?;
    let courses = stmt.query_map(params, course_from_row)?;
    courses.collect()
}

/// Inserts `course` and returns the new id. `course.id` is ignored.
pub fn insert(conn: &Connection, course: &Course) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO courses (
            name, description, subject_id, teacher_id, room_id,
            start_ms, end_ms, duration_minutes, is_recurring, recurrence_id,
            recurrence_pattern, recurrence_end_date, exclude_holidays,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, datetime('now'), datetime('now'))",
        params![
            course.name,
            course.description,
            course.subject_id,
            course.teacher_id,
            course.room_id,
            to_millis(course.start_time),
            to_millis(course.end_time),
            course.duration,
            course.is_recurring,
            course.recurrence_id,
            course.recurrence_pattern,
            course.recurrence_end_date,
            course.exclude_holidays,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Overwrites every column of the row identified by `course.id`
pub fn update(conn: &Connection, course: &Course) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE courses SET
            name = ?2, description = ?3, subject_id = ?4, teacher_id = ?5, room_id = ?6,
            start_ms = ?7, end_ms = ?8, duration_minutes = ?9, is_recurring = ?10,
            recurrence_id = ?11, recurrence_pattern = ?12, recurrence_end_date = ?13,
            exclude_holidays = ?14, updated_at = datetime('now')
         WHERE id = ?1",
        params![
            course.id,
            course.name,
            course.description,
            course.subject_id,
            course.teacher_id,
            course.room_id,
            to_millis(course.start_time),
            to_millis(course.end_time),
            course.duration,
            course.is_recurring,
            course.recurrence_id,
            course.recurrence_pattern,
            course.recurrence_end_date,
            course.exclude_holidays,
        ],
    )
}

pub fn find(conn: &Connection, id: i64) -> rusqlite::Result<Option<Course>> {
    conn.query_row(
        &format!("SELECT {COURSE_COLUMNS} FROM courses c WHERE c.id = ?"),
        [id],
        course_from_row,
    )
    .optional()
}

/// Deletes a single row
pub fn delete(conn: &Connection, id: i64) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM courses WHERE id = ?", [id])
}

/// Deletes a series parent and every row pointing at it through `recurrence_id`
pub fn delete_series(conn: &Connection, parent_id: i64) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM courses WHERE recurrence_id = ?1 OR id = ?1",
        [parent_id],
    )
}

/// The parent and all occurrences of a series, in start order
pub fn series(conn: &Connection, parent_id: i64) -> rusqlite::Result<Vec<Course>> {
    query_courses(
        conn,
        &format!(
            "SELECT {COURSE_COLUMNS} FROM courses c
             WHERE c.id = ?1 OR c.recurrence_id = ?1
             ORDER BY c.start_ms, c.id"
        ),
        [parent_id],
    )
}

pub fn series_ids(conn: &Connection, parent_id: i64) -> rusqlite::Result<Vec<i64>> {
    let mut stmt =
        conn.prepare("SELECT id FROM courses WHERE id = ?1 OR recurrence_id = ?1 ORDER BY id")?;
    let ids = stmt.query_map([parent_id], |row| row.get(0))?;
    ids.collect()
}

/// Courses in `room_id` whose interval overlaps `[start, end)`.
///
/// Two intervals overlap when each starts before the other ends, so a booking
/// ending exactly when the candidate starts is not returned.
pub fn overlapping_in_room(
    conn: &Connection,
    room_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> rusqlite::Result<Vec<RoomBooking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COURSE_COLUMNS}, r.name
         FROM courses c
         JOIN rooms r ON r.id = c.room_id
         WHERE c.room_id = ?1 AND c.start_ms < ?3 AND ?2 < c.end_ms
         ORDER BY c.start_ms"
    ))?;
    let bookings = stmt.query_map(params![room_id, to_millis(start), to_millis(end)], |row| {
        Ok(RoomBooking {
            course: course_from_row(row)?,
            room_name: row.get(14)?,
        })
    })?;
    bookings.collect()
}

/// Courses starting within `[start, end]`
pub fn starting_between(
    conn: &Connection,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> rusqlite::Result<Vec<Course>> {
    query_courses(
        conn,
        &format!(
            "SELECT {COURSE_COLUMNS} FROM courses c
             WHERE c.start_ms >= ?1 AND c.start_ms <= ?2
             ORDER BY c.start_ms"
        ),
        params![to_millis(start), to_millis(end)],
    )
}

pub fn by_room(conn: &Connection, room_id: i64) -> rusqlite::Result<Vec<Course>> {
    query_courses(
        conn,
        &format!("SELECT {COURSE_COLUMNS} FROM courses c WHERE c.room_id = ? ORDER BY c.start_ms"),
        [room_id],
    )
}

pub fn by_teacher(conn: &Connection, teacher_id: i64) -> rusqlite::Result<Vec<Course>> {
    query_courses(
        conn,
        &format!(
            "SELECT {COURSE_COLUMNS} FROM courses c WHERE c.teacher_id = ? ORDER BY c.start_ms"
        ),
        [teacher_id],
    )
}
