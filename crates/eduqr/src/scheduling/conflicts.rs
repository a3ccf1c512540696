//! Booking conflict detection across a room's contention group.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::rooms::contention_group;
use crate::db::{courses, Course};
use crate::error::SchedulingError;

/// An existing booking that overlaps a candidate slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictInfo {
    pub course_id: i64,
    pub date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub room_id: i64,
    pub room_name: String,
    pub course_name: String,
}

/// A slot someone wants to book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub room_id: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Candidate {
    pub fn new(room_id: i64, start: DateTime<Utc>, duration_minutes: i64) -> Self {
        Self {
            room_id,
            start,
            end: start + Duration::minutes(duration_minutes),
        }
    }

    pub fn for_course(course: &Course) -> Self {
        Self {
            room_id: course.room_id,
            start: course.start_time,
            end: course.end_time,
        }
    }
}

/// Half-open interval overlap: `[a_start, a_end)` and `[b_start, b_end)`
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Lists every course overlapping `candidate` in any room of its contention
/// group, skipping courses whose id is in `exclude`.
///
/// The result is unordered. An empty list means the slot is free.
pub fn check_conflicts(
    conn: &Connection,
    candidate: &Candidate,
    exclude: &HashSet<i64>,
) -> Result<Vec<ConflictInfo>, SchedulingError> {
    let mut conflicts = Vec::new();

    for room in contention_group(conn, candidate.room_id)? {
        for booking in courses::overlapping_in_room(conn, room.id, candidate.start, candidate.end)? {
            if exclude.contains(&booking.course.id) {
                continue;
            }
            let course = booking.course;
            conflicts.push(ConflictInfo {
                course_id: course.id,
                date: course.start_time.date_naive(),
                start_time: course.start_time,
                end_time: course.end_time,
                room_id: course.room_id,
                room_name: booking.room_name,
                course_name: course.name,
            });
        }
    }

    Ok(conflicts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::{at, campus, Campus};
    use crate::db::ScheduleDb;

    fn book(db: &ScheduleDb, c: &Campus, room_id: i64, start: DateTime<Utc>, minutes: i64) -> i64 {
        let course = Course {
            id: 0,
            name: format!("Course in {room_id}"),
            description: String::new(),
            subject_id: c.subject,
            teacher_id: c.teacher,
            room_id,
            start_time: start,
            end_time: start + Duration::minutes(minutes),
            duration: minutes,
            is_recurring: false,
            recurrence_id: None,
            recurrence_pattern: None,
            recurrence_end_date: None,
            exclude_holidays: true,
        };
        db.read(|conn| courses::insert(conn, &course)).unwrap()
    }

    fn check(db: &ScheduleDb, candidate: Candidate, exclude: &[i64]) -> Vec<ConflictInfo> {
        let exclude: HashSet<i64> = exclude.iter().copied().collect();
        db.read(|conn| check_conflicts(conn, &candidate, &exclude)).unwrap()
    }

    #[test]
    fn test_overlap_is_half_open() {
        let nine = at(2024, 9, 2, 9, 0);
        let ten = at(2024, 9, 2, 10, 0);
        let eleven = at(2024, 9, 2, 11, 0);
        assert!(!overlaps(nine, ten, ten, eleven));
        assert!(overlaps(nine, eleven, ten, eleven));
        assert!(overlaps(ten, eleven, nine, eleven));
    }

    #[test]
    fn test_overlapping_slot_in_same_room_conflicts() {
        let db = ScheduleDb::open_in_memory().unwrap();
        let c = campus(&db);
        let existing = book(&db, &c, c.standalone, at(2024, 9, 2, 9, 0), 60);

        let conflicts = check(&db, Candidate::new(c.standalone, at(2024, 9, 2, 9, 30), 60), &[]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].course_id, existing);
        assert_eq!(conflicts[0].room_name, "B12");
        assert_eq!(conflicts[0].date, at(2024, 9, 2, 0, 0).date_naive());
    }

    #[test]
    fn test_adjacent_slots_do_not_conflict() {
        let db = ScheduleDb::open_in_memory().unwrap();
        let c = campus(&db);
        book(&db, &c, c.standalone, at(2024, 9, 2, 9, 0), 60);

        assert!(check(&db, Candidate::new(c.standalone, at(2024, 9, 2, 10, 0), 60), &[]).is_empty());
        assert!(check(&db, Candidate::new(c.standalone, at(2024, 9, 2, 8, 0), 60), &[]).is_empty());
    }

    #[test]
    fn test_parent_booking_blocks_sub_rooms_and_vice_versa() {
        let db = ScheduleDb::open_in_memory().unwrap();
        let c = campus(&db);
        book(&db, &c, c.hall_a, at(2024, 9, 2, 9, 0), 60);

        let on_parent = check(&db, Candidate::new(c.hall, at(2024, 9, 2, 9, 15), 30), &[]);
        assert_eq!(on_parent.len(), 1);
        assert_eq!(on_parent[0].room_name, "Amphi A");

        // Siblings do not contend with each other
        assert!(check(&db, Candidate::new(c.hall_b, at(2024, 9, 2, 9, 15), 30), &[]).is_empty());

        book(&db, &c, c.hall, at(2024, 9, 3, 14, 0), 120);
        let on_child = check(&db, Candidate::new(c.hall_b, at(2024, 9, 3, 15, 0), 30), &[]);
        assert_eq!(on_child.len(), 1);
        assert_eq!(on_child[0].room_name, "Amphi");
    }

    #[test]
    fn test_excluded_courses_are_ignored() {
        let db = ScheduleDb::open_in_memory().unwrap();
        let c = campus(&db);
        let first = book(&db, &c, c.standalone, at(2024, 9, 2, 9, 0), 60);
        let second = book(&db, &c, c.standalone, at(2024, 9, 2, 9, 30), 60);

        let candidate = Candidate::new(c.standalone, at(2024, 9, 2, 9, 0), 90);
        assert_eq!(check(&db, candidate, &[]).len(), 2);
        let remaining = check(&db, candidate, &[first]);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].course_id, second);
        assert!(check(&db, candidate, &[first, second]).is_empty());
    }

    #[test]
    fn test_unrelated_rooms_never_conflict() {
        let db = ScheduleDb::open_in_memory().unwrap();
        let c = campus(&db);
        book(&db, &c, c.hall, at(2024, 9, 2, 9, 0), 60);
        assert!(check(&db, Candidate::new(c.standalone, at(2024, 9, 2, 9, 0), 60), &[]).is_empty());
    }
}
