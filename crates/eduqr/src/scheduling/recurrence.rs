//! Expansion of a recurring parent course into dated occurrences.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

use super::conflicts::{check_conflicts, Candidate, ConflictInfo};
use super::pattern::RecurrencePattern;
use crate::db::{courses, Course};
use crate::error::SchedulingError;

/// A date the expander left out because the slot was already taken.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedOccurrence {
    pub date: NaiveDate,
    pub conflicts: Vec<ConflictInfo>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExpansionOutcome {
    /// Occurrences persisted, in date order
    pub created: Vec<Course>,
    pub skipped: Vec<SkippedOccurrence>,
}

impl ExpansionOutcome {
    pub fn created_count(&self) -> usize {
        self.created.len()
    }
}

/// Start instants of the occurrences a parent starting at `parent_start`
/// generates, excluding the parent's own date.
///
/// Walks the calendar one day at a time from the parent's date while the date
/// is strictly before `end_exclusive`, so `end_exclusive` itself never gets an
/// occurrence. Each occurrence keeps the parent's time of day (UTC).
pub fn occurrence_starts(
    parent_start: DateTime<Utc>,
    pattern: RecurrencePattern,
    end_exclusive: NaiveDate,
) -> Vec<DateTime<Utc>> {
    let first = parent_start.date_naive();
    let time_of_day = parent_start.time();

    first
        .iter_days()
        .take_while(|date| *date < end_exclusive)
        .filter(|date| *date != first && pattern.contains(date.weekday()))
        .map(|date| date.and_time(time_of_day).and_utc())
        .collect()
}

/// Creates the occurrences of `parent`, which must already be persisted.
///
/// The parent row is the series' occurrence on its own date. Every other
/// matching date is conflict-checked and inserted with `recurrence_id` set to
/// the parent's id; dates that conflict are skipped without failing the
/// expansion. Storage errors abort and are returned to the caller, which owns
/// cleaning up the parent.
pub fn expand(
    conn: &Connection,
    parent: &Course,
    pattern: RecurrencePattern,
    end_exclusive: NaiveDate,
) -> Result<ExpansionOutcome, SchedulingError> {
    let mut outcome = ExpansionOutcome::default();
    let no_exclusions = HashSet::new();

    for start in occurrence_starts(parent.start_time, pattern, end_exclusive) {
        let mut occurrence = Course {
            id: 0,
            recurrence_id: Some(parent.id),
            start_time: start,
            end_time: start + (parent.end_time - parent.start_time),
            ..parent.clone()
        };

        let conflicts = check_conflicts(conn, &Candidate::for_course(&occurrence), &no_exclusions)?;
        if !conflicts.is_empty() {
            debug!(
                parent_id = parent.id,
                date = %start.date_naive(),
                conflicts = conflicts.len(),
                "Skipping occurrence that overlaps existing bookings"
            );
            outcome.skipped.push(SkippedOccurrence {
                date: start.date_naive(),
                conflicts,
            });
            continue;
        }

        occurrence.id = courses::insert(conn, &occurrence)?;
        outcome.created.push(occurrence);
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::{at, campus};
    use crate::db::ScheduleDb;
    use chrono::{Duration, Weekday};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_end_date_is_exclusive() {
        // 2024-09-02 is a Monday
        let starts = occurrence_starts(
            at(2024, 9, 2, 8, 30),
            RecurrencePattern::from_days([Weekday::Mon]),
            date(2024, 9, 16),
        );
        assert_eq!(starts, vec![at(2024, 9, 9, 8, 30)]);
    }

    #[test]
    fn test_multiple_weekdays_keep_time_of_day() {
        let starts = occurrence_starts(
            at(2024, 9, 2, 14, 0),
            RecurrencePattern::from_days([Weekday::Mon, Weekday::Wed, Weekday::Fri]),
            date(2024, 9, 9),
        );
        assert_eq!(
            starts,
            vec![at(2024, 9, 4, 14, 0), at(2024, 9, 6, 14, 0)]
        );
    }

    #[test]
    fn test_parent_on_unmatched_weekday_still_generates_pattern_days() {
        // Parent on a Sunday, series on Tuesdays
        let starts = occurrence_starts(
            at(2024, 9, 1, 10, 0),
            RecurrencePattern::from_days([Weekday::Tue]),
            date(2024, 9, 11),
        );
        assert_eq!(starts, vec![at(2024, 9, 3, 10, 0), at(2024, 9, 10, 10, 0)]);
    }

    fn parent_course(c: &crate::db::fixtures::Campus, room_id: i64) -> Course {
        let start = at(2024, 9, 2, 8, 30);
        Course {
            id: 0,
            name: "Physics".to_string(),
            description: String::new(),
            subject_id: c.subject,
            teacher_id: c.teacher,
            room_id,
            start_time: start,
            end_time: start + Duration::minutes(90),
            duration: 90,
            is_recurring: true,
            recurrence_id: None,
            recurrence_pattern: Some(RecurrencePattern::from_days([Weekday::Mon])),
            recurrence_end_date: Some(date(2024, 9, 30)),
            exclude_holidays: true,
        }
    }

    #[test]
    fn test_expand_persists_linked_occurrences() {
        let db = ScheduleDb::open_in_memory().unwrap();
        let c = campus(&db);

        let outcome = db
            .transaction(|tx| -> Result<_, SchedulingError> {
                let mut parent = parent_course(&c, c.standalone);
                parent.id = courses::insert(tx, &parent)?;
                expand(
                    tx,
                    &parent,
                    RecurrencePattern::from_days([Weekday::Mon]),
                    date(2024, 9, 30),
                )
            })
            .unwrap();

        assert_eq!(outcome.created_count(), 3);
        assert!(outcome.skipped.is_empty());
        let parent_id = outcome.created[0].recurrence_id.unwrap();
        let series = db.read(|conn| courses::series(conn, parent_id)).unwrap();
        let dates: Vec<_> = series.iter().map(|s| s.start_time.date_naive()).collect();
        assert_eq!(
            dates,
            vec![date(2024, 9, 2), date(2024, 9, 9), date(2024, 9, 16), date(2024, 9, 23)]
        );
        assert!(series[1..].iter().all(|o| o.end_time - o.start_time == Duration::minutes(90)));
    }

    #[test]
    fn test_expand_skips_conflicting_dates() {
        let db = ScheduleDb::open_in_memory().unwrap();
        let c = campus(&db);

        // Sub-room booked on the second Monday blocks the parent hall
        let blocker = Course {
            name: "Exam".to_string(),
            is_recurring: false,
            recurrence_pattern: None,
            recurrence_end_date: None,
            start_time: at(2024, 9, 9, 9, 0),
            end_time: at(2024, 9, 9, 11, 0),
            duration: 120,
            ..parent_course(&c, c.hall_b)
        };
        db.read(|conn| courses::insert(conn, &blocker)).unwrap();

        let outcome = db
            .transaction(|tx| -> Result<_, SchedulingError> {
                let mut parent = parent_course(&c, c.hall);
                parent.id = courses::insert(tx, &parent)?;
                expand(
                    tx,
                    &parent,
                    RecurrencePattern::from_days([Weekday::Mon]),
                    date(2024, 9, 30),
                )
            })
            .unwrap();

        assert_eq!(outcome.created_count(), 2);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].date, date(2024, 9, 9));
        assert_eq!(outcome.skipped[0].conflicts[0].course_name, "Exam");
    }
}
