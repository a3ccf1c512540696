//! Room contention, conflict detection, recurrence expansion and the course
//! lifecycle built on top of them.
mod conflicts;
mod manager;
mod pattern;
mod recurrence;
mod rooms;
mod types;

pub use conflicts::{check_conflicts, overlaps, Candidate, ConflictInfo};
pub use manager::CourseScheduler;
pub use pattern::{day_name, RecurrencePattern};
pub use recurrence::{expand, occurrence_starts, ExpansionOutcome, SkippedOccurrence};
pub use rooms::contention_group;
pub use types::{
    validate_duration, CoursePatch, CourseRequest, RecurrencePlan, ScheduledCourse,
    MAX_DURATION_MINUTES, MIN_DURATION_MINUTES,
};
