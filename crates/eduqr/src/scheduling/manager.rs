//! Course lifecycle: create, update, delete, with series cascade rules.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use super::conflicts::{check_conflicts, Candidate, ConflictInfo};
use super::recurrence::{expand, occurrence_starts};
use super::types::{validate_duration, CoursePatch, CourseRequest, RecurrencePlan, ScheduledCourse};
use crate::audit::{AuditAction, AuditEvent, AuditSink};
use crate::db::{catalog, courses, Course, Role, ScheduleDb};
use crate::error::{Entity, SchedulingError};

/// Orchestrates course creation, updates and deletion.
///
/// Each write runs in a single storage transaction, so conflict checks and
/// the inserts they guard cannot interleave with another booking.
pub struct CourseScheduler {
    db: Arc<ScheduleDb>,
    audit: AuditSink,
}

impl CourseScheduler {
    pub fn new(db: Arc<ScheduleDb>, audit: AuditSink) -> Self {
        Self { db, audit }
    }

    /// Creates a one-off course, or a recurring parent and its occurrences.
    pub fn create_course(&self, req: &CourseRequest) -> Result<ScheduledCourse, SchedulingError> {
        validate_duration(req.duration)?;
        let draft = req.to_course();

        let scheduled = self.db.transaction(|tx| {
            validate_references(tx, draft.subject_id, draft.teacher_id, draft.room_id)?;
            let plan = RecurrencePlan::for_course(&draft)?;
            persist_new(tx, draft.clone(), plan)
        })?;

        info!(
            course_id = scheduled.course.id,
            room_id = scheduled.course.room_id,
            occurrences = scheduled.expansion.as_ref().map(|e| e.created_count()),
            "Course created"
        );
        self.audit.record(AuditEvent::new(
            AuditAction::Create,
            scheduled.course.id,
            format!("created course '{}'", scheduled.course.name),
        ));

        Ok(scheduled)
    }

    /// Applies `patch` to course `id`.
    ///
    /// A standalone course is updated in place. A recurring parent (or a
    /// standalone course being made recurring) is replaced: the whole series
    /// is deleted and a new parent is created and expanded from the merged
    /// fields, so the returned course has a new id. Occurrences of a series
    /// cannot be edited.
    pub fn update_course(
        &self,
        id: i64,
        patch: &CoursePatch,
    ) -> Result<ScheduledCourse, SchedulingError> {
        if let Some(duration) = patch.duration {
            validate_duration(duration)?;
        }

        let (scheduled, replaced) = self.db.transaction(|tx| {
            let existing = find_course(tx, id)?;
            if existing.recurrence_id.is_some() {
                return Err(SchedulingError::ChildEditForbidden { course_id: id });
            }

            validate_patch_references(tx, patch)?;
            let merged = patch.apply(&existing);

            if existing.is_recurring || merged.is_recurring {
                let plan = RecurrencePlan::for_course(&merged)?;
                let removed = courses::delete_series(tx, existing.id)?;
                let scheduled = persist_new(tx, Course { id: 0, ..merged }, plan)?;
                return Ok((scheduled, Some(removed)));
            }

            let exclude = HashSet::from([existing.id]);
            let conflicts = check_conflicts(tx, &Candidate::for_course(&merged), &exclude)?;
            if !conflicts.is_empty() {
                return Err(SchedulingError::ConflictDetected { conflicts });
            }
            courses::update(tx, &merged)?;
            Ok((
                ScheduledCourse {
                    course: merged,
                    expansion: None,
                },
                None,
            ))
        })?;

        match replaced {
            Some(removed) => info!(
                old_id = id,
                new_id = scheduled.course.id,
                removed,
                "Recurring series replaced"
            ),
            None => info!(course_id = id, "Course updated"),
        }
        self.audit.record(AuditEvent::new(
            AuditAction::Update,
            scheduled.course.id,
            format!("updated course {id} ('{}')", scheduled.course.name),
        ));

        Ok(scheduled)
    }

    /// Deletes a course. Deleting a series parent deletes the whole series.
    /// Returns the number of rows removed.
    pub fn delete_course(&self, id: i64) -> Result<usize, SchedulingError> {
        let removed = self.db.transaction(|tx| {
            let course = find_course(tx, id)?;
            let removed = if course.is_series_parent() {
                courses::delete_series(tx, id)?
            } else {
                courses::delete(tx, id)?
            };
            Ok::<_, SchedulingError>(removed)
        })?;

        info!(course_id = id, removed, "Course deleted");
        self.audit.record(AuditEvent::new(
            AuditAction::Delete,
            id,
            format!("deleted course {id} ({removed} row(s))"),
        ));

        Ok(removed)
    }

    /// Bookings overlapping `candidate` in its room's contention group.
    pub fn check_conflicts(
        &self,
        candidate: &Candidate,
        exclude: &HashSet<i64>,
    ) -> Result<Vec<ConflictInfo>, SchedulingError> {
        self.db.read(|conn| check_conflicts(conn, candidate, exclude))
    }

    /// Previews the conflicts a create request would run into.
    ///
    /// For a recurring request every slot of the would-be series is checked,
    /// including the parent's own.
    pub fn check_conflicts_for_request(
        &self,
        req: &CourseRequest,
    ) -> Result<Vec<ConflictInfo>, SchedulingError> {
        validate_duration(req.duration)?;
        let draft = req.to_course();
        let plan = RecurrencePlan::for_course(&draft)?;

        let mut starts = vec![draft.start_time];
        if let Some(plan) = plan {
            starts.extend(occurrence_starts(draft.start_time, plan.pattern, plan.end_date));
        }

        self.db.read(|conn| {
            let mut conflicts = Vec::new();
            for start in starts {
                let candidate = Candidate::new(draft.room_id, start, draft.duration);
                conflicts.extend(check_conflicts(conn, &candidate, &HashSet::new())?);
            }
            Ok(conflicts)
        })
    }

    /// Conflicts the course would have after applying `patch`.
    ///
    /// When the course belongs to a series, every row of that series is
    /// excluded so the series does not conflict with itself.
    pub fn check_conflicts_for_update(
        &self,
        id: i64,
        patch: &CoursePatch,
    ) -> Result<Vec<ConflictInfo>, SchedulingError> {
        if let Some(duration) = patch.duration {
            validate_duration(duration)?;
        }

        self.db.read(|conn| {
            let existing = find_course(conn, id)?;
            let merged = patch.apply(&existing);
            let exclude: HashSet<i64> = match existing.series_id() {
                Some(parent_id) => courses::series_ids(conn, parent_id)?.into_iter().collect(),
                None => HashSet::from([existing.id]),
            };
            check_conflicts(conn, &Candidate::for_course(&merged), &exclude)
        })
    }

    pub fn get_course(&self, id: i64) -> Result<Course, SchedulingError> {
        self.db.read(|conn| find_course(conn, id))
    }

    /// Courses starting within `[start, end]`
    pub fn courses_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Course>, SchedulingError> {
        if end < start {
            return Err(SchedulingError::invalid_request("range end precedes range start"));
        }
        Ok(self.db.read(|conn| courses::starting_between(conn, start, end))?)
    }

    pub fn courses_by_room(&self, room_id: i64) -> Result<Vec<Course>, SchedulingError> {
        Ok(self.db.read(|conn| courses::by_room(conn, room_id))?)
    }

    pub fn courses_by_teacher(&self, teacher_id: i64) -> Result<Vec<Course>, SchedulingError> {
        Ok(self.db.read(|conn| courses::by_teacher(conn, teacher_id))?)
    }

    /// Every row of the series `parent_id` belongs to, parent first
    pub fn series(&self, parent_id: i64) -> Result<Vec<Course>, SchedulingError> {
        self.db.read(|conn| {
            let parent = find_course(conn, parent_id)?;
            if !parent.is_series_parent() {
                return Err(SchedulingError::invalid_request(format!(
                    "course {parent_id} is not the parent of a recurring series"
                )));
            }
            Ok(courses::series(conn, parent_id)?)
        })
    }
}

fn find_course(conn: &Connection, id: i64) -> Result<Course, SchedulingError> {
    courses::find(conn, id)?.ok_or(SchedulingError::NotFound {
        entity: Entity::Course,
        id,
    })
}

/// Conflict-checks and inserts `draft`, then expands it if it is recurring.
///
/// If expansion fails after the parent row was written, the parent is deleted
/// before the error is returned so no parent is left without its occurrences.
fn persist_new(
    conn: &Connection,
    draft: Course,
    plan: Option<RecurrencePlan>,
) -> Result<ScheduledCourse, SchedulingError> {
    let conflicts = check_conflicts(conn, &Candidate::for_course(&draft), &HashSet::new())?;
    if !conflicts.is_empty() {
        return Err(SchedulingError::ConflictDetected { conflicts });
    }

    let id = courses::insert(conn, &draft)?;
    let course = Course { id, ..draft };

    let Some(plan) = plan else {
        return Ok(ScheduledCourse {
            course,
            expansion: None,
        });
    };

    match expand(conn, &course, plan.pattern, plan.end_date) {
        Ok(outcome) => Ok(ScheduledCourse {
            course,
            expansion: Some(outcome),
        }),
        Err(err) => {
            warn!(course_id = id, error = %err, "Expansion failed, removing series parent");
            if let Err(cleanup) = courses::delete_series(conn, id) {
                warn!(course_id = id, error = %cleanup, "Failed to remove series parent");
            }
            Err(err)
        }
    }
}

fn validate_references(
    conn: &Connection,
    subject_id: i64,
    teacher_id: i64,
    room_id: i64,
) -> Result<(), SchedulingError> {
    validate_subject(conn, subject_id)?;
    validate_teacher(conn, teacher_id)?;
    validate_room(conn, room_id)
}

fn validate_patch_references(conn: &Connection, patch: &CoursePatch) -> Result<(), SchedulingError> {
    if let Some(subject_id) = patch.subject_id {
        validate_subject(conn, subject_id)?;
    }
    if let Some(teacher_id) = patch.teacher_id {
        validate_teacher(conn, teacher_id)?;
    }
    if let Some(room_id) = patch.room_id {
        validate_room(conn, room_id)?;
    }
    Ok(())
}

fn validate_subject(conn: &Connection, subject_id: i64) -> Result<(), SchedulingError> {
    if catalog::subject_exists(conn, subject_id)? {
        Ok(())
    } else {
        Err(SchedulingError::NotFound {
            entity: Entity::Subject,
            id: subject_id,
        })
    }
}

fn validate_teacher(conn: &Connection, teacher_id: i64) -> Result<(), SchedulingError> {
    let teacher = catalog::find_user(conn, teacher_id)?.ok_or(SchedulingError::NotFound {
        entity: Entity::Teacher,
        id: teacher_id,
    })?;
    if teacher.role != Role::Teacher {
        return Err(SchedulingError::InvalidRole {
            user_id: teacher_id,
            expected: Role::Teacher,
        });
    }
    Ok(())
}

fn validate_room(conn: &Connection, room_id: i64) -> Result<(), SchedulingError> {
    match catalog::find_room(conn, room_id)? {
        Some(_) => Ok(()),
        None => Err(SchedulingError::NotFound {
            entity: Entity::Room,
            id: room_id,
        }),
    }
}
