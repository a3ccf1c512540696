/// Request types for course scheduling
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::pattern::RecurrencePattern;
use super::recurrence::ExpansionOutcome;
use crate::db::Course;
use crate::error::SchedulingError;

/// Shortest bookable course, in minutes
pub const MIN_DURATION_MINUTES: i64 = 15;
/// Longest bookable course, in minutes
pub const MAX_DURATION_MINUTES: i64 = 480;

fn default_exclude_holidays() -> bool {
    true
}

/// Payload for creating a course or a recurring series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub subject_id: i64,
    pub teacher_id: i64,
    pub room_id: i64,
    pub start_time: DateTime<Utc>,
    /// Minutes
    pub duration: i64,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurrence_pattern: Option<RecurrencePattern>,
    #[serde(default)]
    pub recurrence_end_date: Option<NaiveDate>,
    #[serde(default = "default_exclude_holidays")]
    pub exclude_holidays: bool,
}

impl CourseRequest {
    /// Builds the unsaved course row (id 0) described by this request.
    pub fn to_course(&self) -> Course {
        Course {
            id: 0,
            name: self.name.clone(),
            description: self.description.clone(),
            subject_id: self.subject_id,
            teacher_id: self.teacher_id,
            room_id: self.room_id,
            start_time: self.start_time,
            end_time: self.start_time + Duration::minutes(self.duration),
            duration: self.duration,
            is_recurring: self.is_recurring,
            recurrence_id: None,
            recurrence_pattern: self.recurrence_pattern,
            recurrence_end_date: self.recurrence_end_date,
            exclude_holidays: self.exclude_holidays,
        }
    }
}

/// Partial update. Fields left as `None` keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoursePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub subject_id: Option<i64>,
    #[serde(default)]
    pub teacher_id: Option<i64>,
    #[serde(default)]
    pub room_id: Option<i64>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub is_recurring: Option<bool>,
    #[serde(default)]
    pub recurrence_pattern: Option<RecurrencePattern>,
    #[serde(default)]
    pub recurrence_end_date: Option<NaiveDate>,
    #[serde(default)]
    pub exclude_holidays: Option<bool>,
}

impl CoursePatch {
    /// Returns `current` with the provided fields overridden and the end
    /// time recomputed. The id and series link are kept.
    pub fn apply(&self, current: &Course) -> Course {
        let start_time = self.start_time.unwrap_or(current.start_time);
        let duration = self.duration.unwrap_or(current.duration);
        Course {
            id: current.id,
            name: self.name.clone().unwrap_or_else(|| current.name.clone()),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| current.description.clone()),
            subject_id: self.subject_id.unwrap_or(current.subject_id),
            teacher_id: self.teacher_id.unwrap_or(current.teacher_id),
            room_id: self.room_id.unwrap_or(current.room_id),
            start_time,
            end_time: start_time + Duration::minutes(duration),
            duration,
            is_recurring: self.is_recurring.unwrap_or(current.is_recurring),
            recurrence_id: current.recurrence_id,
            recurrence_pattern: self.recurrence_pattern.or(current.recurrence_pattern),
            recurrence_end_date: self.recurrence_end_date.or(current.recurrence_end_date),
            exclude_holidays: self.exclude_holidays.unwrap_or(current.exclude_holidays),
        }
    }
}

/// Validated recurrence settings of a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurrencePlan {
    pub pattern: RecurrencePattern,
    /// Exclusive: no occurrence is generated on this date
    pub end_date: NaiveDate,
}

impl RecurrencePlan {
    /// Extracts the plan of a recurring course, `None` for a one-off course.
    pub fn for_course(course: &Course) -> Result<Option<Self>, SchedulingError> {
        if !course.is_recurring {
            return Ok(None);
        }

        let pattern = course
            .recurrence_pattern
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                SchedulingError::invalid_request("a recurring course needs at least one weekday")
            })?;
        let end_date = course.recurrence_end_date.ok_or_else(|| {
            SchedulingError::invalid_request("a recurring course needs a recurrence end date")
        })?;

        if end_date <= course.start_time.date_naive() {
            return Err(SchedulingError::RecurrenceWindowInvalid);
        }

        Ok(Some(Self { pattern, end_date }))
    }
}

pub fn validate_duration(minutes: i64) -> Result<(), SchedulingError> {
    if (MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&minutes) {
        Ok(())
    } else {
        Err(SchedulingError::invalid_request(format!(
            "duration must be between {MIN_DURATION_MINUTES} and {MAX_DURATION_MINUTES} minutes, got {minutes}"
        )))
    }
}

/// Result of a create or update.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduledCourse {
    /// The standalone course, or the parent of the series
    pub course: Course,
    /// Present when the course is recurring
    pub expansion: Option<ExpansionOutcome>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::at;
    use chrono::Weekday;

    fn sample() -> Course {
        CourseRequest {
            name: "Algebra".to_string(),
            description: "Chapter 1".to_string(),
            subject_id: 1,
            teacher_id: 2,
            room_id: 3,
            start_time: at(2024, 9, 2, 9, 0),
            duration: 90,
            is_recurring: false,
            recurrence_pattern: None,
            recurrence_end_date: None,
            exclude_holidays: true,
        }
        .to_course()
    }

    #[test]
    fn test_patch_keeps_unspecified_fields() {
        let course = sample();
        let patch = CoursePatch {
            duration: Some(60),
            room_id: Some(9),
            ..CoursePatch::default()
        };
        let merged = patch.apply(&course);
        assert_eq!(merged.name, "Algebra");
        assert_eq!(merged.room_id, 9);
        assert_eq!(merged.start_time, course.start_time);
        assert_eq!(merged.end_time, at(2024, 9, 2, 10, 0));
    }

    #[test]
    fn test_patch_json_omitting_fields_deserializes() {
        let patch: CoursePatch = serde_json::from_str(r#"{"name": "Geometry"}"#).unwrap();
        assert_eq!(patch.name.as_deref(), Some("Geometry"));
        assert!(patch.start_time.is_none());
    }

    #[test]
    fn test_recurrence_plan_requires_end_after_start() {
        let mut course = sample();
        course.is_recurring = true;
        course.recurrence_pattern = Some(RecurrencePattern::from_days([Weekday::Mon]));
        course.recurrence_end_date = Some(at(2024, 9, 2, 0, 0).date_naive());
        assert!(matches!(
            RecurrencePlan::for_course(&course),
            Err(SchedulingError::RecurrenceWindowInvalid)
        ));

        course.recurrence_end_date = Some(at(2024, 9, 16, 0, 0).date_naive());
        let plan = RecurrencePlan::for_course(&course).unwrap().unwrap();
        assert!(plan.pattern.contains(Weekday::Mon));
    }

    #[test]
    fn test_recurrence_plan_rejects_empty_pattern() {
        let mut course = sample();
        course.is_recurring = true;
        course.recurrence_pattern = Some(RecurrencePattern::default());
        course.recurrence_end_date = Some(at(2024, 9, 16, 0, 0).date_naive());
        assert!(matches!(
            RecurrencePlan::for_course(&course),
            Err(SchedulingError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_duration_bounds() {
        assert!(validate_duration(15).is_ok());
        assert!(validate_duration(480).is_ok());
        assert!(validate_duration(14).is_err());
        assert!(validate_duration(481).is_err());
    }
}
