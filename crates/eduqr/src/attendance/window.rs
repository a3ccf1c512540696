//! Time rules of attendance: when tokens may be issued and used, and how a
//! scan time maps to a presence status.

use chrono::{DateTime, Duration, Utc};

use crate::config::AttendanceConfig;
use crate::db::{Course, PresenceStatus};

#[derive(Debug, Clone, Copy)]
pub struct AttendanceWindow {
    lead: Duration,
    present_grace: Duration,
    late_grace: Duration,
}

impl AttendanceWindow {
    pub fn new(config: &AttendanceConfig) -> Self {
        Self {
            lead: Duration::minutes(config.token_lead_minutes),
            present_grace: Duration::minutes(config.present_grace_minutes),
            late_grace: Duration::minutes(config.late_grace_minutes),
        }
    }

    /// A token may be generated from `start - lead` up to and including `end`.
    pub fn can_issue(&self, course: &Course, now: DateTime<Utc>) -> bool {
        course.start_time - self.lead <= now && now <= course.end_time
    }

    /// Tokens are accepted during `[start, end)`.
    pub fn is_open(&self, course: &Course, now: DateTime<Utc>) -> bool {
        course.start_time <= now && now < course.end_time
    }

    /// Status of a scan at `now` for a course starting at `start`.
    pub fn classify(&self, start: DateTime<Utc>, now: DateTime<Utc>) -> PresenceStatus {
        let elapsed = now - start;
        if elapsed < self.present_grace {
            PresenceStatus::Present
        } else if elapsed < self.late_grace {
            PresenceStatus::Late
        } else {
            PresenceStatus::Absent
        }
    }
}

impl Default for AttendanceWindow {
    fn default() -> Self {
        Self::new(&AttendanceConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::at;

    fn course() -> Course {
        let start = at(2024, 9, 2, 10, 0);
        Course {
            id: 1,
            name: "Chemistry".to_string(),
            description: String::new(),
            subject_id: 1,
            teacher_id: 1,
            room_id: 1,
            start_time: start,
            end_time: start + Duration::minutes(60),
            duration: 60,
            is_recurring: false,
            recurrence_id: None,
            recurrence_pattern: None,
            recurrence_end_date: None,
            exclude_holidays: true,
        }
    }

    #[test]
    fn test_classification_thresholds() {
        let w = AttendanceWindow::default();
        let start = course().start_time;
        assert_eq!(w.classify(start, start + Duration::minutes(10)), PresenceStatus::Present);
        assert_eq!(w.classify(start, start + Duration::minutes(15)), PresenceStatus::Late);
        assert_eq!(w.classify(start, start + Duration::minutes(20)), PresenceStatus::Late);
        assert_eq!(w.classify(start, start + Duration::minutes(30)), PresenceStatus::Absent);
        assert_eq!(w.classify(start, start + Duration::minutes(40)), PresenceStatus::Absent);
    }

    #[test]
    fn test_issue_window_bounds() {
        let w = AttendanceWindow::default();
        let c = course();
        assert!(w.can_issue(&c, c.start_time - Duration::minutes(15)));
        assert!(w.can_issue(&c, c.end_time - Duration::milliseconds(1)));
        assert!(w.can_issue(&c, c.end_time));
        assert!(!w.can_issue(&c, c.start_time - Duration::minutes(16)));
        assert!(!w.can_issue(&c, c.end_time + Duration::milliseconds(1)));
    }

    #[test]
    fn test_open_window_is_half_open() {
        let w = AttendanceWindow::default();
        let c = course();
        assert!(!w.is_open(&c, c.start_time - Duration::milliseconds(1)));
        assert!(w.is_open(&c, c.start_time));
        assert!(!w.is_open(&c, c.end_time));
    }
}
