use std::sync::Arc;

use crate::attendance::{AttendanceService, AttendanceWindow};
use crate::audit::AuditSink;
use crate::config::ServiceConfig;
use crate::db::ScheduleDb;
use crate::scheduling::CourseScheduler;

/// State shared by every request handler.
pub struct AppState {
    pub scheduler: CourseScheduler,
    pub attendance: AttendanceService,
    pub config: ServiceConfig,
}

impl AppState {
    /// Wires the services around one database handle and one audit queue.
    pub fn new(db: Arc<ScheduleDb>, config: ServiceConfig, audit: AuditSink) -> Self {
        let window = AttendanceWindow::new(&config.attendance);
        Self {
            scheduler: CourseScheduler::new(db.clone(), audit.clone()),
            attendance: AttendanceService::new(db, window, audit),
            config,
        }
    }
}
