//! Course scheduling and QR attendance for schools.
//!
//! [`scheduling::CourseScheduler`] books courses and recurring series while
//! keeping each room's contention group free of overlaps;
//! [`attendance::AttendanceService`] issues QR tokens and records scans.

pub mod attendance;
pub mod audit;
pub mod config;
pub mod db;
pub mod error;
pub mod scheduling;
pub mod server;
pub mod types;
