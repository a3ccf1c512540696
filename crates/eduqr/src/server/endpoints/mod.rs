pub mod attendance;
pub mod courses;
pub mod status;
