pub mod attendance_record;
pub mod finalize_task;
pub mod qr_token;
pub mod qr_token_roster;
pub mod qr_token_scan;
pub mod subject;
pub mod subject_enrollment;
pub mod user;
