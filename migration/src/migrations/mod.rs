pub mod m202601050001_create_users;
pub mod m202601050002_create_subjects;
pub mod m202601050003_create_qr_tokens;
pub mod m202601050004_create_attendance_records;
pub mod m202601050005_create_finalize_queue;
