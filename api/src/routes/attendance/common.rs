use db::models::attendance_record;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Default)]
pub struct AttendanceRecordResponse {
    pub id: i64,
    pub token_id: i64,
    pub student_id: i64,
    pub subject_id: i64,
    pub teacher_id: i64,
    pub status: String,
    pub remarks: Option<String>,
    pub date: String,
    pub taken_at: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub selfie_url: Option<String>,
    pub device_id: Option<String>,
}

impl From<attendance_record::Model> for AttendanceRecordResponse {
    fn from(m: attendance_record::Model) -> Self {
        Self {
            id: m.id,
            token_id: m.token_id,
            student_id: m.student_id,
            subject_id: m.subject_id,
            teacher_id: m.teacher_id,
            status: m.status.to_string(),
            remarks: m.remarks,
            date: m.date,
            taken_at: m.taken_at.to_rfc3339(),
            latitude: m.latitude,
            longitude: m.longitude,
            selfie_url: m.selfie_url,
            device_id: m.device_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// `YYYY-MM-DD`
    pub date: Option<String>,
    pub subject_id: Option<i64>,
    pub student_id: Option<i64>,
}

#[derive(Debug, Serialize, Default)]
pub struct ListResponse {
    pub count: usize,
    pub records: Vec<AttendanceRecordResponse>,
}

#[derive(Debug, Serialize, Default)]
pub struct SummaryResponse {
    pub qr_title: String,
    pub subject_id: i64,
    pub total: usize,
    pub total_present: i64,
    pub total_absent: i64,
    pub records: Vec<AttendanceRecordResponse>,
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    /// Inclusive lower bound, `YYYY-MM-DD`
    pub from: Option<String>,
    /// Inclusive upper bound, `YYYY-MM-DD`
    pub to: Option<String>,
}

#[derive(Debug, Serialize, Default)]
pub struct ReportResponse {
    pub count: usize,
    pub report: Vec<services::attendance::StudentAttendanceReport>,
}
