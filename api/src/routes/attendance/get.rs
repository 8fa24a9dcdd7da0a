use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use db::models::user::Role;

use crate::auth::AuthUser;
use crate::response::ApiResponse;
use crate::routes::common::error_response;
use crate::state::AppState;

use super::common::{
    AttendanceRecordResponse, ListQuery, ListResponse, ReportQuery, ReportResponse,
    SummaryResponse,
};
use services::attendance::{AttendanceFilter, AttendanceService, Viewer};

/// GET /api/attendance/summary/{qr_id}
///
/// Present/absent totals plus the full record list for one code.
pub async fn attendance_summary(
    State(state): State<AppState>,
    Path(qr_id): Path<i64>,
) -> (StatusCode, Json<ApiResponse<SummaryResponse>>) {
    match AttendanceService::summary(state.db(), qr_id).await {
        Ok(summary) => {
            let records: Vec<AttendanceRecordResponse> = summary
                .records
                .into_iter()
                .map(AttendanceRecordResponse::from)
                .collect();

            (
                StatusCode::OK,
                Json(ApiResponse::success(
                    SummaryResponse {
                        qr_title: summary.token.title,
                        subject_id: summary.token.subject_id,
                        total: records.len(),
                        total_present: summary.present,
                        total_absent: summary.absent,
                        records,
                    },
                    "Attendance summary",
                )),
            )
        }
        Err(e) => error_response(e),
    }
}

/// GET /api/attendance
///
/// Students see their own records; teachers see records for codes they
/// issued and may filter by student.
pub async fn list_attendance(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> (StatusCode, Json<ApiResponse<ListResponse>>) {
    let viewer = match claims.role {
        Role::Student => Viewer::Student(claims.sub),
        Role::Teacher => Viewer::Teacher(claims.sub),
        Role::Admin => Viewer::Admin,
    };

    let filter = AttendanceFilter {
        date: query.date,
        subject_id: query.subject_id,
        student_id: query.student_id,
    };

    match AttendanceService::list(state.db(), viewer, filter).await {
        Ok(records) => {
            let records: Vec<AttendanceRecordResponse> = records
                .into_iter()
                .map(AttendanceRecordResponse::from)
                .collect();

            (
                StatusCode::OK,
                Json(ApiResponse::success(
                    ListResponse {
                        count: records.len(),
                        records,
                    },
                    "Attendance records",
                )),
            )
        }
        Err(e) => error_response(e),
    }
}

/// GET /api/admin-report
///
/// Per-student attendance percentage across all recorded sessions.
pub async fn admin_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> (StatusCode, Json<ApiResponse<ReportResponse>>) {
    match AttendanceService::admin_report(state.db(), query.from, query.to).await {
        Ok(report) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                ReportResponse {
                    count: report.len(),
                    report,
                },
                "Attendance report",
            )),
        ),
        Err(e) => error_response(e),
    }
}
