use axum::{Extension, Json, extract::State, http::StatusCode};
use validator::Validate;

use crate::auth::AuthUser;
use crate::response::ApiResponse;
use crate::routes::common::error_response;
use crate::state::AppState;

use super::common::{GenerateQrReq, QrCodeResponse, ScanQrReq, qr_image_data_uri};
use crate::routes::attendance::common::AttendanceRecordResponse;
use services::qr_code::{IssueQr, QrCodeService, ScanQr};

/// POST /api/qr/generate
///
/// Issues a QR attendance code for one of the caller's subjects. The
/// subject's current enrollment is frozen into the code and finalization is
/// scheduled for the expiry instant.
pub async fn generate_qr(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(body): Json<GenerateQrReq>,
) -> (StatusCode, Json<ApiResponse<QrCodeResponse>>) {
    if let Err(errors) = body.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(common::format_validation_errors(&errors))),
        );
    }

    let params = IssueQr {
        teacher_id: claims.sub,
        subject_id: body.subject_id,
        title: body.title,
        latitude: body.latitude,
        longitude: body.longitude,
        radius_meters: body.radius_meters,
        duration_minutes: body.duration_minutes,
        max_uses: body.max_uses.unwrap_or(0),
    };

    match QrCodeService::issue(state.db(), params).await {
        Ok(token) => match qr_image_data_uri(&token.token) {
            Ok(qr_image) => (
                StatusCode::CREATED,
                Json(ApiResponse::success(
                    QrCodeResponse::from_token(token, qr_image),
                    "QR generated",
                )),
            ),
            Err(e) => {
                log::error!("failed to render QR image: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::error("Failed to render QR image")),
                )
            }
        },
        Err(e) => error_response(e),
    }
}

/// POST /api/qr/scan
///
/// Records the calling student as present on a code, provided the code is
/// valid, the student is on its frozen roster, and the reported position is
/// inside the geofence.
pub async fn scan_qr(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(body): Json<ScanQrReq>,
) -> (StatusCode, Json<ApiResponse<AttendanceRecordResponse>>) {
    let params = ScanQr {
        student_id: claims.sub,
        token: body.token,
        latitude: body.latitude,
        longitude: body.longitude,
        selfie_url: body.selfie_image_url,
        device_id: body.device_id,
    };

    match QrCodeService::scan(state.db(), params).await {
        Ok(record) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                AttendanceRecordResponse::from(record),
                "Attendance marked successfully",
            )),
        ),
        Err(e) => error_response(e),
    }
}
