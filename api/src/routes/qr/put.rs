use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use db::models::qr_token;
use sea_orm::EntityTrait;

use crate::auth::AuthUser;
use crate::response::ApiResponse;
use crate::routes::common::error_response;
use crate::state::AppState;

use super::common::DeactivateResponse;
use services::qr_code::QrCodeService;

/// PUT /api/qr/deactivate/{qr_id}
///
/// Manually closes a code the caller issued. Runs the same absentee sweep as
/// automatic expiry and completes the scheduled finalization, so the
/// background worker has nothing left to do.
pub async fn deactivate_qr(
    State(state): State<AppState>,
    Path(qr_id): Path<i64>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> (StatusCode, Json<ApiResponse<DeactivateResponse>>) {
    let db = state.db();

    match QrCodeService::finalize(db, qr_id, Some(claims.sub)).await {
        Ok(sweep) => {
            let title = qr_token::Entity::find_by_id(qr_id)
                .one(db)
                .await
                .ok()
                .flatten()
                .map(|t| t.title)
                .unwrap_or_default();

            (
                StatusCode::OK,
                Json(ApiResponse::success(
                    DeactivateResponse {
                        id: qr_id,
                        title,
                        active: false,
                        present: sweep.present,
                        absent: sweep.absent,
                    },
                    "QR deactivated and attendance finalized",
                )),
            )
        }
        Err(e) => error_response(e),
    }
}
