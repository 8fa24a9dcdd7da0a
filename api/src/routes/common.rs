use axum::{Json, http::StatusCode};
use serde::Serialize;
use services::error::AttendanceError;

use crate::response::ApiResponse;

/// Maps a service failure onto its HTTP status.
pub fn error_status(err: &AttendanceError) -> StatusCode {
    match err {
        AttendanceError::NotAuthorized => StatusCode::FORBIDDEN,
        AttendanceError::NotFound => StatusCode::NOT_FOUND,
        AttendanceError::Expired
        | AttendanceError::AlreadyMarked
        | AttendanceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        AttendanceError::OutOfRange { .. } | AttendanceError::NotEnrolled => StatusCode::FORBIDDEN,
        AttendanceError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Turns a service failure into the standard error envelope. Persistence
/// details are logged, never echoed to the caller.
pub fn error_response<T>(err: AttendanceError) -> (StatusCode, Json<ApiResponse<T>>)
where
    T: Serialize + Default,
{
    let status = error_status(&err);
    let message = match &err {
        AttendanceError::Db(e) => {
            log::error!("persistence failure: {e}");
            "Server Error".to_string()
        }
        other => other.to_string(),
    };

    (status, Json(ApiResponse::error(message)))
}
