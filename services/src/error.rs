use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Failure taxonomy of the attendance subsystem.
///
/// Everything except `Db` is a caller error that must be reported
/// synchronously with no partial state change.
#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("not authorized to perform this action")]
    NotAuthorized,

    #[error("QR code not found")]
    NotFound,

    #[error("QR code expired or inactive")]
    Expired,

    #[error("out of allowed range (distance {distance:.0} m, allowed {allowed:.0} m)")]
    OutOfRange { distance: f64, allowed: f64 },

    #[error("you are not enrolled in this subject")]
    NotEnrolled,

    #[error("attendance already marked")]
    AlreadyMarked,

    #[error("{0}")]
    InvalidInput(String),

    #[error("database error: {0}")]
    Db(#[from] DbErr),
}

/// True when a write lost a duplicate-key race. Callers recover locally
/// instead of surfacing a server fault.
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
