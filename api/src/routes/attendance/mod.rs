use axum::{Router, middleware::from_fn, routing::get};

use crate::auth::guards::require_teacher;
use crate::state::AppState;

pub mod common;
mod get;

pub use get::{admin_report, attendance_summary, list_attendance};

pub fn attendance_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_attendance))
        .route(
            "/summary/{qr_id}",
            get(attendance_summary).route_layer(from_fn(require_teacher)),
        )
}
