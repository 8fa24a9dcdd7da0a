use axum::{
    Router,
    middleware::from_fn,
    routing::{post, put},
};

use crate::auth::guards::{require_student, require_teacher};
use crate::state::AppState;

mod common;
mod post;
mod put;

pub use common::{GenerateQrReq, QrCodeResponse, ScanQrReq};
pub use post::{generate_qr, scan_qr};
pub use put::deactivate_qr;

pub fn qr_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/generate",
            post(generate_qr).route_layer(from_fn(require_teacher)),
        )
        .route("/scan", post(scan_qr).route_layer(from_fn(require_student)))
        .route(
            "/deactivate/{qr_id}",
            put(deactivate_qr).route_layer(from_fn(require_teacher)),
        )
}
