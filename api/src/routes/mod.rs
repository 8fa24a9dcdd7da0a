//! HTTP route entry point for `/api/...`.
//!
//! Route groups:
//! - `/health` → liveness probe (public)
//! - `/qr` → QR code issuance, scanning, and deactivation
//! - `/attendance` → record listings and per-code summaries
//! - `/admin-report` → campus-wide attendance percentages (admin-only)

use crate::auth::guards::{allow_authenticated, require_admin};
use crate::state::AppState;
use axum::{Router, middleware::from_fn, routing::get};

pub mod attendance;
pub mod common;
pub mod health;
pub mod qr;

/// Builds the complete application router for all HTTP endpoints.
///
/// Role checks are applied per route group; handlers can then read the
/// verified claims from request extensions.
pub fn routes(app_state: AppState) -> Router {
    Router::new()
        .nest("/health", health::health_routes())
        .nest("/qr", qr::qr_routes())
        .nest(
            "/attendance",
            attendance::attendance_routes().route_layer(from_fn(allow_authenticated)),
        )
        .route(
            "/admin-report",
            get(attendance::admin_report).route_layer(from_fn(require_admin)),
        )
        .with_state(app_state)
}
