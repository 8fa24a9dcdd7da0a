use axum::{
    body::Body,
    extract::{ConnectInfo, FromRequestParts},
    http::{Method, Request},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;

use crate::auth::claims::AuthUser;

/// Logs method, path, IP address, and user ID (if authenticated) for each
/// incoming HTTP request. Skips CORS preflight `OPTIONS` requests.
pub async fn log_request(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let (mut parts, body) = req.into_parts();

    if parts.method == Method::OPTIONS {
        let req = Request::from_parts(parts, body);
        return next.run(req).await;
    }

    let user_id = AuthUser::from_request_parts(&mut parts, &())
        .await
        .ok()
        .map(|AuthUser(c)| c.sub);

    log::info!(
        "{} {} ip={} user={}",
        parts.method,
        parts.uri.path(),
        addr.ip(),
        user_id.unwrap_or(0)
    );

    let req = Request::from_parts(parts, body);
    next.run(req).await
}
