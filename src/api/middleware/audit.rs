//! Access-log middleware.
//!
//! Logs every API request with method, path, user and response status.
//! Runs innermost (after auth has injected `SessionContext`).

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::api::types::SessionContext;

pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let user = req
        .extensions()
        .get::<SessionContext>()
        .map(|s| (s.user.id, s.user.role));

    let response = next.run(req).await;
    let status = response.status().as_u16();

    match user {
        Some((user_id, role)) => tracing::info!(
            %method, path, %user_id, role = role.as_str(), status, "API request"
        ),
        None => tracing::info!(%method, path, status, "API request"),
    }
    response
}
