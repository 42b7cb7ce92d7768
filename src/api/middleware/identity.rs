//! Caller identity middleware.
//!
//! Extracts `X-User-Id: <uuid>` and injects `CallerIdentity` into request
//! extensions for downstream handlers. Requests without a parseable id are
//! rejected with 401 — mutating operations never fall back to a default
//! account.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::CallerIdentity;

pub async fn require_identity(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_identity_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_identity_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let user_id = req
        .headers()
        .get("X-User-Id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(CallerIdentity { user_id });
    Ok(next.run(req).await)
}
