//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::error::ApiError;
use crate::web::state::AppState;
use lessonlab_core::ports::PortError;

/// Middleware that validates the bearer credential against the identity
/// provider and extracts the caller.
///
/// If valid, inserts the `AuthUser` into request extensions for handlers to
/// use. If missing or invalid, rejects uniformly with a 401 envelope,
/// regardless of which operation was targeted.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(ApiError::Port(PortError::Unauthorized))?;

    let user = state.identity.verify_token(token).await?;
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
