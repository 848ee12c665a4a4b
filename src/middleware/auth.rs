//! Authentication middleware
//!
//! An upstream gateway authenticates the caller and forwards the user id in a
//! header (`[auth] user_header`). This layer turns that id into a
//! [`Principal`] stored in the request extensions.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AppError;
use crate::permission::Principal;
use crate::state::AppState;

/// Paths that don't require authentication
fn is_public_path(path: &str) -> bool {
    !path.starts_with("/api") || path == "/api/health"
}

/// Parse the forwarded user id, `None` when absent or malformed
fn forwarded_user_id(request: &Request<Body>, header: &str) -> Option<i64> {
    request
        .headers()
        .get(header)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Authentication middleware
pub async fn auth_layer(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if is_public_path(request.uri().path()) {
        return next.run(request).await;
    }

    let Some(user_id) = forwarded_user_id(&request, &state.config.auth.user_header) else {
        tracing::debug!(path = %request.uri().path(), "request without a valid user header");
        return AppError::Unauthorized.into_response();
    };

    match Principal::load(&state.db, user_id).await {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(AppError::Unauthorized) => {
            tracing::warn!("User not found or inactive: {}", user_id);
            AppError::Unauthorized.into_response()
        }
        Err(e) => e.into_response(),
    }
}
