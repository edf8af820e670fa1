use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::auth::Actor;
use crate::errors::AppError;
use crate::AppState;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Rejects requests without a valid bearer token and exposes the verified
/// [`Actor`] to handlers as a request extension.
///
/// A missing token is 401; a token that fails verification is 403.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| AppError::Unauthorized("Access token required".to_string()))?;

    let claims = state.tokens.verify(token).map_err(|e| {
        warn!("Rejected bearer token: {}", e);
        AppError::Forbidden("Invalid or expired token".to_string())
    })?;

    request.extensions_mut().insert(Actor::from(claims));
    Ok(next.run(request).await)
}
