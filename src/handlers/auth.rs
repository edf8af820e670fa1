use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, State},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Extension, Router,
};
use tower_governor::{governor::GovernorConfigBuilder, GovernorError, GovernorLayer};
use tracing::{info, warn};
use validator::Validate;

use crate::auth::{verify_password, Actor};
use crate::errors::{AppError, Result};
use crate::middleware::require_auth;
use crate::models::{LoginRequest, LoginResponse, UserProfile, VerifyResponse};
use crate::AppState;

/// One login attempt regained every three minutes, bursts of five:
/// about five attempts per client IP per fifteen minutes.
const LOGIN_REPLENISH_SECONDS: u64 = 180;
const LOGIN_BURST: u32 = 5;

pub fn router(state: AppState, rate_limit: bool) -> Router<AppState> {
    let mut login_route = post(login);

    if rate_limit {
        match GovernorConfigBuilder::default()
            .per_second(LOGIN_REPLENISH_SECONDS)
            .burst_size(LOGIN_BURST)
            .error_handler(rate_limit_response)
            .finish()
        {
            Some(config) => {
                let config = Arc::new(config);
                let limiter = config.limiter().clone();
                if let Ok(handle) = tokio::runtime::Handle::try_current() {
                    handle.spawn(async move {
                        let mut interval = tokio::time::interval(Duration::from_secs(60));
                        loop {
                            interval.tick().await;
                            limiter.retain_recent();
                        }
                    });
                }
                login_route = login_route.layer(GovernorLayer { config });
            }
            None => warn!("⚠️ Invalid login rate limit configuration, login is not throttled"),
        }
    }

    Router::new().route("/login", login_route).route(
        "/verify",
        get(verify).route_layer(middleware::from_fn_with_state(state, require_auth)),
    )
}

/// Renders limiter rejections with the same `{ success, message }` body as
/// every other failure.
fn rate_limit_response(error: GovernorError) -> Response {
    match error {
        GovernorError::TooManyRequests { wait_time, headers } => {
            warn!("🚦 Login rate limit hit, retry in {}s", wait_time);
            let mut response = AppError::TooManyRequests(format!(
                "Too many login attempts, try again in {wait_time} seconds"
            ))
            .into_response();
            if let Some(headers) = headers {
                response.headers_mut().extend(headers);
            }
            response
        }
        GovernorError::UnableToExtractKey => {
            AppError::Internal("login rate limit could not read the client address".to_string())
                .into_response()
        }
        GovernorError::Other { code, msg, .. } => {
            let message = msg.unwrap_or_else(|| "Request rejected".to_string());
            let mut response = AppError::BadRequest(message).into_response();
            *response.status_mut() = code;
            response
        }
    }
}

pub async fn login(
    State(state): State<AppState>,
    body: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>> {
    let Json(request) = body?;
    request
        .validate()
        .map_err(|_| AppError::Validation("Username and password are required".to_string()))?;

    let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

    let user = match state.store.find_user_by_username(&request.username).await? {
        Some(user) => user,
        None => {
            warn!("Login attempt for unknown user {}", request.username);
            return Err(invalid());
        }
    };

    // Argon2 verification blocks; run it off the async workers.
    let stored_hash = user.password_hash.clone();
    let password = request.password;
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| AppError::Internal(format!("password check failed: {e}")))?;

    if !matches {
        warn!("Failed login for {}", user.username);
        return Err(invalid());
    }

    state.store.touch_last_login(user.id).await?;
    let token = state
        .tokens
        .issue(&user)
        .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))?;

    info!("🔑 {} logged in ({})", user.username, user.role);

    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful".to_string(),
        token,
        user: UserProfile::from(&user),
    }))
}

pub async fn verify(Extension(actor): Extension<Actor>) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        success: true,
        user: actor.profile(),
    })
}
