//! Real-estate listing API: property search, listing management, leads,
//! agenda and dashboard metrics.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    response::Json,
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

pub mod auth;
pub mod cache;
pub mod config;
pub mod database;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod search;
pub mod store;

use auth::TokenIssuer;
use cache::ResponseCache;
use config::{AppConfig, SearchConfig};
use handlers::{appointments, dashboard, leads, properties};
use store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub cache: ResponseCache,
    pub tokens: TokenIssuer,
    pub search: Arc<SearchConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: &AppConfig) -> Self {
        Self {
            store,
            cache: ResponseCache::default(),
            tokens: TokenIssuer::new(config.jwt_secret.as_bytes(), config.token_ttl_days),
            search: Arc::new(config.search.clone()),
        }
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = if allowed_origins.is_empty() {
        info!("🔓 No ALLOWED_ORIGINS configured: using permissive CORS");
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("⚠️ Ignoring invalid origin '{}': {}", origin, e);
                    None
                }
            })
            .collect();
        info!("🔒 CORS configured for {} origins", origins.len());
        CorsLayer::new().allow_origin(origins)
    };

    cors.allow_methods([
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ])
    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
}

/// Builds the full application router.
pub fn build_router(state: AppState, config: &AppConfig) -> Router {
    let api = Router::new()
        .route("/health", get(health_check))
        .nest("/properties", properties::router(state.clone()))
        .nest("/auth", handlers::auth::router(state.clone(), config.login_rate_limit))
        .nest("/leads", leads::router(state.clone()))
        .nest("/appointments", appointments::router(state.clone()))
        .nest("/dashboard", dashboard::router(state.clone()))
        .nest("/admin", dashboard::admin_router(state.clone()));

    Router::new()
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config.allowed_origins)),
        )
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now(),
        "storage": state.store.backend(),
    }))
}
