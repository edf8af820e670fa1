use std::time::Duration;

use axum::{
    extract::State,
    middleware,
    response::Json,
    routing::{delete, get},
    Extension, Router,
};
use chrono::Utc;
use tracing::warn;

use crate::auth::Actor;
use crate::errors::{AppError, Result};
use crate::middleware::require_auth;
use crate::models::{
    Activity, ClearedProperties, DashboardMetrics, DataResponse, MonthRange, Role, TopProperty,
};
use crate::search::Predicate;
use crate::AppState;

const METRICS_CACHE_KEY: &str = "dashboard:metrics";
const METRICS_CACHE_TTL: Duration = Duration::from_secs(30);
const TOP_PROPERTIES: i64 = 5;
const RECENT_ACTIVITIES: i64 = 10;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/metrics", get(get_metrics))
        .route("/top-properties", get(get_top_properties))
        .route("/activities", get(get_activities))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

pub fn admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/clear-properties", delete(clear_properties))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

pub async fn get_metrics(State(state): State<AppState>) -> Result<Json<DataResponse<DashboardMetrics>>> {
    if let Some(cached) = state.cache.get(METRICS_CACHE_KEY) {
        return Ok(Json(cached));
    }
    let generation = state.cache.generation();

    let current = MonthRange::containing(Utc::now().date_naive())
        .ok_or_else(|| AppError::Internal("current month out of range".to_string()))?;
    let previous = current
        .previous()
        .ok_or_else(|| AppError::Internal("previous month out of range".to_string()))?;

    let metrics = state.store.property_metrics(current, previous).await?;
    let new_leads = state.store.count_leads_since(current.start_datetime()).await?;

    let response = DataResponse::new(DashboardMetrics::from_parts(metrics, new_leads));
    let stored = state
        .cache
        .set_if_unchanged(METRICS_CACHE_KEY, &response, METRICS_CACHE_TTL, generation);
    if let Err(e) = stored {
        warn!("Failed to cache dashboard metrics: {}", e);
    }
    Ok(Json(response))
}

pub async fn get_top_properties(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<Vec<TopProperty>>>> {
    let rows = state.store.most_viewed(TOP_PROPERTIES).await?;
    Ok(Json(DataResponse::new(rows.into_iter().map(TopProperty::from).collect())))
}

pub async fn get_activities(State(state): State<AppState>) -> Result<Json<DataResponse<Vec<Activity>>>> {
    let rows = state.store.recently_updated(RECENT_ACTIVITIES).await?;
    Ok(Json(DataResponse::new(rows.into_iter().map(Activity::from).collect())))
}

/// Owner only. Removes every listing.
pub async fn clear_properties(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<DataResponse<ClearedProperties>>> {
    if actor.role != Role::Owner {
        warn!("User {} ({}) tried to clear all properties", actor.username, actor.role);
        return Err(AppError::Forbidden(
            "Only the owner may clear all properties".to_string(),
        ));
    }

    let deleted = state.store.delete_all_properties().await?;
    let remaining = state.store.count_properties(&Predicate::default()).await?;
    state.cache.clear();

    warn!("🧹 {} cleared {} properties ({} remaining)", actor.username, deleted, remaining);

    Ok(Json(DataResponse::new(ClearedProperties { deleted, remaining })))
}
