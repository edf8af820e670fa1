use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, RawQuery, State,
    },
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, post, put},
    Router,
};
use tracing::info;
use validator::Validate;

use crate::errors::{AppError, Result};
use crate::middleware::require_auth;
use crate::models::{DataResponse, Lead, LeadStatus, LeadStatusUpdate, ListResponse, NewLead};
use crate::search::{list_envelope, Paging, QueryParams};
use crate::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    let auth = middleware::from_fn_with_state(state, require_auth);

    Router::new()
        .route(
            "/",
            post(create_lead).merge(get(list_leads).route_layer(auth.clone())),
        )
        .route("/:id/status", put(update_lead_status).route_layer(auth))
}

/// Public contact form.
pub async fn create_lead(
    State(state): State<AppState>,
    body: std::result::Result<Json<NewLead>, JsonRejection>,
) -> Result<(StatusCode, Json<DataResponse<Lead>>)> {
    let Json(lead) = body?;
    lead.validate()?;

    let lead = state.store.insert_lead(&lead).await?;
    info!("📨 Lead {} received via {}", lead.id, lead.source);

    Ok((StatusCode::CREATED, Json(DataResponse::new(lead))))
}

pub async fn list_leads(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<ListResponse<Lead>>> {
    let params = QueryParams::parse(query.as_deref().unwrap_or(""));
    let status: Option<LeadStatus> = params.parsed("status");
    let paging = Paging::from_params(&params, &state.search);

    let total = state.store.count_leads(status).await?;
    let rows = state
        .store
        .list_leads(status, paging.limit, paging.offset())
        .await?;

    Ok(Json(list_envelope(rows, total, paging.page, paging.limit)))
}

pub async fn update_lead_status(
    State(state): State<AppState>,
    path: std::result::Result<Path<i32>, PathRejection>,
    body: std::result::Result<Json<LeadStatusUpdate>, JsonRejection>,
) -> Result<Json<DataResponse<Lead>>> {
    let Path(id) = path?;
    let Json(update) = body?;

    let lead = state
        .store
        .update_lead_status(id, update.status)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Lead {id} not found")))?;

    info!("📨 Lead {} marked {}", id, lead.status);
    Ok(Json(DataResponse::new(lead)))
}
