use std::collections::BTreeMap;
use std::time::Duration;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, RawQuery, State,
    },
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, post, put},
    Extension, Router,
};
use tracing::info;
use validator::Validate;

use crate::auth::Actor;
use crate::errors::{AppError, Result};
use crate::middleware::require_auth;
use crate::models::{
    Category, CreatedProperty, DataResponse, ListResponse, MessageResponse, Property,
    PropertyChanges, PropertyDraft, PropertyStatus,
};
use crate::search::{self, FilterSet, Predicate, SortOrder};
use crate::AppState;

/// Sections of the home page, in display order.
pub const HOME_CATEGORIES: [Category; 4] = [
    Category::Lancamentos,
    Category::BeiraMar,
    Category::MaisProcurados,
    Category::ProntoMorar,
];

const HOME_SECTION_SIZE: i64 = 5;
const HOME_CACHE_KEY: &str = "properties:home";
const HOME_CACHE_TTL: Duration = Duration::from_secs(60);

pub fn router(state: AppState) -> Router<AppState> {
    let auth = middleware::from_fn_with_state(state, require_auth);

    Router::new()
        .route(
            "/",
            get(search_properties).merge(post(create_property).route_layer(auth.clone())),
        )
        .route("/home", get(home_highlights))
        .route(
            "/:id",
            get(get_property).merge(
                put(update_property)
                    .delete(delete_property)
                    .route_layer(auth),
            ),
        )
}

pub async fn search_properties(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<ListResponse<Property>>> {
    let filters = FilterSet::from_query(query.as_deref().unwrap_or(""), &state.search);
    let response = search::search(state.store.as_ref(), &filters).await?;
    Ok(Json(response))
}

/// Newest available listings of each home page section.
pub async fn home_highlights(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<BTreeMap<String, Vec<Property>>>>> {
    if let Some(cached) = state.cache.get(HOME_CACHE_KEY) {
        tracing::debug!("🎯 CACHE HIT: home highlights");
        return Ok(Json(cached));
    }
    let generation = state.cache.generation();

    let mut sections = BTreeMap::new();
    for category in HOME_CATEGORIES {
        let mut filters = FilterSet::unfiltered(HOME_SECTION_SIZE);
        filters.category = Some(category);
        filters.status = Some(PropertyStatus::Available);

        let rows = state
            .store
            .fetch_properties(&Predicate::compile(&filters), SortOrder::Recent, HOME_SECTION_SIZE, 0)
            .await?;
        sections.insert(category.as_str().to_string(), rows);
    }

    let response = DataResponse::new(sections);
    let stored = state
        .cache
        .set_if_unchanged(HOME_CACHE_KEY, &response, HOME_CACHE_TTL, generation);
    if let Err(e) = stored {
        tracing::warn!("Failed to cache home highlights: {}", e);
    }
    Ok(Json(response))
}

pub async fn get_property(
    State(state): State<AppState>,
    path: std::result::Result<Path<i32>, PathRejection>,
) -> Result<Json<DataResponse<Property>>> {
    let Path(id) = path?;
    let response = search::detail(state.store.as_ref(), id).await?;
    Ok(Json(response))
}

pub async fn create_property(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    body: std::result::Result<Json<PropertyDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<DataResponse<CreatedProperty>>)> {
    let Json(draft) = body?;
    draft.validate()?;

    let new = draft.into_new(&state.search.default_city);
    let property = state.store.insert_property(&new, Some(actor.id)).await?;
    state.cache.clear();

    info!(
        "🏠 Property {} created by {} ({})",
        property.id, actor.username, property.category
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(CreatedProperty { id: property.id })),
    ))
}

/// Loads a property and checks that `actor` may change it.
async fn modifiable_property(state: &AppState, actor: &Actor, id: i32) -> Result<Property> {
    let property = state
        .store
        .find_property(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Property {id} not found")))?;

    if !actor.can_modify(property.created_by) {
        tracing::warn!("User {} may not modify property {}", actor.username, id);
        return Err(AppError::Forbidden(
            "You do not have permission to modify this property".to_string(),
        ));
    }
    Ok(property)
}

pub async fn update_property(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    path: std::result::Result<Path<i32>, PathRejection>,
    body: std::result::Result<Json<PropertyChanges>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    let Path(id) = path?;
    let Json(changes) = body?;

    let existing = modifiable_property(&state, &actor, id).await?;
    changes.validate()?;
    if !changes.keeps_a_price(&existing) {
        return Err(AppError::Validation(
            "at least one of sale_price or rent_price is required".to_string(),
        ));
    }

    state
        .store
        .update_property(id, &changes)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Property {id} not found")))?;
    state.cache.clear();

    info!("✏️  Property {} updated by {}", id, actor.username);
    Ok(Json(MessageResponse::ok("Property updated successfully")))
}

pub async fn delete_property(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    path: std::result::Result<Path<i32>, PathRejection>,
) -> Result<Json<MessageResponse>> {
    let Path(id) = path?;
    modifiable_property(&state, &actor, id).await?;

    if !state.store.delete_property(id).await? {
        return Err(AppError::NotFound(format!("Property {id} not found")));
    }
    state.cache.clear();

    info!("🗑️  Property {} deleted by {}", id, actor.username);
    Ok(Json(MessageResponse::ok("Property deleted successfully")))
}
