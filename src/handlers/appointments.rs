use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, RawQuery, State,
    },
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, patch},
    Router,
};
use chrono::{Datelike, Utc};
use tracing::info;
use validator::Validate;

use crate::errors::{AppError, Result};
use crate::middleware::require_auth;
use crate::models::{
    Appointment, AppointmentFilter, AppointmentRequest, AppointmentStatusUpdate, DataResponse,
    MessageResponse, MonthRange,
};
use crate::search::QueryParams;
use crate::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(list_appointments).post(create_appointment))
        .route(
            "/:id",
            get(get_appointment)
                .put(update_appointment)
                .delete(delete_appointment),
        )
        .route("/:id/status", patch(update_appointment_status))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

/// `?status=` and `?month=&year=` (year defaults to the current one).
fn parse_filter(query: &str) -> Result<AppointmentFilter> {
    let params = QueryParams::parse(query);

    let status = match params.text("status") {
        Some(status) => Some(
            status
                .parse()
                .map_err(|e: crate::models::UnknownVariant| AppError::BadRequest(e.to_string()))?,
        ),
        None => None,
    };

    let month = match params.parsed::<u32>("month") {
        Some(month) => {
            let year = params
                .parsed::<i32>("year")
                .unwrap_or_else(|| Utc::now().year());
            Some(
                MonthRange::for_month(year, month)
                    .ok_or_else(|| AppError::BadRequest(format!("Invalid month: {month}")))?,
            )
        }
        None => None,
    };

    Ok(AppointmentFilter { status, month })
}

pub async fn list_appointments(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<DataResponse<Vec<Appointment>>>> {
    let filter = parse_filter(query.as_deref().unwrap_or(""))?;
    let rows = state.store.list_appointments(filter).await?;
    Ok(Json(DataResponse::new(rows)))
}

pub async fn get_appointment(
    State(state): State<AppState>,
    path: std::result::Result<Path<i32>, PathRejection>,
) -> Result<Json<DataResponse<Appointment>>> {
    let Path(id) = path?;
    let appointment = state
        .store
        .find_appointment(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Appointment {id} not found")))?;
    Ok(Json(DataResponse::new(appointment)))
}

pub async fn create_appointment(
    State(state): State<AppState>,
    body: std::result::Result<Json<AppointmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DataResponse<Appointment>>)> {
    let Json(request) = body?;
    request.validate()?;

    let appointment = state.store.insert_appointment(&request).await?;
    info!(
        "📅 Appointment {} scheduled for {} {}",
        appointment.id, appointment.appointment_date, appointment.appointment_time
    );
    Ok((StatusCode::CREATED, Json(DataResponse::new(appointment))))
}

pub async fn update_appointment(
    State(state): State<AppState>,
    path: std::result::Result<Path<i32>, PathRejection>,
    body: std::result::Result<Json<AppointmentRequest>, JsonRejection>,
) -> Result<Json<DataResponse<Appointment>>> {
    let Path(id) = path?;
    let Json(request) = body?;
    request.validate()?;

    let appointment = state
        .store
        .update_appointment(id, &request)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Appointment {id} not found")))?;
    Ok(Json(DataResponse::new(appointment)))
}

pub async fn update_appointment_status(
    State(state): State<AppState>,
    path: std::result::Result<Path<i32>, PathRejection>,
    body: std::result::Result<Json<AppointmentStatusUpdate>, JsonRejection>,
) -> Result<Json<DataResponse<Appointment>>> {
    let Path(id) = path?;
    let Json(update) = body?;

    let appointment = state
        .store
        .update_appointment_status(id, update.status)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Appointment {id} not found")))?;
    Ok(Json(DataResponse::new(appointment)))
}

pub async fn delete_appointment(
    State(state): State<AppState>,
    path: std::result::Result<Path<i32>, PathRejection>,
) -> Result<Json<MessageResponse>> {
    let Path(id) = path?;
    if !state.store.delete_appointment(id).await? {
        return Err(AppError::NotFound(format!("Appointment {id} not found")));
    }
    Ok(Json(MessageResponse::ok("Appointment deleted successfully")))
}
