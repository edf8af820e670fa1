//! Contact leads and the appointment agenda.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use axum::http::{Method, StatusCode};
use chrono::{NaiveDate, NaiveTime};
use serde_json::{json, Value};

use common::*;
use imoveis_backend::models::{
    Appointment, AppointmentKind, AppointmentStatus, Category, DataResponse, Lead, LeadSource,
    LeadStatus, ListResponse, Role,
};
use imoveis_backend::store::{AppointmentStore, LeadStore};

// =============================================================================
// Leads
// =============================================================================

fn contact(name: &str) -> Value {
    json!({
        "property_id": 1,
        "name": name,
        "email": "cliente@example.com",
        "phone": "82999990000",
        "message": "Tenho interesse no imóvel",
    })
}

#[tokio::test]
async fn visitors_can_leave_a_lead_without_logging_in() {
    let app = TestApp::with_properties(three_listings());

    let response = app
        .send_json(Method::POST, "/api/leads", None, contact("Joana"))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: DataResponse<Lead> = response_as(response).await;
    assert_eq!(body.data.name, "Joana");
    assert_eq!(body.data.property_id, Some(1));
    assert_eq!(body.data.source, LeadSource::Site);
    assert_eq!(body.data.status, LeadStatus::New);
}

#[tokio::test]
async fn lead_with_invalid_contact_is_rejected() {
    let app = TestApp::new();

    let mut body = contact("Joana");
    body["phone"] = json!("123");
    expect_failure(
        app.send_json(Method::POST, "/api/leads", None, body).await,
        StatusCode::BAD_REQUEST,
    )
    .await;

    let mut body = contact("Joana");
    body["email"] = json!("not-an-email");
    expect_failure(
        app.send_json(Method::POST, "/api/leads", None, body).await,
        StatusCode::BAD_REQUEST,
    )
    .await;

    assert_eq!(app.store.count_leads(None).await.unwrap(), 0);
}

#[tokio::test]
async fn listing_leads_requires_a_token() {
    let app = TestApp::new();

    expect_failure(app.get("/api/leads").await, StatusCode::UNAUTHORIZED).await;
}

#[tokio::test]
async fn leads_are_listed_newest_first_with_status_filter() {
    let app = TestApp::with_properties(three_listings());
    let (_, token) = app.token_for("carla", Role::Agent).await;

    for name in ["Ana", "Beto", "Caio"] {
        let response = app
            .send_json(Method::POST, "/api/leads", None, contact(name))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .send_json(
            Method::PUT,
            "/api/leads/2/status",
            Some(&token),
            json!({ "status": "contacted" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated: DataResponse<Lead> = response_as(response).await;
    assert_eq!(updated.data.status, LeadStatus::Contacted);

    let all: ListResponse<Lead> = response_as(app.get_authed("/api/leads", &token).await).await;
    assert_eq!(all.pagination.total, 3);
    assert_eq!(all.data.first().map(|l| l.id), Some(3));

    let fresh: ListResponse<Lead> =
        response_as(app.get_authed("/api/leads?status=new", &token).await).await;
    assert_eq!(fresh.pagination.total, 2);
    assert!(fresh.data.iter().all(|l| l.status == LeadStatus::New));

    let paged: ListResponse<Lead> =
        response_as(app.get_authed("/api/leads?limit=2&page=2", &token).await).await;
    assert_eq!(paged.data.len(), 1);
    assert_eq!(paged.pagination.total_pages, 2);
}

#[tokio::test]
async fn updating_an_unknown_lead_is_not_found() {
    let app = TestApp::new();
    let (_, token) = app.token_for("carla", Role::Agent).await;

    expect_failure(
        app.send_json(
            Method::PUT,
            "/api/leads/42/status",
            Some(&token),
            json!({ "status": "closed" }),
        )
        .await,
        StatusCode::NOT_FOUND,
    )
    .await;

    // Unknown status values never reach the store.
    expect_failure(
        app.send_json(
            Method::PUT,
            "/api/leads/42/status",
            Some(&token),
            json!({ "status": "lost" }),
        )
        .await,
        StatusCode::BAD_REQUEST,
    )
    .await;
}

#[tokio::test]
async fn lead_for_a_missing_listing_is_rejected() {
    let app = TestApp::with_properties(three_listings());

    let mut body = contact("Joana");
    body["property_id"] = json!(999);
    let failure = expect_failure(
        app.send_json(Method::POST, "/api/leads", None, body).await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(failure["message"], "Property 999 not found");
    assert_eq!(app.store.count_leads(None).await.unwrap(), 0);

    // General enquiries carry no listing at all.
    let mut body = contact("Joana");
    body["property_id"] = Value::Null;
    let response = app.send_json(Method::POST, "/api/leads", None, body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn contact_form_on_a_deleted_listing_is_rejected() {
    let app = TestApp::with_properties(three_listings());
    let (_, token) = app.token_for("dona", Role::Owner).await;

    let response = app.delete("/api/properties/1", &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    expect_failure(
        app.send_json(Method::POST, "/api/leads", None, contact("Joana"))
            .await,
        StatusCode::BAD_REQUEST,
    )
    .await;
}

#[tokio::test]
async fn deleting_a_listing_keeps_its_leads() {
    let app = TestApp::with_properties(vec![listing(1, Category::Lancamentos, 300_000, 2)]);
    let (_, token) = app.token_for("dona", Role::Owner).await;

    app.send_json(Method::POST, "/api/leads", None, contact("Joana"))
        .await;
    let response = app.delete("/api/properties/1", &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let leads = app.store.list_leads(None, 10, 0).await.unwrap();
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].property_id, None);
}

// =============================================================================
// Appointments
// =============================================================================

fn visit(date: &str, time: &str) -> Value {
    json!({
        "title": "Visita ao apartamento",
        "client_name": "Joana Lima",
        "client_phone": "82999990000",
        "client_email": "joana@example.com",
        "property_id": 1,
        "appointment_date": date,
        "appointment_time": time,
        "location": "Ponta Verde",
        "notes": "Levar chaves",
    })
}

#[tokio::test]
async fn agenda_requires_a_token() {
    let app = TestApp::new();

    expect_failure(app.get("/api/appointments").await, StatusCode::UNAUTHORIZED).await;
    expect_failure(
        app.send_json(
            Method::POST,
            "/api/appointments",
            None,
            visit("2025-03-10", "14:00:00"),
        )
        .await,
        StatusCode::UNAUTHORIZED,
    )
    .await;
}

#[tokio::test]
async fn appointment_lifecycle() {
    let app = TestApp::with_properties(three_listings());
    let (_, token) = app.token_for("carla", Role::Agent).await;

    let response = app
        .send_json(
            Method::POST,
            "/api/appointments",
            Some(&token),
            visit("2025-03-10", "14:00:00"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: DataResponse<Appointment> = response_as(response).await;
    let id = created.data.id;
    assert_eq!(created.data.status, AppointmentStatus::Pending);
    assert_eq!(created.data.kind, AppointmentKind::Visit);

    let fetched: DataResponse<Appointment> =
        response_as(app.get_authed(&format!("/api/appointments/{id}"), &token).await).await;
    assert_eq!(fetched.data, created.data);

    let response = app
        .send_json(
            Method::PATCH,
            &format!("/api/appointments/{id}/status"),
            Some(&token),
            json!({ "status": "confirmed" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // A full update without a status keeps the confirmed one.
    let mut changed = visit("2025-03-11", "09:30:00");
    changed["title"] = json!("Visita remarcada");
    let response = app
        .send_json(
            Method::PUT,
            &format!("/api/appointments/{id}"),
            Some(&token),
            changed,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated: DataResponse<Appointment> = response_as(response).await;
    assert_eq!(updated.data.title, "Visita remarcada");
    assert_eq!(updated.data.status, AppointmentStatus::Confirmed);
    assert_eq!(
        updated.data.appointment_date,
        NaiveDate::from_ymd_opt(2025, 3, 11).unwrap()
    );
    assert_eq!(
        updated.data.appointment_time,
        NaiveTime::from_hms_opt(9, 30, 0).unwrap()
    );

    let response = app
        .delete(&format!("/api/appointments/{id}"), &token)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    expect_failure(
        app.get_authed(&format!("/api/appointments/{id}"), &token).await,
        StatusCode::NOT_FOUND,
    )
    .await;
    expect_failure(
        app.delete(&format!("/api/appointments/{id}"), &token).await,
        StatusCode::NOT_FOUND,
    )
    .await;
}

#[tokio::test]
async fn appointment_for_a_missing_listing_is_rejected() {
    let app = TestApp::with_properties(three_listings());
    let (_, token) = app.token_for("carla", Role::Agent).await;

    let mut body = visit("2025-03-10", "14:00:00");
    body["property_id"] = json!(999);
    let failure = expect_failure(
        app.send_json(Method::POST, "/api/appointments", Some(&token), body)
            .await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(failure["message"], "Property 999 not found");
    assert!(app
        .store
        .list_appointments(Default::default())
        .await
        .unwrap()
        .is_empty());

    let response = app
        .send_json(
            Method::POST,
            "/api/appointments",
            Some(&token),
            visit("2025-03-10", "14:00:00"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: DataResponse<Appointment> = response_as(response).await;

    let mut moved = visit("2025-03-12", "10:00:00");
    moved["property_id"] = json!(999);
    expect_failure(
        app.send_json(
            Method::PUT,
            &format!("/api/appointments/{}", created.data.id),
            Some(&token),
            moved,
        )
        .await,
        StatusCode::BAD_REQUEST,
    )
    .await;

    let unchanged = app
        .store
        .find_appointment(created.data.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(unchanged, created.data);
}

#[tokio::test]
async fn agenda_is_chronological_and_filterable() {
    let app = TestApp::with_properties(three_listings());
    let (_, token) = app.token_for("carla", Role::Agent).await;

    for (date, time) in [
        ("2025-04-02", "10:00:00"),
        ("2025-03-15", "16:00:00"),
        ("2025-03-15", "08:00:00"),
    ] {
        let response = app
            .send_json(Method::POST, "/api/appointments", Some(&token), visit(date, time))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }
    app.store
        .update_appointment_status(1, AppointmentStatus::Cancelled)
        .await
        .unwrap();

    let all: DataResponse<Vec<Appointment>> =
        response_as(app.get_authed("/api/appointments", &token).await).await;
    let order: Vec<i32> = all.data.iter().map(|a| a.id).collect();
    assert_eq!(order, vec![3, 2, 1]);

    let march: DataResponse<Vec<Appointment>> =
        response_as(app.get_authed("/api/appointments?month=3&year=2025", &token).await).await;
    assert_eq!(march.data.len(), 2);

    let cancelled: DataResponse<Vec<Appointment>> =
        response_as(app.get_authed("/api/appointments?status=cancelled", &token).await).await;
    assert_eq!(cancelled.data.len(), 1);
    assert_eq!(cancelled.data[0].id, 1);
}

#[tokio::test]
async fn invalid_agenda_filters_are_bad_requests() {
    let app = TestApp::new();
    let (_, token) = app.token_for("carla", Role::Agent).await;

    expect_failure(
        app.get_authed("/api/appointments?status=lost", &token).await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    expect_failure(
        app.get_authed("/api/appointments?month=13", &token).await,
        StatusCode::BAD_REQUEST,
    )
    .await;
}

#[tokio::test]
async fn appointment_without_a_client_is_rejected() {
    let app = TestApp::new();
    let (_, token) = app.token_for("carla", Role::Agent).await;

    let mut body = visit("2025-03-10", "14:00:00");
    body["client_name"] = json!("");
    expect_failure(
        app.send_json(Method::POST, "/api/appointments", Some(&token), body)
            .await,
        StatusCode::BAD_REQUEST,
    )
    .await;

    assert!(app
        .store
        .list_appointments(Default::default())
        .await
        .unwrap()
        .is_empty());
}
