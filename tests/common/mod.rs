//! Shared test infrastructure for the HTTP integration tests.
//!
//! Every test builds its own router over a fresh in-memory store, so tests
//! run in parallel without sharing state.

#![allow(clippy::unwrap_used, clippy::expect_used)]
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tower::ServiceExt;

use imoveis_backend::auth::hash_password;
use imoveis_backend::config::{AppConfig, SearchConfig};
use imoveis_backend::models::{Category, Property, PropertyStatus, Role, User};
use imoveis_backend::store::{MemoryStore, UserStore};
use imoveis_backend::{build_router, AppState};

pub const TEST_SECRET: &str = "integration-test-secret";

pub fn test_config() -> AppConfig {
    AppConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: None,
        database_max_connections: 1,
        skip_migrations: true,
        jwt_secret: TEST_SECRET.to_string(),
        token_ttl_days: 7,
        allowed_origins: Vec::new(),
        login_rate_limit: false,
        search: SearchConfig::default(),
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), &config);
        let router = build_router(state.clone(), &config);
        Self {
            router,
            state,
            store,
        }
    }

    /// App preloaded with the given listings.
    pub fn with_properties(properties: Vec<Property>) -> Self {
        let app = Self::new();
        for property in properties {
            app.store.seed_property(property).unwrap();
        }
        app
    }

    /// Creates a user whose password is `password`. Argon2 hashing is slow
    /// in debug builds; use [`TestApp::token_for`] when the password is
    /// never checked.
    pub async fn user_with_password(&self, username: &str, password: &str, role: Role) -> User {
        let hash = hash_password(password).unwrap();
        self.store.upsert_user(username, &hash, role).await.unwrap()
    }

    /// Creates a user and returns it with a signed bearer token.
    pub async fn token_for(&self, username: &str, role: Role) -> (User, String) {
        let user = self
            .store
            .upsert_user(username, "not-a-real-hash", role)
            .await
            .unwrap();
        let token = self.state.tokens.issue(&user).unwrap();
        (user, token)
    }

    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.request(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn get_authed(&self, uri: &str, token: &str) -> Response {
        self.request(
            Request::get(uri)
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn send_json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Value,
    ) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.request(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Response {
        self.request(
            Request::delete(uri)
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn response_as<T: DeserializeOwned>(response: Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Asserts the status and returns the `{ success, message }` body.
pub async fn expect_failure(response: Response, status: StatusCode) -> Value {
    assert_eq!(response.status(), status);
    let body = response_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["message"].is_string());
    body
}

pub fn day(n: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
        + Duration::days(n)
}

pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// An available listing in Maceió with the given sale price.
pub fn listing(id: i32, category: Category, sale_price: i64, bedrooms: i32) -> Property {
    Property {
        id,
        title: format!("Imóvel {id}"),
        description: None,
        category,
        property_type: "apartment".to_string(),
        status: PropertyStatus::Available,
        address: None,
        neighborhood: Some("Ponta Verde".to_string()),
        city: "Maceió".to_string(),
        state: "AL".to_string(),
        zip_code: None,
        bedrooms,
        bathrooms: 1,
        suites: 0,
        parking_spaces: 1,
        total_area: None,
        built_area: None,
        sale_price: Some(Decimal::from(sale_price)),
        rent_price: None,
        condo_fee: None,
        iptu: None,
        features: Vec::new(),
        nearby_places: Vec::new(),
        main_image: None,
        images: Vec::new(),
        video_url: None,
        virtual_tour_url: None,
        views: 0,
        is_featured: false,
        created_by: None,
        created_at: day(i64::from(id)),
        updated_at: day(i64::from(id)),
        published_at: Some(day(i64::from(id))),
    }
}

/// Three listings: two launches and one beachfront. Listing 2 is the newest,
/// listing 3 was published between 1 and 2.
pub fn three_listings() -> Vec<Property> {
    let first = listing(1, Category::Lancamentos, 300_000, 2);
    let mut second = listing(2, Category::Lancamentos, 500_000, 3);
    second.created_at = day(30);
    second.updated_at = day(30);
    let mut third = listing(3, Category::BeiraMar, 900_000, 4);
    third.created_at = day(20);
    third.updated_at = day(20);
    vec![first, second, third]
}

pub fn ids(properties: &[Property]) -> Vec<i32> {
    properties.iter().map(|p| p.id).collect()
}
