//! Property search, detail and listing management over HTTP.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::collections::BTreeMap;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use rust_decimal::Decimal;
use serde_json::json;
use tower::ServiceExt;

use common::*;
use imoveis_backend::models::{
    Category, CreatedProperty, DataResponse, ListResponse, Pagination, Property, PropertyStatus,
    Role,
};
use imoveis_backend::store::PropertyStore;

// =============================================================================
// Search
// =============================================================================

#[tokio::test]
async fn search_defaults_to_available_listings_in_default_city() {
    let mut sold = listing(4, Category::Lancamentos, 350_000, 2);
    sold.status = PropertyStatus::Sold;
    let mut elsewhere = listing(5, Category::BeiraMar, 420_000, 3);
    elsewhere.city = "Recife".to_string();

    let mut properties = three_listings();
    properties.extend([sold, elsewhere]);
    let app = TestApp::with_properties(properties);

    let response = app.get("/api/properties").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: ListResponse<Property> = response_as(response).await;
    assert!(body.success);
    assert_eq!(body.pagination.total, 3);
    assert_eq!(body.pagination.limit, 12);
    assert!(body
        .data
        .iter()
        .all(|p| p.city == "Maceió" && p.status == PropertyStatus::Available));
}

#[tokio::test]
async fn search_all_lifts_city_and_status_defaults() {
    let mut sold = listing(4, Category::Lancamentos, 350_000, 2);
    sold.status = PropertyStatus::Sold;
    let mut elsewhere = listing(5, Category::BeiraMar, 420_000, 3);
    elsewhere.city = "Recife".to_string();
    let mut properties = three_listings();
    properties.extend([sold, elsewhere]);
    let app = TestApp::with_properties(properties);

    let body: ListResponse<Property> =
        response_as(app.get("/api/properties?city=all&status=all").await).await;
    assert_eq!(body.pagination.total, 5);
}

#[tokio::test]
async fn category_search_sorted_by_price_desc() {
    let app = TestApp::with_properties(three_listings());

    let response = app
        .get("/api/properties?category=lancamentos&sort=price_desc&page=1&limit=10")
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: ListResponse<Property> = response_as(response).await;
    assert_eq!(ids(&body.data), vec![2, 1]);
    assert_eq!(
        body.pagination,
        Pagination {
            page: 1,
            limit: 10,
            total: 2,
            total_pages: 1,
        }
    );
}

#[tokio::test]
async fn pagination_serializes_total_pages_in_camel_case() {
    let app = TestApp::with_properties(three_listings());

    let body = response_json(app.get("/api/properties?limit=2").await).await;
    assert_eq!(body["pagination"]["totalPages"], 2);
    assert_eq!(body["pagination"]["total"], 3);
    assert!(body["pagination"].get("total_pages").is_none());
}

#[tokio::test]
async fn price_min_uses_default_recent_order() {
    let app = TestApp::with_properties(three_listings());

    let body: ListResponse<Property> = response_as(app.get("/api/properties?price_min=400000").await).await;
    assert_eq!(ids(&body.data), vec![2, 3]);
    assert_eq!(body.pagination.total, 2);
}

#[tokio::test]
async fn price_range_is_inclusive() {
    let app = TestApp::with_properties(three_listings());

    let body: ListResponse<Property> = response_as(
        app.get("/api/properties?price_min=300000&price_max=500000&sort=price_asc")
            .await,
    )
    .await;
    assert_eq!(ids(&body.data), vec![1, 2]);
}

#[tokio::test]
async fn invalid_numbers_are_ignored() {
    let app = TestApp::with_properties(three_listings());

    let response = app
        .get("/api/properties?price_min=abc&bedrooms=lots&page=zero")
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: ListResponse<Property> = response_as(response).await;
    assert_eq!(body.pagination.total, 3);
    assert_eq!(body.pagination.page, 1);
}

#[tokio::test]
async fn price_asc_is_non_decreasing_and_rent_only_listings_sort_by_rent() {
    let mut rental = listing(4, Category::ProntoMorar, 0, 1);
    rental.sale_price = None;
    rental.rent_price = Some(Decimal::from(2_500));
    let mut properties = three_listings();
    properties.push(rental);
    let app = TestApp::with_properties(properties);

    let body: ListResponse<Property> = response_as(app.get("/api/properties?sort=price_asc").await).await;
    assert_eq!(ids(&body.data), vec![4, 1, 2, 3]);

    let prices: Vec<Decimal> = body.data.iter().filter_map(Property::active_price).collect();
    assert!(prices.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn bedroom_buckets_match_exactly_below_the_top() {
    let mut properties = three_listings();
    properties.push(listing(4, Category::MaisProcurados, 1_200_000, 6));
    let app = TestApp::with_properties(properties);

    let body: ListResponse<Property> = response_as(app.get("/api/properties?bedrooms=3").await).await;
    assert_eq!(ids(&body.data), vec![2]);

    // The top bucket reads "4 or more".
    let body: ListResponse<Property> = response_as(app.get("/api/properties?bedrooms=4").await).await;
    let mut found = ids(&body.data);
    found.sort_unstable();
    assert_eq!(found, vec![3, 4]);
}

#[tokio::test]
async fn neighborhood_matches_case_insensitive_substring() {
    let mut properties = three_listings();
    properties[0].neighborhood = Some("Jatiúca".to_string());
    let app = TestApp::with_properties(properties);

    let body: ListResponse<Property> = response_as(app.get("/api/properties?neighborhood=ponta").await).await;
    let mut found = ids(&body.data);
    found.sort_unstable();
    assert_eq!(found, vec![2, 3]);
}

#[tokio::test]
async fn page_sizes_respect_total() {
    let properties = (1..=5)
        .map(|id| listing(id, Category::Lancamentos, 100_000 * i64::from(id), 2))
        .collect();
    let app = TestApp::with_properties(properties);

    let body: ListResponse<Property> = response_as(app.get("/api/properties?limit=2&page=3").await).await;
    assert_eq!(body.data.len(), 1);
    assert_eq!(body.pagination.total, 5);
    assert_eq!(body.pagination.total_pages, 3);

    let body: ListResponse<Property> = response_as(app.get("/api/properties?limit=2&page=4").await).await;
    assert!(body.data.is_empty());
    assert_eq!(body.pagination.total, 5);
}

#[tokio::test]
async fn total_does_not_depend_on_the_page_window() {
    let properties = (1..=7)
        .map(|id| listing(id, Category::Lancamentos, 100_000 * i64::from(id), 2))
        .collect();
    let app = TestApp::with_properties(properties);

    for (page, limit) in [(1, 1), (2, 3), (3, 3), (9, 2), (1, 50)] {
        let body: ListResponse<Property> =
            response_as(app.get(&format!("/api/properties?page={page}&limit={limit}")).await).await;
        assert_eq!(body.pagination.total, 7);
        let expected = (7 - (page - 1) * limit).clamp(0, limit);
        assert_eq!(body.data.len() as i64, expected);
    }
}

#[tokio::test]
async fn limit_is_capped() {
    let app = TestApp::with_properties(three_listings());

    let body: ListResponse<Property> = response_as(app.get("/api/properties?limit=10000").await).await;
    assert_eq!(body.pagination.limit, 50);
}

#[tokio::test]
async fn empty_result_has_zero_pages() {
    let app = TestApp::with_properties(three_listings());

    let body: ListResponse<Property> =
        response_as(app.get("/api/properties?category=pronto-morar").await).await;
    assert!(body.data.is_empty());
    assert_eq!(body.pagination.total, 0);
    assert_eq!(body.pagination.total_pages, 0);
}

#[tokio::test]
async fn home_highlights_group_by_category() {
    let app = TestApp::with_properties(three_listings());

    let response = app.get("/api/properties/home").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: DataResponse<BTreeMap<String, Vec<Property>>> = response_as(response).await;
    assert_eq!(ids(&body.data["lancamentos"]), vec![2, 1]);
    assert_eq!(ids(&body.data["beira-mar"]), vec![3]);
    assert!(body.data["pronto-morar"].is_empty());
    assert!(body.data["mais-procurados"].is_empty());
}

// =============================================================================
// Detail
// =============================================================================

#[tokio::test]
async fn missing_property_is_not_found() {
    let app = TestApp::with_properties(three_listings());

    expect_failure(app.get("/api/properties/999").await, StatusCode::NOT_FOUND).await;
}

#[tokio::test]
async fn malformed_id_is_bad_request() {
    let app = TestApp::with_properties(three_listings());

    expect_failure(app.get("/api/properties/abc").await, StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
async fn each_detail_read_counts_a_view() {
    let app = TestApp::with_properties(three_listings());

    let mut last = None;
    for _ in 0..3 {
        let response = app.get("/api/properties/2").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: DataResponse<Property> = response_as(response).await;
        last = Some(body.data.views);
    }
    assert_eq!(last, Some(3));

    let stored = app.store.find_property(2).await.unwrap().unwrap();
    assert_eq!(stored.views, 3);

    // Searching does not count views.
    app.get("/api/properties?category=lancamentos").await;
    let stored = app.store.find_property(2).await.unwrap().unwrap();
    assert_eq!(stored.views, 3);
}

#[tokio::test]
async fn concurrent_detail_reads_all_count() {
    let app = TestApp::with_properties(three_listings());

    let mut handles = Vec::new();
    for _ in 0..20 {
        let router = app.router.clone();
        handles.push(tokio::spawn(async move {
            let request = Request::get("/api/properties/1").body(Body::empty()).unwrap();
            router.oneshot(request).await.unwrap().status()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    let stored = app.store.find_property(1).await.unwrap().unwrap();
    assert_eq!(stored.views, 20);
}

// =============================================================================
// Create / update / delete
// =============================================================================

fn draft() -> serde_json::Value {
    json!({
        "title": "Cobertura na Pajuçara",
        "description": "Vista para o mar",
        "category": "beira-mar",
        "property_type": "apartment",
        "neighborhood": "Pajuçara",
        "bedrooms": 3,
        "sale_price": 780000,
    })
}

#[tokio::test]
async fn create_requires_a_token() {
    let app = TestApp::new();

    expect_failure(
        app.send_json(Method::POST, "/api/properties", None, draft()).await,
        StatusCode::UNAUTHORIZED,
    )
    .await;
}

#[tokio::test]
async fn create_rejects_a_forged_token() {
    let app = TestApp::new();

    expect_failure(
        app.send_json(Method::POST, "/api/properties", Some("not.a.token"), draft())
            .await,
        StatusCode::FORBIDDEN,
    )
    .await;
}

#[tokio::test]
async fn created_listing_is_searchable() {
    let app = TestApp::new();
    let (agent, token) = app.token_for("carla", Role::Agent).await;

    let response = app
        .send_json(Method::POST, "/api/properties", Some(&token), draft())
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: DataResponse<CreatedProperty> = response_as(response).await;
    assert!(created.success);

    let stored = app.store.find_property(created.data.id).await.unwrap().unwrap();
    assert_eq!(stored.created_by, Some(agent.id));
    assert_eq!(stored.city, "Maceió");
    assert_eq!(stored.status, PropertyStatus::Available);
    assert_eq!(stored.views, 0);

    let body: ListResponse<Property> = response_as(app.get("/api/properties?category=beira-mar").await).await;
    assert_eq!(ids(&body.data), vec![created.data.id]);
}

#[tokio::test]
async fn create_without_any_price_adds_nothing() {
    let app = TestApp::with_properties(three_listings());
    let (_, token) = app.token_for("carla", Role::Agent).await;

    let mut body = draft();
    body.as_object_mut().unwrap().remove("sale_price");

    expect_failure(
        app.send_json(Method::POST, "/api/properties", Some(&token), body).await,
        StatusCode::BAD_REQUEST,
    )
    .await;

    let listed: ListResponse<Property> = response_as(app.get("/api/properties").await).await;
    assert_eq!(listed.pagination.total, 3);
}

#[tokio::test]
async fn create_with_unknown_category_is_rejected() {
    let app = TestApp::new();
    let (_, token) = app.token_for("carla", Role::Agent).await;

    let mut body = draft();
    body["category"] = json!("cobertura");

    expect_failure(
        app.send_json(Method::POST, "/api/properties", Some(&token), body).await,
        StatusCode::BAD_REQUEST,
    )
    .await;
}

#[tokio::test]
async fn creating_a_listing_refreshes_home_highlights() {
    let app = TestApp::new();
    let (_, token) = app.token_for("carla", Role::Agent).await;

    let before: DataResponse<BTreeMap<String, Vec<Property>>> =
        response_as(app.get("/api/properties/home").await).await;
    assert!(before.data["beira-mar"].is_empty());

    app.send_json(Method::POST, "/api/properties", Some(&token), draft())
        .await;

    let after: DataResponse<BTreeMap<String, Vec<Property>>> =
        response_as(app.get("/api/properties/home").await).await;
    assert_eq!(after.data["beira-mar"].len(), 1);
}

#[tokio::test]
async fn creator_can_update_own_listing() {
    let app = TestApp::new();
    let (agent, token) = app.token_for("carla", Role::Agent).await;
    let mut property = listing(1, Category::Lancamentos, 300_000, 2);
    property.created_by = Some(agent.id);
    app.store.seed_property(property).unwrap();

    let response = app
        .send_json(
            Method::PUT,
            "/api/properties/1",
            Some(&token),
            json!({ "title": "Novo título", "sale_price": 320000, "description": null }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);

    let stored = app.store.find_property(1).await.unwrap().unwrap();
    assert_eq!(stored.title, "Novo título");
    assert_eq!(stored.sale_price, Some(Decimal::from(320_000)));
    assert_eq!(stored.bedrooms, 2);
    assert!(stored.updated_at >= stored.created_at);
}

#[tokio::test]
async fn agent_cannot_modify_someone_elses_listing() {
    let app = TestApp::new();
    let (owner_agent, _) = app.token_for("carla", Role::Agent).await;
    let (_, other_token) = app.token_for("bruno", Role::Agent).await;
    let mut property = listing(1, Category::Lancamentos, 300_000, 2);
    property.created_by = Some(owner_agent.id);
    app.store.seed_property(property).unwrap();

    expect_failure(
        app.send_json(
            Method::PUT,
            "/api/properties/1",
            Some(&other_token),
            json!({ "title": "Invasão" }),
        )
        .await,
        StatusCode::FORBIDDEN,
    )
    .await;
    expect_failure(
        app.delete("/api/properties/1", &other_token).await,
        StatusCode::FORBIDDEN,
    )
    .await;

    let stored = app.store.find_property(1).await.unwrap().unwrap();
    assert_eq!(stored.title, "Imóvel 1");
}

#[tokio::test]
async fn admin_can_modify_any_listing() {
    let app = TestApp::new();
    let (agent, _) = app.token_for("carla", Role::Agent).await;
    let (_, admin_token) = app.token_for("diretoria", Role::Admin).await;
    let mut property = listing(1, Category::Lancamentos, 300_000, 2);
    property.created_by = Some(agent.id);
    app.store.seed_property(property).unwrap();

    let response = app
        .send_json(
            Method::PUT,
            "/api/properties/1",
            Some(&admin_token),
            json!({ "status": "sold" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let stored = app.store.find_property(1).await.unwrap().unwrap();
    assert_eq!(stored.status, PropertyStatus::Sold);
}

#[tokio::test]
async fn update_cannot_remove_the_last_price() {
    let app = TestApp::with_properties(three_listings());
    let (_, token) = app.token_for("dona", Role::Owner).await;

    expect_failure(
        app.send_json(
            Method::PUT,
            "/api/properties/1",
            Some(&token),
            json!({ "sale_price": null }),
        )
        .await,
        StatusCode::BAD_REQUEST,
    )
    .await;

    // Swapping sale for rent is fine.
    let response = app
        .send_json(
            Method::PUT,
            "/api/properties/1",
            Some(&token),
            json!({ "sale_price": null, "rent_price": 3200 }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn empty_update_is_rejected() {
    let app = TestApp::with_properties(three_listings());
    let (_, token) = app.token_for("dona", Role::Owner).await;

    expect_failure(
        app.send_json(Method::PUT, "/api/properties/1", Some(&token), json!({}))
            .await,
        StatusCode::BAD_REQUEST,
    )
    .await;
}

#[tokio::test]
async fn updating_a_missing_listing_is_not_found() {
    let app = TestApp::with_properties(three_listings());
    let (_, token) = app.token_for("dona", Role::Owner).await;

    expect_failure(
        app.send_json(
            Method::PUT,
            "/api/properties/999",
            Some(&token),
            json!({ "title": "x" }),
        )
        .await,
        StatusCode::NOT_FOUND,
    )
    .await;
}

#[tokio::test]
async fn deleted_listing_is_gone() {
    let app = TestApp::with_properties(three_listings());
    let (_, token) = app.token_for("dona", Role::Owner).await;

    let response = app.delete("/api/properties/2", &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    expect_failure(app.get("/api/properties/2").await, StatusCode::NOT_FOUND).await;
    expect_failure(
        app.delete("/api/properties/2", &token).await,
        StatusCode::NOT_FOUND,
    )
    .await;

    let body: ListResponse<Property> = response_as(app.get("/api/properties").await).await;
    assert_eq!(body.pagination.total, 2);
}
