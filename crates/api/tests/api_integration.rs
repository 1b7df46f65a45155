//! API integration tests.
//!
//! These tests drive the router against a mock database.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
    response::Response,
};
use sea_orm::{DatabaseBackend, DbErr, MockDatabase};
use serde_json::{Value, json};
use tower::ServiceExt;
use wayfind_api::{middleware::AppState, router as api_router};
use wayfind_common::config::ListingConfig;
use wayfind_core::PlaceService;
use wayfind_db::entities::{review, user};
use wayfind_db::repositories::{PlaceRepository, ReviewRepository, UserRepository};
use wayfind_db::test_utils::fixtures;

/// Create a router backed by the given mock database.
fn create_test_router(db: MockDatabase) -> Router {
    let db = Arc::new(db.into_connection());
    let place_service = PlaceService::new(
        PlaceRepository::new(Arc::clone(&db)),
        ReviewRepository::new(Arc::clone(&db)),
        UserRepository::new(db),
        ListingConfig::default(),
    );

    Router::new()
        .nest("/api", api_router())
        .with_state(AppState::new(place_service))
}

async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_list_places_envelope() {
    let owner = fixtures::user("hoa");
    let mut owned = fixtures::place("Tranquil Books & Coffee");
    owned.created_by = owner.id.clone();
    let orphan = fixtures::place("Hidden Gem");

    let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results([
        vec![
            fixtures::listing_row(&owned, None, Some(&owner)),
            fixtures::listing_row(&orphan, None, None),
        ],
        vec![fixtures::count_row(2)],
    ]);

    let response = get(create_test_router(db), "/api/places?limit=5&sort=-rating").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(
        body["data"]["pagination"],
        json!({ "current": 1, "pages": 1, "total": 2, "limit": 5 })
    );

    let places = body["data"]["places"].as_array().unwrap();
    assert_eq!(places.len(), 2);
    assert_eq!(places[0]["name"], "Tranquil Books & Coffee");
    assert_eq!(places[0]["createdBy"]["username"], "hoa");
    assert!(places[0].get("distance").is_none());
    assert!(places[1]["createdBy"].is_null());
}

#[tokio::test]
async fn test_geo_listing_includes_distance() {
    let place = fixtures::place("Near The Lake");

    let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results([
        vec![fixtures::listing_row(&place, Some(412.5), None)],
        vec![fixtures::count_row(1)],
    ]);

    let response = get(
        create_test_router(db),
        "/api/places?lat=21.0285&lng=105.8542&radius=1",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["places"][0]["distance"], 412.5);
}

#[tokio::test]
async fn test_list_places_invalid_page() {
    let response = get(
        create_test_router(MockDatabase::new(DatabaseBackend::Postgres)),
        "/api/places?page=0",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_list_places_non_numeric_limit() {
    let response = get(
        create_test_router(MockDatabase::new(DatabaseBackend::Postgres)),
        "/api/places?limit=ten",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_list_places_unknown_feature() {
    let response = get(
        create_test_router(MockDatabase::new(DatabaseBackend::Postgres)),
        "/api/places?features=wifi,helipad",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_places_database_error_is_not_leaked() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_errors([DbErr::Custom("password authentication failed".to_string())]);

    let response = get(create_test_router(db), "/api/places").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "DATABASE_ERROR");
    assert_eq!(body["message"], "Internal server error");
}

#[tokio::test]
async fn test_get_place_malformed_id() {
    let response = get(
        create_test_router(MockDatabase::new(DatabaseBackend::Postgres)),
        "/api/places/not-a-place",
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["error"], "PLACE_NOT_FOUND");
}

#[tokio::test]
async fn test_get_place_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<wayfind_db::entities::place::Model>::new()]);

    let response = get(create_test_router(db), "/api/places/01hzy8k3v6m2a9d4q7r1t5w8xy").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_place_with_reviews() {
    let owner = fixtures::user("khanh");
    let mut place = fixtures::place("Note Coffee");
    place.created_by = owner.id.clone();
    place.view_count = 41;
    let mut review = fixtures::review(&place.id, "reviewer", 5);
    review.helpful_users = json!(["u1", "u2"]);
    review.helpful_count = 2;

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[place.clone()]])
        .append_query_results([[owner]])
        .append_query_results([[review]]);

    let response = get(create_test_router(db), &format!("/api/places/{}", place.id)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["place"]["id"], place.id);
    assert_eq!(body["data"]["place"]["viewCount"], 41);
    assert_eq!(body["data"]["place"]["createdBy"]["username"], "khanh");
    assert_eq!(body["data"]["reviews"][0]["helpful"]["count"], 2);
    assert_eq!(body["data"]["reviews"][0]["rating"], 5);
}

#[tokio::test]
async fn test_get_inactive_place_is_still_served() {
    let mut place = fixtures::place("Closed For Good");
    place.is_active = false;

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[place.clone()]])
        .append_query_results([Vec::<user::Model>::new()])
        .append_query_results([Vec::<review::Model>::new()]);

    let response = get(create_test_router(db), &format!("/api/places/{}", place.id)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!(body["data"]["place"]["createdBy"].is_null());
    assert_eq!(body["data"]["reviews"], json!([]));
}
