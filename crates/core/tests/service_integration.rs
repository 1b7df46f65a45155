//! Place service integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test -p wayfind-core --test service_integration -- --ignored`
//!
//! Connection settings come from the `TEST_DB_*` environment variables read by
//! `wayfind_db::test_utils::TestDbConfig`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use sea_orm::{EntityTrait, IntoActiveModel};
use wayfind_common::config::ListingConfig;
use wayfind_core::{ListPlacesQuery, PlaceService};
use wayfind_db::entities::{Place, User, place};
use wayfind_db::repositories::{PlaceRepository, ReviewRepository, UserRepository};
use wayfind_db::test_utils::{TestDatabase, fixtures};

async fn migrated_database() -> TestDatabase {
    let db = TestDatabase::create_unique()
        .await
        .expect("Failed to create database");
    wayfind_db::migrate(db.connection())
        .await
        .expect("Failed to migrate");
    db
}

async fn insert_place(db: &TestDatabase, model: place::Model) -> place::Model {
    Place::insert(model.clone().into_active_model())
        .exec(db.connection())
        .await
        .expect("Failed to insert place");
    model
}

fn service(db: &TestDatabase) -> PlaceService {
    PlaceService::new(
        PlaceRepository::new(db.shared()),
        ReviewRepository::new(db.shared()),
        UserRepository::new(db.shared()),
        ListingConfig::default(),
    )
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_soft_deleted_place_is_hidden_from_listing_but_fetchable() {
    let db = migrated_database().await;

    let owner = fixtures::user("hoa");
    User::insert(owner.clone().into_active_model())
        .exec(db.connection())
        .await
        .unwrap();
    let mut open = fixtures::place("Cafe Mo");
    open.created_by = owner.id.clone();
    let open = insert_place(&db, open).await;
    let mut closed = fixtures::place("Cafe Dong Cua");
    closed.is_active = false;
    let closed = insert_place(&db, closed).await;

    let service = service(&db);

    let listing = service.list(&ListPlacesQuery::default()).await.unwrap();
    let names: Vec<_> = listing.places.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Cafe Mo"]);
    assert_eq!(listing.pagination.total, 1);
    assert_eq!(listing.pagination.pages, 1);
    assert_eq!(listing.places[0].owner_username.as_deref(), Some("hoa"));

    let nearby = ListPlacesQuery {
        lat: Some(open.lat),
        lng: Some(open.lng),
        radius: Some(1.0),
        ..Default::default()
    };
    let listing = service.list(&nearby).await.unwrap();
    assert_eq!(listing.places.len(), 1);
    assert_eq!(listing.places[0].id, open.id);
    assert!(listing.places[0].distance.is_some());

    let detail = service.get(&closed.id).await.unwrap();
    assert_eq!(detail.place.id, closed.id);
    assert!(!detail.place.is_active);
    assert!(detail.owner.is_none());

    drop(service);
    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_each_fetch_adds_one_stored_view() {
    let db = migrated_database().await;
    let stored = insert_place(&db, fixtures::place("Bun Cha Huong Lien")).await;
    assert_eq!(stored.view_count, 0);

    let service = service(&db);
    let first = service.get(&stored.id).await.unwrap();
    let second = service.get(&stored.id).await.unwrap();

    assert_eq!(first.place.view_count, 1);
    assert_eq!(second.place.view_count, 2);

    let reread = Place::find_by_id(stored.id.clone())
        .one(db.connection())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reread.view_count, 2);

    drop(service);
    db.drop_database().await.unwrap();
}
