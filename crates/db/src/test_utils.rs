//! Test utilities for database operations.
//!
//! Provides helpers for setting up and tearing down test databases, plus
//! model fixtures shared by the mock-backed tests of dependent crates.

use std::sync::Arc;

use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr, Statement};
use tracing::info;

/// Test database configuration.
#[derive(Debug, Clone)]
pub struct TestDbConfig {
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Database username.
    pub username: String,
    /// Database password.
    pub password: String,
    /// Database name.
    pub database: String,
}

impl Default for TestDbConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("TEST_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("TEST_DB_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5433),
            username: std::env::var("TEST_DB_USER").unwrap_or_else(|_| "wayfind_test".to_string()),
            password: std::env::var("TEST_DB_PASSWORD")
                .unwrap_or_else(|_| "wayfind_test".to_string()),
            database: std::env::var("TEST_DB_NAME").unwrap_or_else(|_| "wayfind_test".to_string()),
        }
    }
}

impl TestDbConfig {
    /// Get the database URL.
    #[must_use]
    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }

    /// Get URL for connecting to postgres database (for creating test DB).
    #[must_use]
    pub fn postgres_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/postgres",
            self.username, self.password, self.host, self.port
        )
    }
}

/// A test database context that manages the lifecycle of a test database.
pub struct TestDatabase {
    conn: Arc<DatabaseConnection>,
    /// Database configuration.
    pub config: TestDbConfig,
}

impl TestDatabase {
    /// Connect to an existing test database.
    pub async fn with_config(config: TestDbConfig) -> Result<Self, DbErr> {
        let conn = Database::connect(&config.database_url()).await?;

        info!(database = %config.database, "Connected to test database");

        Ok(Self {
            conn: Arc::new(conn),
            config,
        })
    }

    /// Create a unique test database (for parallel tests).
    pub async fn create_unique() -> Result<Self, DbErr> {
        let mut config = TestDbConfig::default();
        let unique_suffix = uuid::Uuid::new_v4().to_string().replace('-', "_");
        config.database = format!("wayfind_test_{}", &unique_suffix[..8]);

        // Connect to postgres to create the database
        let postgres_conn = Database::connect(&config.postgres_url()).await?;

        let create_db = format!("CREATE DATABASE \"{}\"", config.database);
        postgres_conn
            .execute(Statement::from_string(DatabaseBackend::Postgres, create_db))
            .await?;

        postgres_conn.close().await?;

        let db = Self::with_config(config).await?;
        info!(database = %db.config.database, "Created unique test database");
        Ok(db)
    }

    /// Get the database connection.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Shared handle for repositories.
    #[must_use]
    pub fn shared(&self) -> Arc<DatabaseConnection> {
        Arc::clone(&self.conn)
    }

    /// Drop the test database (for unique databases).
    ///
    /// Handles returned by [`Self::shared`] that are still alive lose their
    /// connections.
    pub async fn drop_database(self) -> Result<(), DbErr> {
        if let Ok(conn) = Arc::try_unwrap(self.conn) {
            conn.close().await?;
        }

        // Connect to postgres to drop the database
        let postgres_conn = Database::connect(&self.config.postgres_url()).await?;

        // Terminate all connections to the database
        let terminate = format!(
            "SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = '{}'",
            self.config.database
        );
        postgres_conn
            .execute(Statement::from_string(DatabaseBackend::Postgres, terminate))
            .await
            .ok(); // Ignore errors

        let drop_db = format!("DROP DATABASE IF EXISTS \"{}\"", self.config.database);
        postgres_conn
            .execute(Statement::from_string(DatabaseBackend::Postgres, drop_db))
            .await?;

        postgres_conn.close().await?;

        info!(database = %self.config.database, "Dropped test database");
        Ok(())
    }
}

/// Model fixtures and mock rows for tests.
pub mod fixtures {
    use std::collections::BTreeMap;

    use chrono::Utc;
    use sea_orm::Value;
    use sea_orm::prelude::DateTimeWithTimeZone;
    use sea_orm::ActiveEnum;
    use serde_json::json;
    use wayfind_common::IdGenerator;

    use crate::entities::{place, review, user};

    fn now() -> DateTimeWithTimeZone {
        Utc::now().fixed_offset()
    }

    /// A user with a fresh ID.
    #[must_use]
    pub fn user(username: &str) -> user::Model {
        user::Model {
            id: IdGenerator::new().generate(),
            username: username.to_string(),
            name: Some(format!("{username} (display)")),
            avatar_url: None,
            created_at: now(),
        }
    }

    /// An active cafe in central Hanoi with a fresh ID.
    #[must_use]
    pub fn place(name: &str) -> place::Model {
        place::Model {
            id: IdGenerator::new().generate(),
            name: name.to_string(),
            description: Some("Egg coffee and quiet corners".to_string()),
            category: place::PlaceCategory::Cafe,
            subcategory: Some("coffee".to_string()),
            address_street: Some("39 Nguyen Huu Huan".to_string()),
            address_city: Some("Hanoi".to_string()),
            lat: 21.0337,
            lng: 105.8531,
            min_price: 30_000.0,
            max_price: 80_000.0,
            rating_average: 4.5,
            rating_count: 12,
            wifi: true,
            parking: false,
            air_conditioning: true,
            outdoor: false,
            pet_friendly: false,
            delivery: false,
            takeaway: true,
            card_payment: true,
            tags: json!(["coffee", "quiet"]),
            is_active: true,
            created_by: IdGenerator::new().generate(),
            view_count: 0,
            created_at: now(),
            updated_at: None,
        }
    }

    /// An active review with a fresh ID.
    #[must_use]
    pub fn review(place_id: &str, user_id: &str, rating: i16) -> review::Model {
        review::Model {
            id: IdGenerator::new().generate(),
            place_id: place_id.to_string(),
            user_id: user_id.to_string(),
            rating,
            title: Some("Worth a visit".to_string()),
            comment: None,
            helpful_users: json!([]),
            helpful_count: 0,
            is_active: true,
            created_at: now(),
            updated_at: None,
        }
    }

    /// Mock row shaped like a projected listing row.
    #[must_use]
    pub fn listing_row(
        place: &place::Model,
        distance: Option<f64>,
        owner: Option<&user::Model>,
    ) -> BTreeMap<String, Value> {
        let values: [(&str, Value); 30] = [
            ("id", place.id.clone().into()),
            ("name", place.name.clone().into()),
            ("description", place.description.clone().into()),
            ("category", place.category.to_value().into()),
            ("subcategory", place.subcategory.clone().into()),
            ("address_street", place.address_street.clone().into()),
            ("address_city", place.address_city.clone().into()),
            ("lat", place.lat.into()),
            ("lng", place.lng.into()),
            ("min_price", place.min_price.into()),
            ("max_price", place.max_price.into()),
            ("rating_average", place.rating_average.into()),
            ("rating_count", place.rating_count.into()),
            ("wifi", place.wifi.into()),
            ("parking", place.parking.into()),
            ("air_conditioning", place.air_conditioning.into()),
            ("outdoor", place.outdoor.into()),
            ("pet_friendly", place.pet_friendly.into()),
            ("delivery", place.delivery.into()),
            ("takeaway", place.takeaway.into()),
            ("card_payment", place.card_payment.into()),
            ("tags", place.tags.clone().into()),
            ("created_by", place.created_by.clone().into()),
            ("view_count", place.view_count.into()),
            ("created_at", place.created_at.into()),
            ("distance", distance.into()),
            ("owner_id", owner.map(|u| u.id.clone()).into()),
            ("owner_username", owner.map(|u| u.username.clone()).into()),
            ("owner_name", owner.and_then(|u| u.name.clone()).into()),
            ("owner_avatar_url", owner.and_then(|u| u.avatar_url.clone()).into()),
        ];

        values
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect()
    }

    /// Mock row for a count pipeline.
    #[must_use]
    pub fn count_row(total: i64) -> BTreeMap<String, Value> {
        BTreeMap::from([("total".to_string(), Value::BigInt(Some(total)))])
    }
}
