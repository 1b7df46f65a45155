//! Place repository.

use std::sync::Arc;

use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, QueryFilter,
    prelude::DateTimeWithTimeZone, sea_query::Expr,
};
use serde_json::Value as JsonValue;
use tracing::debug;
use wayfind_common::{AppError, AppResult};

use crate::entities::{Place, place};
use crate::pipeline::Pipeline;

/// Place columns returned by listings.
pub const LISTING_FIELDS: [place::Column; 25] = [
    place::Column::Id,
    place::Column::Name,
    place::Column::Description,
    place::Column::Category,
    place::Column::Subcategory,
    place::Column::AddressStreet,
    place::Column::AddressCity,
    place::Column::Lat,
    place::Column::Lng,
    place::Column::MinPrice,
    place::Column::MaxPrice,
    place::Column::RatingAverage,
    place::Column::RatingCount,
    place::Column::Wifi,
    place::Column::Parking,
    place::Column::AirConditioning,
    place::Column::Outdoor,
    place::Column::PetFriendly,
    place::Column::Delivery,
    place::Column::Takeaway,
    place::Column::CardPayment,
    place::Column::Tags,
    place::Column::CreatedBy,
    place::Column::ViewCount,
    place::Column::CreatedAt,
];

/// A listing row: projected place fields, distance and owner summary.
#[derive(Debug, Clone, PartialEq, FromQueryResult)]
pub struct ListedPlace {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: place::PlaceCategory,
    pub subcategory: Option<String>,
    pub address_street: Option<String>,
    pub address_city: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub rating_average: f64,
    pub rating_count: i32,
    pub wifi: bool,
    pub parking: bool,
    pub air_conditioning: bool,
    pub outdoor: bool,
    pub pet_friendly: bool,
    pub delivery: bool,
    pub takeaway: bool,
    pub card_payment: bool,
    pub tags: JsonValue,
    pub created_by: String,
    pub view_count: i32,
    pub created_at: DateTimeWithTimeZone,
    /// Meters from the search point; `None` without a proximity stage
    pub distance: Option<f64>,
    pub owner_id: Option<String>,
    pub owner_username: Option<String>,
    pub owner_name: Option<String>,
    pub owner_avatar_url: Option<String>,
}

impl ListedPlace {
    /// Tags as strings.
    #[must_use]
    pub fn tag_list(&self) -> Vec<String> {
        place::tags_from_json(&self.tags)
    }
}

#[derive(Debug, FromQueryResult)]
struct CountRow {
    total: i64,
}

/// Repository for place operations.
#[derive(Clone)]
pub struct PlaceRepository {
    db: Arc<DatabaseConnection>,
}

impl PlaceRepository {
    /// Create a new place repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a place by ID, active or not.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<place::Model>> {
        Place::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Run a listing pipeline.
    pub async fn aggregate(&self, pipeline: &Pipeline) -> AppResult<Vec<ListedPlace>> {
        if pipeline.is_count() {
            return Err(AppError::Internal(
                "count pipeline passed to aggregate".to_string(),
            ));
        }

        let statement = pipeline.to_statement();
        debug!(stages = pipeline.stages().len(), "Running place pipeline");

        ListedPlace::find_by_statement(statement)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Run a count pipeline.
    pub async fn count(&self, pipeline: &Pipeline) -> AppResult<u64> {
        if !pipeline.is_count() {
            return Err(AppError::Internal(
                "pipeline does not end in a count stage".to_string(),
            ));
        }

        let row = CountRow::find_by_statement(pipeline.to_statement())
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(row.map_or(0, |r| u64::try_from(r.total).unwrap_or(0)))
    }

    /// Increment the view counter and return the updated place.
    ///
    /// Single `UPDATE ... RETURNING` statement; concurrent calls never lose
    /// increments. Inactive places are counted too.
    pub async fn increment_view_count(&self, id: &str) -> AppResult<Option<place::Model>> {
        let updated = Place::update_many()
            .col_expr(
                place::Column::ViewCount,
                Expr::col(place::Column::ViewCount).add(1),
            )
            .filter(place::Column::Id.eq(id))
            .exec_with_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(updated.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Filter, OwnerLookup, SortKey, Stage};
    use crate::test_utils::fixtures;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn listing_pipeline() -> Pipeline {
        let mut builder = Pipeline::builder();
        builder
            .push(Stage::Match(vec![Filter::Eq(
                place::Column::IsActive,
                true.into(),
            )]))
            .unwrap();
        builder
            .push(Stage::Sort(vec![SortKey::desc(place::Column::CreatedAt)]))
            .unwrap();
        builder.push(Stage::Limit(10)).unwrap();
        builder
            .push(Stage::LookupOwner(OwnerLookup {
                preserve_null: true,
            }))
            .unwrap();
        builder
            .push(Stage::Project(LISTING_FIELDS.to_vec()))
            .unwrap();
        builder.build()
    }

    #[tokio::test]
    async fn test_aggregate_decodes_rows_with_and_without_owner() {
        let owner = fixtures::user("alice");
        let owned = fixtures::place("Cafe Giang");
        let orphan = fixtures::place("Orphan Bistro");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![
                    fixtures::listing_row(&owned, None, Some(&owner)),
                    fixtures::listing_row(&orphan, None, None),
                ]])
                .into_connection(),
        );

        let repo = PlaceRepository::new(db);
        let rows = repo.aggregate(&listing_pipeline()).await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Cafe Giang");
        assert_eq!(rows[0].owner_username.as_deref(), Some("alice"));
        assert_eq!(rows[0].tag_list(), vec!["coffee", "quiet"]);
        assert!(rows[0].distance.is_none());
        assert_eq!(rows[1].name, "Orphan Bistro");
        assert!(rows[1].owner_id.is_none());
    }

    #[tokio::test]
    async fn test_aggregate_rejects_count_pipeline() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let repo = PlaceRepository::new(db);

        let result = repo.aggregate(&listing_pipeline().count_pipeline()).await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[tokio::test]
    async fn test_count_reads_total() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::count_row(42)]])
                .into_connection(),
        );

        let repo = PlaceRepository::new(db);
        let total = repo.count(&listing_pipeline().count_pipeline()).await.unwrap();

        assert_eq!(total, 42);
    }

    #[tokio::test]
    async fn test_count_rejects_listing_pipeline() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let repo = PlaceRepository::new(db);

        let result = repo.count(&listing_pipeline()).await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[tokio::test]
    async fn test_increment_view_count_returns_updated_row() {
        let mut place = fixtures::place("Cafe Giang");
        place.view_count = 8;
        let id = place.id.clone();

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[place]])
                .into_connection(),
        );

        let repo = PlaceRepository::new(db);
        let updated = repo.increment_view_count(&id).await.unwrap().unwrap();

        assert_eq!(updated.id, id);
        assert_eq!(updated.view_count, 8);
    }

    #[tokio::test]
    async fn test_increment_view_count_missing_place() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<place::Model>::new()])
                .into_connection(),
        );

        let repo = PlaceRepository::new(db);
        let updated = repo
            .increment_view_count("01hzy8k3v6m2a9d4q7r1t5w8xy")
            .await
            .unwrap();

        assert!(updated.is_none());
    }
}
