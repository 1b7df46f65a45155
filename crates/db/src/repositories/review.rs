//! Review repository.

use std::sync::Arc;

use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, Order, QueryFilter, QueryOrder, QuerySelect,
};
use wayfind_common::{AppError, AppResult};

use crate::entities::{Review, review};

/// Repository for review operations.
#[derive(Clone)]
pub struct ReviewRepository {
    db: Arc<DatabaseConnection>,
}

impl ReviewRepository {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Most recent active reviews of a place, newest first.
    pub async fn find_recent_active_by_place(
        &self,
        place_id: &str,
        limit: u64,
    ) -> AppResult<Vec<review::Model>> {
        Review::find()
            .filter(review::Column::PlaceId.eq(place_id))
            .filter(review::Column::IsActive.eq(true))
            .order_by(review::Column::CreatedAt, Order::Desc)
            .order_by(review::Column::Id, Order::Desc)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
