//! Place service.

use serde::Serialize;
use tracing::debug;
use validator::Validate;
use wayfind_common::config::ListingConfig;
use wayfind_common::{AppError, AppResult, is_valid_id};
use wayfind_db::entities::{place, review, user};
use wayfind_db::repositories::{
    ListedPlace, PlaceRepository, ReviewRepository, UserRepository,
};

use super::place_query::{ListPlacesQuery, PlaceQueryBuilder};

/// Number of reviews shown with a place.
const RECENT_REVIEWS_LIMIT: u64 = 5;

/// Page position of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current: u64,
    pub pages: u64,
    pub total: u64,
    pub limit: u64,
}

impl Pagination {
    /// Pagination for `total` matches; zero pages when nothing matched.
    #[must_use]
    pub const fn new(current: u64, limit: u64, total: u64) -> Self {
        let pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            current,
            pages,
            total,
            limit,
        }
    }
}

/// One page of places with pagination.
#[derive(Debug, Clone)]
pub struct PlaceListing {
    pub places: Vec<ListedPlace>,
    pub pagination: Pagination,
}

/// A single place with its owner and recent reviews.
#[derive(Debug, Clone)]
pub struct PlaceDetail {
    pub place: place::Model,
    /// `None` when the owner no longer exists
    pub owner: Option<user::Model>,
    pub reviews: Vec<review::Model>,
}

/// Service for place listings and details.
#[derive(Clone)]
pub struct PlaceService {
    place_repo: PlaceRepository,
    review_repo: ReviewRepository,
    user_repo: UserRepository,
    query_builder: PlaceQueryBuilder,
}

impl PlaceService {
    /// Create a new place service.
    #[must_use]
    pub const fn new(
        place_repo: PlaceRepository,
        review_repo: ReviewRepository,
        user_repo: UserRepository,
        listing: ListingConfig,
    ) -> Self {
        Self {
            place_repo,
            review_repo,
            user_repo,
            query_builder: PlaceQueryBuilder::new(listing),
        }
    }

    /// List active places matching the query.
    ///
    /// The page and the total are read concurrently and are not taken from one
    /// snapshot, so a concurrent write may make them disagree.
    pub async fn list(&self, query: &ListPlacesQuery) -> AppResult<PlaceListing> {
        query
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let plan = self.query_builder.build(query)?;
        debug!(
            stages = plan.pipeline.stages().len(),
            geo = plan.is_geo(),
            page = plan.page,
            limit = plan.limit,
            "Listing places"
        );

        let (places, total) = tokio::try_join!(
            self.place_repo.aggregate(&plan.pipeline),
            self.place_repo.count(&plan.count_pipeline),
        )?;

        Ok(PlaceListing {
            places,
            pagination: Pagination::new(plan.page, plan.limit, total),
        })
    }

    /// Fetch a place, counting the view.
    ///
    /// Inactive places are still returned here; only listings hide them.
    pub async fn get(&self, id: &str) -> AppResult<PlaceDetail> {
        if !is_valid_id(id) {
            return Err(AppError::PlaceNotFound(id.to_string()));
        }

        let place = self
            .place_repo
            .increment_view_count(id)
            .await?
            .ok_or_else(|| AppError::PlaceNotFound(id.to_string()))?;
        debug!(place_id = %place.id, view_count = place.view_count, "Counted place view");

        let (owner, reviews) = tokio::try_join!(
            self.user_repo.find_by_id(&place.created_by),
            self.review_repo
                .find_recent_active_by_place(&place.id, RECENT_REVIEWS_LIMIT),
        )?;

        Ok(PlaceDetail {
            place,
            owner,
            reviews,
        })
    }
}
