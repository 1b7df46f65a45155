//! API endpoints.

mod places;

use axum::Router;

use crate::middleware::AppState;

pub use places::{
    AddressResponse, CoordinatesResponse, FeaturesResponse, HelpfulResponse, OwnerResponse,
    PlaceDetailResponse, PlaceListResponse, PlaceResponse, PricingResponse, RatingResponse,
    ReviewResponse,
};

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new().nest("/places", places::router())
}
