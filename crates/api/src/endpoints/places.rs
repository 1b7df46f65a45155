//! Place endpoints.

use axum::{
    Router,
    extract::{Path, State},
    routing::get,
};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use wayfind_common::AppResult;
use wayfind_core::{ListPlacesQuery, Pagination, PlaceDetail, PlaceListing};
use wayfind_db::entities::place::{self, PlaceCategory};
use wayfind_db::entities::{review, user};
use wayfind_db::repositories::ListedPlace;

use crate::{extractors::ApiQuery, middleware::AppState, response::ApiResponse};

/// Create place router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_places))
        .route("/{id}", get(get_place))
}

/// Place owner summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerResponse {
    pub id: String,
    pub username: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<user::Model> for OwnerResponse {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
            name: user.name,
            avatar_url: user.avatar_url,
        }
    }
}

/// Coordinates in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoordinatesResponse {
    pub lat: f64,
    pub lng: f64,
}

/// Place address.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressResponse {
    pub street: Option<String>,
    pub city: Option<String>,
    pub coordinates: CoordinatesResponse,
}

/// Price bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingResponse {
    pub min_price: f64,
    pub max_price: f64,
}

/// Aggregated rating.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatingResponse {
    pub average: f64,
    pub count: i32,
}

/// Amenity flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturesResponse {
    pub wifi: bool,
    pub parking: bool,
    pub air_conditioning: bool,
    pub outdoor: bool,
    pub pet_friendly: bool,
    pub delivery: bool,
    pub takeaway: bool,
    pub card_payment: bool,
}

/// Place response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: PlaceCategory,
    pub subcategory: Option<String>,
    pub address: AddressResponse,
    pub pricing: PricingResponse,
    pub rating: RatingResponse,
    pub features: FeaturesResponse,
    pub tags: Vec<String>,
    pub view_count: i32,
    pub created_at: DateTime<FixedOffset>,
    pub created_by: Option<OwnerResponse>,
    /// Meters from the search point
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

impl From<ListedPlace> for PlaceResponse {
    fn from(row: ListedPlace) -> Self {
        let tags = row.tag_list();
        let created_by = match (row.owner_id, row.owner_username) {
            (Some(id), Some(username)) => Some(OwnerResponse {
                id,
                username,
                name: row.owner_name,
                avatar_url: row.owner_avatar_url,
            }),
            _ => None,
        };

        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            category: row.category,
            subcategory: row.subcategory,
            address: AddressResponse {
                street: row.address_street,
                city: row.address_city,
                coordinates: CoordinatesResponse {
                    lat: row.lat,
                    lng: row.lng,
                },
            },
            pricing: PricingResponse {
                min_price: row.min_price,
                max_price: row.max_price,
            },
            rating: RatingResponse {
                average: row.rating_average,
                count: row.rating_count,
            },
            features: FeaturesResponse {
                wifi: row.wifi,
                parking: row.parking,
                air_conditioning: row.air_conditioning,
                outdoor: row.outdoor,
                pet_friendly: row.pet_friendly,
                delivery: row.delivery,
                takeaway: row.takeaway,
                card_payment: row.card_payment,
            },
            tags,
            view_count: row.view_count,
            created_at: row.created_at,
            created_by,
            distance: row.distance,
        }
    }
}

impl PlaceResponse {
    fn from_model(place: place::Model, owner: Option<user::Model>) -> Self {
        let tags = place.tag_list();

        Self {
            id: place.id,
            name: place.name,
            description: place.description,
            category: place.category,
            subcategory: place.subcategory,
            address: AddressResponse {
                street: place.address_street,
                city: place.address_city,
                coordinates: CoordinatesResponse {
                    lat: place.lat,
                    lng: place.lng,
                },
            },
            pricing: PricingResponse {
                min_price: place.min_price,
                max_price: place.max_price,
            },
            rating: RatingResponse {
                average: place.rating_average,
                count: place.rating_count,
            },
            features: FeaturesResponse {
                wifi: place.wifi,
                parking: place.parking,
                air_conditioning: place.air_conditioning,
                outdoor: place.outdoor,
                pet_friendly: place.pet_friendly,
                delivery: place.delivery,
                takeaway: place.takeaway,
                card_payment: place.card_payment,
            },
            tags,
            view_count: place.view_count,
            created_at: place.created_at,
            created_by: owner.map(OwnerResponse::from),
            distance: None,
        }
    }
}

/// Helpful votes on a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HelpfulResponse {
    pub count: usize,
    pub users: Vec<String>,
}

/// Review response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub id: String,
    pub rating: i16,
    pub title: Option<String>,
    pub comment: Option<String>,
    pub helpful: HelpfulResponse,
    pub created_at: DateTime<FixedOffset>,
}

impl From<review::Model> for ReviewResponse {
    fn from(review: review::Model) -> Self {
        let users = review.helpful_user_ids();

        Self {
            id: review.id,
            rating: review.rating,
            title: review.title,
            comment: review.comment,
            helpful: HelpfulResponse {
                count: users.len(),
                users,
            },
            created_at: review.created_at,
        }
    }
}

/// List places response.
#[derive(Debug, Serialize)]
pub struct PlaceListResponse {
    pub places: Vec<PlaceResponse>,
    pub pagination: Pagination,
}

impl From<PlaceListing> for PlaceListResponse {
    fn from(listing: PlaceListing) -> Self {
        Self {
            places: listing.places.into_iter().map(PlaceResponse::from).collect(),
            pagination: listing.pagination,
        }
    }
}

/// Place detail response.
#[derive(Debug, Serialize)]
pub struct PlaceDetailResponse {
    pub place: PlaceResponse,
    pub reviews: Vec<ReviewResponse>,
}

impl From<PlaceDetail> for PlaceDetailResponse {
    fn from(detail: PlaceDetail) -> Self {
        Self {
            place: PlaceResponse::from_model(detail.place, detail.owner),
            reviews: detail.reviews.into_iter().map(ReviewResponse::from).collect(),
        }
    }
}

/// List active places.
async fn list_places(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListPlacesQuery>,
) -> AppResult<ApiResponse<PlaceListResponse>> {
    let listing = state.place_service.list(&query).await?;
    Ok(ApiResponse::ok(listing.into()))
}

/// Get a place by ID and count the view.
async fn get_place(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<PlaceDetailResponse>> {
    let detail = state.place_service.get(&id).await?;
    Ok(ApiResponse::ok(detail.into()))
}
