//! Business logic services.

#![allow(missing_docs)]

pub mod place;
pub mod place_query;

pub use place::{Pagination, PlaceDetail, PlaceListing, PlaceService};
pub use place_query::{ListPlacesQuery, PlaceQueryBuilder, PlaceQueryPlan};
