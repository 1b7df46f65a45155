//! Repository layer for database access.

mod place;
mod review;
mod user;

pub use place::{LISTING_FIELDS, ListedPlace, PlaceRepository};
pub use review::ReviewRepository;
pub use user::UserRepository;
