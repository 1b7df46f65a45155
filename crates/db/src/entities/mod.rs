//! Database entities.

pub mod place;
pub mod review;
pub mod user;

pub use place::Entity as Place;
pub use review::Entity as Review;
pub use user::Entity as User;
