//! Core business logic for wayfind.

pub mod services;

pub use services::*;
