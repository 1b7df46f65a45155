//! HTTP API layer for wayfind.
//!
//! This crate provides the REST API for place discovery:
//!
//! - **Endpoints**: place listing and place detail
//! - **Extractors**: query parsing with JSON error envelopes
//! - **Responses**: the `{ success, data }` envelope
//!
//! Built on Axum 0.8.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
