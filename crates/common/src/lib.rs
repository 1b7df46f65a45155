//! Common utilities and shared types for wayfind.
//!
//! This crate provides foundational components used across all wayfind crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID handling**: ULID-based identifiers via [`IdGenerator`] and [`is_valid_id`]
//!
//! # Example
//!
//! ```no_run
//! use wayfind_common::{AppResult, Config};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     println!("Listening on {}:{}", config.server.host, config.server.port);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::{IdGenerator, is_valid_id};
