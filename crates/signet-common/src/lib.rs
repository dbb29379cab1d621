//! # signet-common
//!
//! Shared building blocks for Signet: application configuration, the
//! API error type, database row models and time helpers.

pub mod config;
pub mod error;
pub mod models;
pub mod time;

pub use error::{ApiError, ApiResult};
