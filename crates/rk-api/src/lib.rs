//! Axum HTTP API server for the RecipeKing backend.
//!
//! This crate provides:
//! - Signup, login and JWT session tokens
//! - Recipe catalog with owner-only edits
//! - Ratings, comments and the follow graph
//! - Rate limiting, security headers and Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod password;
pub mod routes;
pub mod services;
pub mod state;

pub use config::{ApiConfig, RatingPolicy, StoreBackend};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
