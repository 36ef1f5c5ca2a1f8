//! Shared data models for the RecipeKing backend.
//!
//! This crate provides Serde-serializable types for:
//! - User and recipe documents
//! - Ratings, feedback and follow edges
//! - Request payloads with validation rules
//! - Public projections that never carry credentials

pub mod error;
pub mod ids;
pub mod rating;
pub mod recipe;
pub mod requests;
pub mod user;

// Re-export common types
pub use error::{ModelError, ModelResult};
pub use ids::{RecipeId, UserId};
pub use rating::Rating;
pub use recipe::{Recipe, RecipeCategory, RecipeDraft, RecipePatch, RecipeWithOwner};
pub use requests::{
    CommentRequest, LoginRequest, MessageResponse, RateRequest, SignupRequest, TokenResponse,
};
pub use user::{FeedbackEntry, PasswordHash, PublicUser, RatingEntry, User};
