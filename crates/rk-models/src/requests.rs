//! Request and response payloads for the identity, rating and feedback routes.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::rating::Rating;

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SignupRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 64, message = "Path `username` is required and at most 64 characters."))]
    pub username: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Path `password` is required."))]
    pub password: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Path `image` is required."))]
    pub image: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Path `bio` is required."))]
    pub bio: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateRequest {
    pub rating: Rating,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CommentRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 2000, message = "Comment must be between 1 and 2000 characters"))]
    pub comment: String,

    #[serde(default)]
    pub rating: Option<Rating>,
}

/// Plain `{ "message": ... }` acknowledgement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signup_requires_every_field() {
        let req: SignupRequest = serde_json::from_str(r#"{"username":"bob"}"#).unwrap();
        let errs = req.validate().unwrap_err();
        let fields = errs.field_errors();
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("image"));
        assert!(fields.contains_key("bio"));
        assert!(!fields.contains_key("username"));
    }

    #[test]
    fn test_rate_request_rejects_out_of_range() {
        assert!(serde_json::from_str::<RateRequest>(r#"{"rating":4}"#).is_ok());
        assert!(serde_json::from_str::<RateRequest>(r#"{"rating":9}"#).is_err());
    }

    #[test]
    fn test_comment_must_not_be_empty() {
        let req: CommentRequest = serde_json::from_str(r#"{"comment":""}"#).unwrap();
        assert!(req.validate().is_err());
        let req: CommentRequest = serde_json::from_str(r#"{"comment":"tasty","rating":5}"#).unwrap();
        assert!(req.validate().is_ok());
    }
}
