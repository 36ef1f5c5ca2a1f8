//! Session tokens and the authentication extractor.
//!
//! Tokens are HS256 JWTs carrying the user id in `_id`. The `Authorization`
//! header may hold `Bearer <token>` or the bare token.

use std::time::Duration;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use rk_models::UserId;

use crate::config::JwtSecret;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub const ACCESS_DENIED: &str = "Access denied";
pub const INVALID_TOKEN: &str = "Invalid token";

/// Session token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    #[serde(rename = "_id")]
    pub id: String,
    /// Issued at
    pub iat: i64,
    /// Expiration, only present when a token TTL is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Signs and verifies session tokens.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Option<Duration>,
}

impl TokenIssuer {
    pub fn new(secret: &JwtSecret, ttl: Option<Duration>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // `exp` is optional; when present it is still checked.
        validation.required_spec_claims.clear();
        validation.validate_exp = true;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    /// Issue a token for `user_id`.
    pub fn issue(&self, user_id: &UserId) -> ApiResult<String> {
        let now = Utc::now().timestamp();
        let exp = match self.ttl {
            Some(ttl) => Some(
                i64::try_from(ttl.as_secs())
                    .ok()
                    .and_then(|secs| now.checked_add(secs))
                    .ok_or_else(|| ApiError::internal("Token TTL out of range"))?,
            ),
            None => None,
        };
        let claims = Claims {
            id: user_id.as_str().to_string(),
            iat: now,
            exp,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::internal(format!("Failed to sign token: {}", e)))
    }

    /// Verify a token and return its claims.
    pub fn verify(&self, token: &str) -> ApiResult<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            debug!("Token verification failed: {}", e);
            ApiError::bad_request(INVALID_TOKEN)
        })?;

        if data.claims.id.is_empty() {
            return Err(ApiError::bad_request(INVALID_TOKEN));
        }

        Ok(data.claims)
    }
}

/// Accepts `Bearer <token>` (any case) or a bare token.
fn token_from_header(value: &str) -> &str {
    let value = value.trim();
    match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        _ => value,
    }
}

/// Authenticated caller extracted from the `Authorization` header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: UserId,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = match parts.headers.get(AUTHORIZATION) {
            Some(value) => value
                .to_str()
                .map_err(|_| ApiError::bad_request(INVALID_TOKEN))?,
            None => return Err(ApiError::unauthorized(ACCESS_DENIED)),
        };

        let token = token_from_header(header);
        if token.is_empty() {
            return Err(ApiError::unauthorized(ACCESS_DENIED));
        }

        let claims = state.tokens.verify(token).map_err(|e| {
            warn!(path = %parts.uri.path(), "Rejected invalid session token");
            e
        })?;

        Ok(AuthUser {
            user_id: UserId::from(claims.id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer(ttl: Option<Duration>) -> TokenIssuer {
        let secret = JwtSecret::new("an-adequately-long-test-secret-value").unwrap();
        TokenIssuer::new(&secret, ttl)
    }

    #[test]
    fn test_issued_token_round_trips_user_id() {
        let issuer = issuer(None);
        let id = UserId::from("user-42");
        let claims = issuer.verify(&issuer.issue(&id).unwrap()).unwrap();
        assert_eq!(claims.id, "user-42");
        assert!(claims.exp.is_none());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let issuer = issuer(None);
        let claims = Claims {
            id: "u".to_string(),
            iat: 0,
            exp: Some(1),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &issuer.encoding).unwrap();
        assert!(matches!(issuer.verify(&token), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let other = TokenIssuer::new(
            &JwtSecret::new("a-completely-different-secret-value!!").unwrap(),
            None,
        );
        let token = other.issue(&UserId::from("u")).unwrap();
        assert!(issuer(None).verify(&token).is_err());
    }

    #[test]
    fn test_ttl_sets_expiry() {
        let issuer = issuer(Some(Duration::from_secs(60)));
        let claims = issuer.verify(&issuer.issue(&UserId::from("u")).unwrap()).unwrap();
        assert_eq!(claims.exp, Some(claims.iat + 60));
    }

    #[test]
    fn test_unrepresentable_ttl_is_an_error() {
        let issuer = issuer(Some(Duration::from_secs(u64::MAX)));
        assert!(matches!(
            issuer.issue(&UserId::from("u")),
            Err(ApiError::Internal(_))
        ));
    }

    #[test]
    fn test_header_forms() {
        assert_eq!(token_from_header("Bearer abc"), "abc");
        assert_eq!(token_from_header("bearer abc"), "abc");
        assert_eq!(token_from_header("abc"), "abc");
    }
}
