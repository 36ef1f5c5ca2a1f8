//! API configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// HS256 secrets shorter than this are rejected at startup.
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Upper bound for `JWT_TTL_SECS` (ten years).
pub const MAX_JWT_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("JWT_SECRET must be at least 32 bytes")]
    WeakSecret,
}

/// How a recipe's displayed rating is derived after a new rating arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RatingPolicy {
    /// Mean of the ratings this recipe has received.
    #[default]
    PerRecipe,
    /// Mean of the ratings the recipe's owner has given to other recipes.
    /// Kept for compatibility with existing data.
    OwnerHistory,
}

impl RatingPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RatingPolicy::PerRecipe => "per_recipe",
            RatingPolicy::OwnerHistory => "owner_history",
        }
    }
}

impl FromStr for RatingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "per_recipe" => Ok(RatingPolicy::PerRecipe),
            "owner_history" => Ok(RatingPolicy::OwnerHistory),
            other => Err(format!(
                "expected per_recipe or owner_history, got {:?}",
                other
            )),
        }
    }
}

/// Which document store backs the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    #[default]
    Firestore,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "firestore" => Ok(StoreBackend::Firestore),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("expected firestore or memory, got {:?}", other)),
        }
    }
}

/// Token signing secret. Never printed.
#[derive(Clone, Default)]
pub struct JwtSecret(String);

impl JwtSecret {
    pub fn new(secret: impl Into<String>) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::WeakSecret);
        }
        Ok(Self(secret))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JwtSecret(<redacted>)")
    }
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Rate limit requests per second, per client IP
    pub rate_limit_rps: u32,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Serve Prometheus metrics at /metrics
    pub metrics_enabled: bool,
    /// Secret for signing session tokens
    pub jwt_secret: JwtSecret,
    /// Lifetime of issued tokens; `None` issues tokens without `exp`
    pub jwt_ttl: Option<Duration>,
    pub rating_policy: RatingPolicy,
    pub store_backend: StoreBackend,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            max_body_size: 1024 * 1024, // 1MB
            environment: "development".to_string(),
            metrics_enabled: true,
            jwt_secret: JwtSecret::default(),
            jwt_ttl: None,
            rating_policy: RatingPolicy::default(),
            store_backend: StoreBackend::default(),
        }
    }
}

fn parse_var<T>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => {
            value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                var,
                value: value.clone(),
                reason: e.to_string(),
            })
        }
        _ => Ok(default),
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    ///
    /// Fails when `JWT_SECRET` is missing or short, or any variable is set
    /// to something unparseable.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let jwt_secret = std::env::var("JWT_SECRET")
            .map_err(|_| ConfigError::Missing("JWT_SECRET"))
            .and_then(JwtSecret::new)?;

        let jwt_ttl = match std::env::var("JWT_TTL_SECS") {
            Ok(value) if !value.trim().is_empty() => {
                let secs: u64 = value
                    .trim()
                    .parse()
                    .ok()
                    .filter(|secs| (1..=MAX_JWT_TTL_SECS).contains(secs))
                    .ok_or_else(|| ConfigError::Invalid {
                        var: "JWT_TTL_SECS",
                        value: value.clone(),
                        reason: format!("expected 1..={} seconds", MAX_JWT_TTL_SECS),
                    })?;
                Some(Duration::from_secs(secs))
            }
            _ => None,
        };

        Ok(Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: parse_var("API_PORT", defaults.port)?,
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            rate_limit_rps: parse_var("RATE_LIMIT_RPS", defaults.rate_limit_rps)?,
            max_body_size: parse_var("MAX_BODY_SIZE", defaults.max_body_size)?,
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.metrics_enabled),
            jwt_secret,
            jwt_ttl,
            rating_policy: parse_var("RATING_POLICY", defaults.rating_policy)?,
            store_backend: parse_var("STORE_BACKEND", defaults.store_backend)?,
        })
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn clear_env() {
        for var in [
            "JWT_SECRET",
            "JWT_TTL_SECS",
            "API_PORT",
            "RATING_POLICY",
            "STORE_BACKEND",
            "METRICS_ENABLED",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_missing_secret_fails() {
        clear_env();
        assert!(matches!(
            ApiConfig::from_env(),
            Err(ConfigError::Missing("JWT_SECRET"))
        ));
    }

    #[test]
    #[serial]
    fn test_short_secret_fails() {
        clear_env();
        std::env::set_var("JWT_SECRET", "short");
        assert!(matches!(ApiConfig::from_env(), Err(ConfigError::WeakSecret)));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        std::env::set_var("JWT_SECRET", SECRET);
        let config = ApiConfig::from_env().unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.rating_policy, RatingPolicy::PerRecipe);
        assert_eq!(config.store_backend, StoreBackend::Firestore);
        assert!(config.jwt_ttl.is_none());
        assert!(!format!("{:?}", config).contains(SECRET));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_overrides_and_bad_values() {
        clear_env();
        std::env::set_var("JWT_SECRET", SECRET);
        std::env::set_var("RATING_POLICY", "owner_history");
        std::env::set_var("STORE_BACKEND", "memory");
        std::env::set_var("JWT_TTL_SECS", "3600");
        let config = ApiConfig::from_env().unwrap();
        assert_eq!(config.rating_policy, RatingPolicy::OwnerHistory);
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.jwt_ttl, Some(Duration::from_secs(3600)));

        std::env::set_var("API_PORT", "not-a-port");
        assert!(matches!(
            ApiConfig::from_env(),
            Err(ConfigError::Invalid { var: "API_PORT", .. })
        ));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_token_ttl_is_bounded() {
        clear_env();
        std::env::set_var("JWT_SECRET", SECRET);
        for bad in ["0", "18446744073709551615", "-5"] {
            std::env::set_var("JWT_TTL_SECS", bad);
            assert!(
                matches!(
                    ApiConfig::from_env(),
                    Err(ConfigError::Invalid { var: "JWT_TTL_SECS", .. })
                ),
                "{}",
                bad
            );
        }

        std::env::set_var("JWT_TTL_SECS", MAX_JWT_TTL_SECS.to_string());
        assert_eq!(
            ApiConfig::from_env().unwrap().jwt_ttl,
            Some(Duration::from_secs(MAX_JWT_TTL_SECS))
        );
        clear_env();
    }
}
