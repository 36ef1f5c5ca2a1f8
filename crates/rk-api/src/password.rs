//! Argon2id password hashing.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use rk_models::PasswordHash;

use crate::error::{ApiError, ApiResult};

/// Hash a password into PHC string form with a fresh random salt.
pub fn hash_password(password: &str) -> ApiResult<PasswordHash> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::internal(format!("Password hashing failed: {}", e)))?;
    Ok(PasswordHash::from_phc(hash.to_string()))
}

/// Check a password against a stored hash. The comparison is constant-time.
pub fn verify_password(password: &str, stored: &PasswordHash) -> ApiResult<bool> {
    let parsed = password_hash::PasswordHash::new(stored.as_str())
        .map_err(|e| ApiError::internal(format!("Stored password hash is malformed: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(ApiError::internal(format!(
            "Password verification failed: {}",
            e
        ))),
    }
}
