//! Accounts: signup, login and profile lookups.

use std::sync::Arc;

use tracing::{info, warn};
use validator::Validate;

use rk_models::{LoginRequest, PasswordHash, PublicUser, SignupRequest, User, UserId};
use rk_store::{DocumentStore, StoreError};

use crate::auth::TokenIssuer;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::password;

pub const USERNAME_TAKEN: &str = "Username already exists";
pub const UNKNOWN_USERNAME: &str = "Username or password is wrong";
pub const WRONG_PASSWORD: &str = "Invalid password";
pub const USER_NOT_FOUND: &str = "User not found";

#[derive(Clone)]
pub struct IdentityService {
    store: Arc<dyn DocumentStore>,
    tokens: Arc<TokenIssuer>,
}

impl IdentityService {
    pub fn new(store: Arc<dyn DocumentStore>, tokens: Arc<TokenIssuer>) -> Self {
        Self { store, tokens }
    }

    /// Register a new account and return its public profile.
    pub async fn signup(&self, request: SignupRequest) -> ApiResult<PublicUser> {
        request.validate()?;

        let hash = hash_off_thread(request.password).await?;
        let user = User::new(request.username, hash, request.image, request.bio);

        match self.store.create_user(&user).await {
            Ok(()) => {}
            Err(StoreError::AlreadyExists(_)) => {
                info!(username = %user.username, "Signup rejected, username taken");
                return Err(ApiError::conflict(USERNAME_TAKEN));
            }
            Err(e) => return Err(e.into()),
        }

        metrics::record_signup();
        info!(user_id = %user.id, username = %user.username, "User signed up");
        Ok(user.to_public())
    }

    /// Check credentials and issue a session token.
    pub async fn login(&self, request: LoginRequest) -> ApiResult<String> {
        let user = match self.store.find_user_by_username(&request.username).await? {
            Some(user) => user,
            None => {
                metrics::record_login("unknown_user");
                return Err(ApiError::bad_request(UNKNOWN_USERNAME));
            }
        };

        if !verify_off_thread(request.password, user.password.clone()).await? {
            metrics::record_login("bad_password");
            warn!(user_id = %user.id, "Login failed, wrong password");
            return Err(ApiError::bad_request(WRONG_PASSWORD));
        }

        let token = self.tokens.issue(&user.id)?;
        metrics::record_login("success");
        info!(user_id = %user.id, "User logged in");
        Ok(token)
    }

    /// Public profile of the authenticated caller.
    pub async fn me(&self, caller: &UserId) -> ApiResult<PublicUser> {
        self.get_user(caller).await
    }

    pub async fn get_user(&self, id: &UserId) -> ApiResult<PublicUser> {
        self.store
            .get_user(id)
            .await?
            .map(|u| u.value.to_public())
            .ok_or_else(|| ApiError::not_found(USER_NOT_FOUND))
    }

    pub async fn list_users(&self) -> ApiResult<Vec<PublicUser>> {
        let users = self.store.list_users().await?;
        Ok(users.iter().map(User::to_public).collect())
    }
}

// Argon2 is CPU-bound, so it runs on the blocking pool.

async fn hash_off_thread(password: String) -> ApiResult<PasswordHash> {
    tokio::task::spawn_blocking(move || password::hash_password(&password))
        .await
        .map_err(|e| ApiError::internal(format!("Password hashing task failed: {}", e)))?
}

async fn verify_off_thread(password: String, stored: PasswordHash) -> ApiResult<bool> {
    tokio::task::spawn_blocking(move || password::verify_password(&password, &stored))
        .await
        .map_err(|e| ApiError::internal(format!("Password verification task failed: {}", e)))?
}
