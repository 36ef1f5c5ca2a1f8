//! Account and profile handlers.

use axum::extract::{Path, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::Json;

use rk_models::{LoginRequest, PublicUser, SignupRequest, TokenResponse, UserId};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult, AppJson};
use crate::state::AppState;

/// Register an account.
pub async fn signup(
    State(state): State<AppState>,
    AppJson(request): AppJson<SignupRequest>,
) -> ApiResult<Json<PublicUser>> {
    Ok(Json(state.identity.signup(request).await?))
}

/// Log in. The token is returned in the body and in the `Authorization` header.
pub async fn login(
    State(state): State<AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> ApiResult<Response> {
    let token = state.identity.login(request).await?;
    let header = HeaderValue::from_str(&token)
        .map_err(|e| ApiError::internal(format!("Token is not a valid header value: {}", e)))?;

    Ok(([(AUTHORIZATION, header)], Json(TokenResponse { token })).into_response())
}

pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<PublicUser>>> {
    Ok(Json(state.identity.list_users().await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PublicUser>> {
    Ok(Json(state.identity.get_user(&UserId::from(id)).await?))
}

/// Profile of the caller.
pub async fn me(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<PublicUser>> {
    Ok(Json(state.identity.me(&user.user_id).await?))
}
