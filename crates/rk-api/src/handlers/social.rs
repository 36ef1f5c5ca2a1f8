//! Follow and unfollow.

use axum::extract::{Path, State};
use axum::Json;

use rk_models::{MessageResponse, UserId};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::services::social::{FOLLOWED, UNFOLLOWED};
use crate::state::AppState;

pub async fn follow_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    state.social.follow(&user.user_id, &UserId::from(id)).await?;
    Ok(Json(MessageResponse::new(FOLLOWED)))
}

pub async fn unfollow_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    state.social.unfollow(&user.user_id, &UserId::from(id)).await?;
    Ok(Json(MessageResponse::new(UNFOLLOWED)))
}
