//! Recipe handlers: catalog, feeds, ratings and comments.

use axum::extract::{Path, State};
use axum::Json;

use rk_models::{
    CommentRequest, MessageResponse, RateRequest, Recipe, RecipeDraft, RecipeId, RecipePatch,
    RecipeWithOwner,
};

use crate::auth::AuthUser;
use crate::error::{ApiResult, AppJson};
use crate::services::feedback::COMMENT_SUBMITTED;
use crate::services::rating::RATING_SUBMITTED;
use crate::state::AppState;

pub async fn list_recipes(State(state): State<AppState>) -> ApiResult<Json<Vec<Recipe>>> {
    Ok(Json(state.catalog.list().await?))
}

/// One recipe with its owner's public profile in place of the owner id.
pub async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RecipeWithOwner>> {
    Ok(Json(state.catalog.get_with_owner(&RecipeId::from(id)).await?))
}

pub async fn create_recipe(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(draft): AppJson<RecipeDraft>,
) -> ApiResult<Json<Recipe>> {
    Ok(Json(state.catalog.create(&user.user_id, draft).await?))
}

pub async fn update_recipe(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    AppJson(patch): AppJson<RecipePatch>,
) -> ApiResult<Json<Recipe>> {
    let recipe = state
        .catalog
        .update(&user.user_id, &RecipeId::from(id), patch)
        .await?;
    Ok(Json(recipe))
}

/// Delete a recipe and echo it back.
pub async fn delete_recipe(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Recipe>> {
    Ok(Json(
        state.catalog.delete(&user.user_id, &RecipeId::from(id)).await?,
    ))
}

pub async fn my_recipes(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<Recipe>>> {
    Ok(Json(state.catalog.mine(&user.user_id).await?))
}

pub async fn followed_recipes(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<Recipe>>> {
    Ok(Json(state.feeds.followed_recipes(&user.user_id).await?))
}

pub async fn rate_recipe(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    AppJson(request): AppJson<RateRequest>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .ratings
        .rate(&user.user_id, &RecipeId::from(id), request.rating)
        .await?;
    Ok(Json(MessageResponse::new(RATING_SUBMITTED)))
}

pub async fn comment_recipe(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    AppJson(request): AppJson<CommentRequest>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .feedback
        .comment(&user.user_id, &RecipeId::from(id), request)
        .await?;
    Ok(Json(MessageResponse::new(COMMENT_SUBMITTED)))
}
