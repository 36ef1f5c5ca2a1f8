//! Recipes from the users the caller follows.

use std::sync::Arc;

use rk_models::{Recipe, UserId};
use rk_store::DocumentStore;

use crate::error::{ApiError, ApiResult};
use crate::services::identity::USER_NOT_FOUND;

#[derive(Clone)]
pub struct FeedService {
    store: Arc<dyn DocumentStore>,
}

impl FeedService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn followed_recipes(&self, caller: &UserId) -> ApiResult<Vec<Recipe>> {
        let user = self
            .store
            .get_user(caller)
            .await?
            .ok_or_else(|| ApiError::not_found(USER_NOT_FOUND))?;

        Ok(self
            .store
            .list_recipes_by_owners(&user.value.following)
            .await?)
    }
}
