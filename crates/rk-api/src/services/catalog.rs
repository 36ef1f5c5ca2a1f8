//! Recipe catalog: create, read, update and delete.

use std::sync::Arc;

use tracing::{info, warn};
use validator::Validate;

use rk_models::{Recipe, RecipeDraft, RecipeId, RecipePatch, RecipeWithOwner, UserId};
use rk_store::{DocumentStore, StoreWrite, Versioned};

use crate::error::{ApiError, ApiResult};
use crate::services::retry::with_optimistic_retry;

pub const RECIPE_NOT_FOUND: &str = "Recipe not found";
pub const OWNER_NOT_FOUND: &str = "Recipe owner not found";
pub const NOT_OWNER: &str = "Unauthorized";

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn DocumentStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> ApiResult<Vec<Recipe>> {
        Ok(self.store.list_recipes().await?)
    }

    /// A recipe with its owner expanded to the owner's public profile.
    pub async fn get_with_owner(&self, id: &RecipeId) -> ApiResult<RecipeWithOwner> {
        let recipe = self.load(id).await?.into_inner();
        let owner = self
            .store
            .get_user(&recipe.user_id)
            .await?
            .ok_or_else(|| ApiError::not_found(OWNER_NOT_FOUND))?;

        Ok(recipe.with_owner(owner.value.to_public()))
    }

    /// Publish a recipe owned by `caller`.
    pub async fn create(&self, caller: &UserId, draft: RecipeDraft) -> ApiResult<Recipe> {
        draft.validate()?;

        let recipe = Recipe::from_draft(draft, caller.clone());
        self.store.create_recipe(&recipe).await?;

        info!(recipe_id = %recipe.id, user_id = %caller, "Recipe created");
        Ok(recipe)
    }

    /// Apply a partial update. Only the owner may do this.
    pub async fn update(
        &self,
        caller: &UserId,
        id: &RecipeId,
        patch: RecipePatch,
    ) -> ApiResult<Recipe> {
        patch.validate()?;

        let recipe = with_optimistic_retry("update_recipe", move || {
            let patch = patch.clone();
            async move {
                let mut current = self.load_owned(caller, id).await?;
                current.value.apply_patch(patch);
                let updated = current.value.clone();
                self.store.commit(vec![StoreWrite::recipe(current)]).await?;
                Ok(updated)
            }
        })
        .await?;

        info!(recipe_id = %id, user_id = %caller, "Recipe updated");
        Ok(recipe)
    }

    /// Delete a recipe and return what was deleted. Only the owner may do this.
    pub async fn delete(&self, caller: &UserId, id: &RecipeId) -> ApiResult<Recipe> {
        let recipe = with_optimistic_retry("delete_recipe", move || async move {
            let current = self.load_owned(caller, id).await?;
            self.store.delete_recipe(id, &current.version).await?;
            Ok(current.into_inner())
        })
        .await?;

        info!(recipe_id = %id, user_id = %caller, "Recipe deleted");
        Ok(recipe)
    }

    /// Recipes owned by `caller`.
    pub async fn mine(&self, caller: &UserId) -> ApiResult<Vec<Recipe>> {
        Ok(self
            .store
            .list_recipes_by_owners(std::slice::from_ref(caller))
            .await?)
    }

    async fn load(&self, id: &RecipeId) -> ApiResult<Versioned<Recipe>> {
        self.store
            .get_recipe(id)
            .await?
            .ok_or_else(|| ApiError::not_found(RECIPE_NOT_FOUND))
    }

    async fn load_owned(&self, caller: &UserId, id: &RecipeId) -> ApiResult<Versioned<Recipe>> {
        let recipe = self.load(id).await?;
        if !recipe.value.is_owned_by(caller) {
            warn!(recipe_id = %id, user_id = %caller, "Rejected change to a recipe not owned by caller");
            return Err(ApiError::forbidden(NOT_OWNER));
        }
        Ok(recipe)
    }
}
