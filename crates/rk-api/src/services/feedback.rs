//! Comments left on a recipe, stored as feedback on the recipe's owner.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use validator::Validate;

use rk_models::{CommentRequest, FeedbackEntry, RecipeId, UserId};
use rk_store::{DocumentStore, StoreWrite};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::services::catalog::{OWNER_NOT_FOUND, RECIPE_NOT_FOUND};
use crate::services::retry::with_optimistic_retry;

pub const COMMENT_SUBMITTED: &str = "Comment submitted successfully";

#[derive(Clone)]
pub struct FeedbackService {
    store: Arc<dyn DocumentStore>,
}

impl FeedbackService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Append `caller`'s comment (and optional rating) to the feedback of
    /// the user who owns the recipe.
    pub async fn comment(
        &self,
        caller: &UserId,
        recipe_id: &RecipeId,
        request: CommentRequest,
    ) -> ApiResult<()> {
        request.validate()?;

        let owner_id = with_optimistic_retry("comment_recipe", move || {
            let request = request.clone();
            async move {
                let recipe = self
                    .store
                    .get_recipe(recipe_id)
                    .await?
                    .ok_or_else(|| ApiError::not_found(RECIPE_NOT_FOUND))?;
                let mut owner = self
                    .store
                    .get_user(&recipe.value.user_id)
                    .await?
                    .ok_or_else(|| ApiError::not_found(OWNER_NOT_FOUND))?;

                owner.value.feedback.push(FeedbackEntry {
                    rating: request.rating,
                    comment: Some(request.comment),
                    user_id: caller.clone(),
                    created_at: Utc::now(),
                });
                owner.value.touch();

                let owner_id = owner.value.id.clone();
                self.store.commit(vec![StoreWrite::user(owner)]).await?;
                Ok(owner_id)
            }
        })
        .await?;

        metrics::record_comment();
        info!(recipe_id = %recipe_id, user_id = %caller, owner_id = %owner_id, "Comment added");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rk_models::{PasswordHash, Rating, Recipe, RecipeDraft, User};
    use rk_store::MemoryStore;

    #[tokio::test]
    async fn test_comment_lands_on_owner_feedback() {
        let store = Arc::new(MemoryStore::new());
        let owner = User::new("owner", PasswordHash::from_phc("$argon2id$x"), "i", "b");
        store.create_user(&owner).await.unwrap();
        let recipe = Recipe::from_draft(
            RecipeDraft {
                name: "Tea".to_string(),
                ingredients: vec!["leaves".to_string()],
                image: "i".to_string(),
                link: "https://example.com/tea".to_string(),
                description: "d".to_string(),
                category: None,
                steps: vec!["steep".to_string()],
            },
            owner.id.clone(),
        );
        store.create_recipe(&recipe).await.unwrap();

        let svc = FeedbackService::new(store.clone());
        let commenter = UserId::from("commenter");
        svc.comment(
            &commenter,
            &recipe.id,
            CommentRequest {
                comment: "Lovely".to_string(),
                rating: Some(Rating::new(4.0).unwrap()),
            },
        )
        .await
        .unwrap();

        let owner = store.get_user(&owner.id).await.unwrap().unwrap().value;
        assert_eq!(owner.feedback.len(), 1);
        assert_eq!(owner.feedback[0].user_id, commenter);
        assert_eq!(owner.feedback[0].comment.as_deref(), Some("Lovely"));
        assert_eq!(owner.average_rating(), 4.0);
    }

    #[tokio::test]
    async fn test_comment_on_missing_recipe() {
        let svc = FeedbackService::new(Arc::new(MemoryStore::new()));
        let err = svc
            .comment(
                &UserId::from("u"),
                &RecipeId::from("missing"),
                CommentRequest {
                    comment: "hi".to_string(),
                    rating: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(ref m) if m == RECIPE_NOT_FOUND));
    }
}
