//! Rating aggregation.
//!
//! Submitting a rating touches two documents: the rater's history and the
//! recipe's displayed rating. Both go out in one commit guarded by the
//! versions that were read, and the whole attempt is retried on contention.
//!
//! How the displayed rating is derived depends on [`RatingPolicy`]:
//!
//! - `PerRecipe`: mean of every rating the recipe has received, kept as a
//!   running count and total on the recipe.
//! - `OwnerHistory`: mean of the ratings the recipe's owner has *given* to
//!   other recipes. Left unchanged when the owner has never rated anything.

use std::sync::Arc;

use tracing::{info, warn};

use rk_models::{Rating, RatingEntry, Recipe, RecipeId, User, UserId};
use rk_store::{DocumentStore, StoreWrite};

use crate::config::RatingPolicy;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::services::catalog::{OWNER_NOT_FOUND, RECIPE_NOT_FOUND};
use crate::services::identity::USER_NOT_FOUND;
use crate::services::retry::with_optimistic_retry;

pub const OWN_RECIPE: &str = "You cannot rate your own recipe";
pub const ALREADY_RATED: &str = "You have already rated this recipe";
pub const RATING_SUBMITTED: &str = "Rating submitted successfully";

#[derive(Clone)]
pub struct RatingService {
    store: Arc<dyn DocumentStore>,
    policy: RatingPolicy,
}

impl RatingService {
    pub fn new(store: Arc<dyn DocumentStore>, policy: RatingPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> RatingPolicy {
        self.policy
    }

    /// Record `caller`'s rating of a recipe and refresh the recipe's rating.
    /// Returns the recipe as stored.
    pub async fn rate(
        &self,
        caller: &UserId,
        recipe_id: &RecipeId,
        rating: Rating,
    ) -> ApiResult<Recipe> {
        let recipe = with_optimistic_retry("rate_recipe", move || {
            self.try_rate(caller, recipe_id, rating)
        })
        .await?;

        metrics::record_rating(self.policy.as_str());
        info!(
            recipe_id = %recipe_id,
            user_id = %caller,
            rating = rating.value(),
            new_rating = recipe.rating,
            policy = self.policy.as_str(),
            "Recipe rated"
        );
        Ok(recipe)
    }

    async fn try_rate(
        &self,
        caller: &UserId,
        recipe_id: &RecipeId,
        rating: Rating,
    ) -> ApiResult<Recipe> {
        let mut recipe = self
            .store
            .get_recipe(recipe_id)
            .await?
            .ok_or_else(|| ApiError::not_found(RECIPE_NOT_FOUND))?;

        if recipe.value.is_owned_by(caller) {
            warn!(recipe_id = %recipe_id, user_id = %caller, "Rejected rating of own recipe");
            return Err(ApiError::bad_request(OWN_RECIPE));
        }

        let mut rater = self
            .store
            .get_user(caller)
            .await?
            .ok_or_else(|| ApiError::not_found(USER_NOT_FOUND))?;

        if rater.value.has_rated(recipe_id) {
            return Err(ApiError::bad_request(ALREADY_RATED));
        }

        rater.value.ratings.push(RatingEntry {
            recipe_id: recipe_id.clone(),
            rating,
        });
        rater.value.touch();

        match self.policy {
            RatingPolicy::PerRecipe => recipe.value.record_rating(rating.value()),
            RatingPolicy::OwnerHistory => {
                let owner = self
                    .store
                    .get_user(&recipe.value.user_id)
                    .await?
                    .ok_or_else(|| ApiError::not_found(OWNER_NOT_FOUND))?;
                let previous = recipe.value.rating;
                recipe.value.record_rating(rating.value());
                recipe
                    .value
                    .set_rating(owner_history_rating(&owner.value).unwrap_or(previous));
            }
        }

        let updated = recipe.value.clone();
        self.store
            .commit(vec![StoreWrite::user(rater), StoreWrite::recipe(recipe)])
            .await?;
        Ok(updated)
    }
}

/// Mean of the ratings `owner` has given, or `None` if they never rated.
fn owner_history_rating(owner: &User) -> Option<f64> {
    match owner.given_ratings_summary() {
        (_, 0) => None,
        (sum, count) => Some(sum / f64::from(count)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rk_models::{PasswordHash, RecipeDraft};
    use rk_store::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        owner: User,
        rater: User,
        recipe: Recipe,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let owner = User::new("owner", PasswordHash::from_phc("$argon2id$x"), "i", "b");
        let rater = User::new("rater", PasswordHash::from_phc("$argon2id$y"), "i", "b");
        store.create_user(&owner).await.unwrap();
        store.create_user(&rater).await.unwrap();

        let draft = RecipeDraft {
            name: "Soup".to_string(),
            ingredients: vec!["water".to_string()],
            image: "i".to_string(),
            link: "https://example.com/soup".to_string(),
            description: "d".to_string(),
            category: None,
            steps: vec!["boil".to_string()],
        };
        let recipe = Recipe::from_draft(draft, owner.id.clone());
        store.create_recipe(&recipe).await.unwrap();

        Fixture {
            store,
            owner,
            rater,
            recipe,
        }
    }

    fn stars(v: f64) -> Rating {
        Rating::new(v).unwrap()
    }

    #[tokio::test]
    async fn test_per_recipe_uses_received_ratings() {
        let f = fixture().await;
        let svc = RatingService::new(f.store.clone(), RatingPolicy::PerRecipe);

        let rated = svc.rate(&f.rater.id, &f.recipe.id, stars(4.0)).await.unwrap();
        assert_eq!(rated.rating, 4.0);
        assert_eq!(rated.rating_count, 1);

        let rater = f.store.get_user(&f.rater.id).await.unwrap().unwrap().value;
        assert!(rater.has_rated(&f.recipe.id));
    }

    #[tokio::test]
    async fn test_owner_history_without_history_keeps_rating() {
        let f = fixture().await;
        let svc = RatingService::new(f.store.clone(), RatingPolicy::OwnerHistory);

        let rated = svc.rate(&f.rater.id, &f.recipe.id, stars(4.0)).await.unwrap();
        assert_eq!(rated.rating, 0.0);
        // counters are still maintained
        assert_eq!(rated.rating_count, 1);
    }

    #[tokio::test]
    async fn test_owner_history_uses_ratings_owner_gave() {
        let f = fixture().await;
        let mut owner = f.store.get_user(&f.owner.id).await.unwrap().unwrap();
        owner.value.ratings.push(RatingEntry {
            recipe_id: RecipeId::from("elsewhere"),
            rating: stars(2.0),
        });
        f.store.commit(vec![StoreWrite::user(owner)]).await.unwrap();

        let svc = RatingService::new(f.store.clone(), RatingPolicy::OwnerHistory);
        let rated = svc.rate(&f.rater.id, &f.recipe.id, stars(5.0)).await.unwrap();
        assert_eq!(rated.rating, 2.0);
    }

    #[tokio::test]
    async fn test_cannot_rate_own_or_twice() {
        let f = fixture().await;
        let svc = RatingService::new(f.store.clone(), RatingPolicy::PerRecipe);

        let err = svc.rate(&f.owner.id, &f.recipe.id, stars(5.0)).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == OWN_RECIPE));

        svc.rate(&f.rater.id, &f.recipe.id, stars(3.0)).await.unwrap();
        let err = svc.rate(&f.rater.id, &f.recipe.id, stars(1.0)).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == ALREADY_RATED));

        let recipe = f.store.get_recipe(&f.recipe.id).await.unwrap().unwrap().value;
        assert_eq!(recipe.rating_count, 1);
        assert_eq!(recipe.rating, 3.0);
    }

    #[tokio::test]
    async fn test_concurrent_ratings_are_not_lost() {
        let f = fixture().await;
        let svc = RatingService::new(f.store.clone(), RatingPolicy::PerRecipe);

        let mut raters = Vec::new();
        for i in 0..4 {
            let u = User::new(format!("r{}", i), PasswordHash::from_phc("$argon2id$z"), "i", "b");
            f.store.create_user(&u).await.unwrap();
            raters.push(u.id);
        }

        let tasks: Vec<_> = raters
            .iter()
            .map(|id| {
                let svc = svc.clone();
                let id = id.clone();
                let recipe_id = f.recipe.id.clone();
                tokio::spawn(async move { svc.rate(&id, &recipe_id, stars(4.0)).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let recipe = f.store.get_recipe(&f.recipe.id).await.unwrap().unwrap().value;
        assert_eq!(recipe.rating_count, 4);
        assert_eq!(recipe.rating, 4.0);
    }

    #[test]
    fn test_owner_history_rating() {
        let mut owner = User::new("o", PasswordHash::from_phc("$argon2id$x"), "i", "b");
        assert_eq!(owner_history_rating(&owner), None);
        owner.ratings.push(RatingEntry {
            recipe_id: RecipeId::from("a"),
            rating: stars(1.0),
        });
        owner.ratings.push(RatingEntry {
            recipe_id: RecipeId::from("b"),
            rating: stars(4.0),
        });
        assert_eq!(owner_history_rating(&owner), Some(2.5));
    }
}
