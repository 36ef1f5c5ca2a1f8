//! Storage port used by the API services.
//!
//! Reads hand back a [`Versioned`] value. Writes that depend on a read go
//! through [`DocumentStore::commit`] with the version they saw, and the
//! whole batch fails with [`crate::StoreError::PreconditionFailed`] if any of those
//! documents changed in between.

use async_trait::async_trait;
use rk_models::{Recipe, RecipeId, User, UserId};

use crate::error::StoreResult;

/// Opaque document version. For Firestore this is the document update time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version(pub String);

impl Version {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A value together with the version it was read at.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub value: T,
    pub version: Version,
}

impl<T> Versioned<T> {
    pub fn new(value: T, version: Version) -> Self {
        Self { value, version }
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

/// One write in an atomic commit. `expected` is the version the caller read;
/// the write only applies if the stored document still has it.
#[derive(Debug, Clone)]
pub enum StoreWrite {
    PutUser { user: User, expected: Version },
    PutRecipe { recipe: Recipe, expected: Version },
}

impl StoreWrite {
    pub fn user(versioned: Versioned<User>) -> Self {
        Self::PutUser {
            user: versioned.value,
            expected: versioned.version,
        }
    }

    pub fn recipe(versioned: Versioned<Recipe>) -> Self {
        Self::PutRecipe {
            recipe: versioned.value,
            expected: versioned.version,
        }
    }
}

/// Persistence for users and recipes.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name for logs and the readiness probe.
    fn backend(&self) -> &'static str;

    /// Cheap round trip to check the backend is reachable.
    async fn ping(&self) -> StoreResult<()>;

    /// Insert a user and claim its username. Fails with `AlreadyExists`
    /// if the username is taken.
    async fn create_user(&self, user: &User) -> StoreResult<()>;

    async fn get_user(&self, id: &UserId) -> StoreResult<Option<Versioned<User>>>;

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// Every user, oldest first.
    async fn list_users(&self) -> StoreResult<Vec<User>>;

    async fn create_recipe(&self, recipe: &Recipe) -> StoreResult<()>;

    async fn get_recipe(&self, id: &RecipeId) -> StoreResult<Option<Versioned<Recipe>>>;

    /// Every recipe, oldest first.
    async fn list_recipes(&self) -> StoreResult<Vec<Recipe>>;

    /// Recipes owned by any of `owners`, oldest first.
    async fn list_recipes_by_owners(&self, owners: &[UserId]) -> StoreResult<Vec<Recipe>>;

    /// Delete a recipe if it is still at `expected`.
    async fn delete_recipe(&self, id: &RecipeId, expected: &Version) -> StoreResult<()>;

    /// Apply all writes atomically, or none of them.
    async fn commit(&self, writes: Vec<StoreWrite>) -> StoreResult<()>;
}
