//! In-process [`DocumentStore`] used for local development and tests.
//!
//! Versions come from a single counter bumped on every write, so a stale
//! version is detected the same way Firestore detects a stale update time.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use rk_models::{Recipe, RecipeId, User, UserId};

use crate::error::{StoreError, StoreResult};
use crate::port::{DocumentStore, StoreWrite, Version, Versioned};

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, (User, u64)>,
    usernames: HashMap<String, UserId>,
    recipes: HashMap<RecipeId, (Recipe, u64)>,
    clock: u64,
}

impl Tables {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

fn version(v: u64) -> Version {
    Version(v.to_string())
}

fn check(path: String, current: Option<u64>, expected: &Version) -> StoreResult<()> {
    match current {
        Some(v) if version(v) == *expected => Ok(()),
        Some(_) => Err(StoreError::PreconditionFailed(format!(
            "{} changed since it was read",
            path
        ))),
        None => Err(StoreError::not_found(path)),
    }
}

/// Store that keeps every document in memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_user(&self, user: &User) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.usernames.contains_key(&user.username) {
            return Err(StoreError::AlreadyExists(user.username.clone()));
        }
        if tables.users.contains_key(&user.id) {
            return Err(StoreError::AlreadyExists(format!("users/{}", user.id)));
        }

        let v = tables.tick();
        tables
            .usernames
            .insert(user.username.clone(), user.id.clone());
        tables.users.insert(user.id.clone(), (user.clone(), v));
        Ok(())
    }

    async fn get_user(&self, id: &UserId) -> StoreResult<Option<Versioned<User>>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .get(id)
            .map(|(user, v)| Versioned::new(user.clone(), version(*v))))
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .usernames
            .get(username)
            .and_then(|id| tables.users.get(id))
            .map(|(user, _)| user.clone()))
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables.users.values().map(|(u, _)| u.clone()).collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn create_recipe(&self, recipe: &Recipe) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.recipes.contains_key(&recipe.id) {
            return Err(StoreError::AlreadyExists(format!("recipes/{}", recipe.id)));
        }
        let v = tables.tick();
        tables.recipes.insert(recipe.id.clone(), (recipe.clone(), v));
        Ok(())
    }

    async fn get_recipe(&self, id: &RecipeId) -> StoreResult<Option<Versioned<Recipe>>> {
        let tables = self.tables.read().await;
        Ok(tables
            .recipes
            .get(id)
            .map(|(recipe, v)| Versioned::new(recipe.clone(), version(*v))))
    }

    async fn list_recipes(&self) -> StoreResult<Vec<Recipe>> {
        let tables = self.tables.read().await;
        let mut recipes: Vec<Recipe> = tables.recipes.values().map(|(r, _)| r.clone()).collect();
        recipes.sort_by_key(|r| r.created_at);
        Ok(recipes)
    }

    async fn list_recipes_by_owners(&self, owners: &[UserId]) -> StoreResult<Vec<Recipe>> {
        let tables = self.tables.read().await;
        let mut recipes: Vec<Recipe> = tables
            .recipes
            .values()
            .filter(|(r, _)| owners.contains(&r.user_id))
            .map(|(r, _)| r.clone())
            .collect();
        recipes.sort_by_key(|r| r.created_at);
        Ok(recipes)
    }

    async fn delete_recipe(&self, id: &RecipeId, expected: &Version) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let current = tables.recipes.get(id).map(|(_, v)| *v);
        check(format!("recipes/{}", id), current, expected)?;
        tables.recipes.remove(id);
        Ok(())
    }

    async fn commit(&self, writes: Vec<StoreWrite>) -> StoreResult<()> {
        let mut tables = self.tables.write().await;

        // Validate every precondition before touching anything.
        for write in &writes {
            match write {
                StoreWrite::PutUser { user, expected } => {
                    let current = tables.users.get(&user.id).map(|(_, v)| *v);
                    check(format!("users/{}", user.id), current, expected)?;
                }
                StoreWrite::PutRecipe { recipe, expected } => {
                    let current = tables.recipes.get(&recipe.id).map(|(_, v)| *v);
                    check(format!("recipes/{}", recipe.id), current, expected)?;
                }
            }
        }

        let v = tables.tick();
        for write in writes {
            match write {
                StoreWrite::PutUser { user, .. } => {
                    tables.users.insert(user.id.clone(), (user, v));
                }
                StoreWrite::PutRecipe { recipe, .. } => {
                    tables.recipes.insert(recipe.id.clone(), (recipe, v));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rk_models::{PasswordHash, RecipeDraft};

    fn user(name: &str) -> User {
        User::new(name, PasswordHash::from_phc("$argon2id$stub"), "img", "bio")
    }

    fn recipe(owner: &UserId) -> Recipe {
        Recipe::from_draft(
            RecipeDraft {
                name: "Soup".to_string(),
                ..RecipeDraft::default()
            },
            owner.clone(),
        )
    }

    #[tokio::test]
    async fn test_username_is_unique() {
        let store = MemoryStore::new();
        store.create_user(&user("alice")).await.unwrap();
        let err = store.create_user(&user("alice")).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_find_by_username() {
        let store = MemoryStore::new();
        let alice = user("alice");
        store.create_user(&alice).await.unwrap();
        let found = store.find_user_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found.id, alice.id);
        assert!(store.find_user_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_commit_writes_nothing() {
        let store = MemoryStore::new();
        let alice = user("alice");
        let bob = user("bob");
        store.create_user(&alice).await.unwrap();
        store.create_user(&bob).await.unwrap();

        let a1 = store.get_user(&alice.id).await.unwrap().unwrap();
        let b1 = store.get_user(&bob.id).await.unwrap().unwrap();

        // A concurrent writer updates bob first.
        let mut b_other = b1.clone();
        b_other.value.bio = "changed".to_string();
        store.commit(vec![StoreWrite::user(b_other)]).await.unwrap();

        let mut a_mine = a1.clone();
        a_mine.value.following.push(bob.id.clone());
        let mut b_mine = b1;
        b_mine.value.followers.push(alice.id.clone());
        let err = store
            .commit(vec![StoreWrite::user(a_mine), StoreWrite::user(b_mine)])
            .await
            .unwrap_err();
        assert!(err.is_precondition_failed());

        // alice's write was not applied either
        let a2 = store.get_user(&alice.id).await.unwrap().unwrap();
        assert!(a2.value.following.is_empty());
        assert_eq!(a2.version, a1.version);
    }

    #[tokio::test]
    async fn test_recipes_by_owner_and_delete() {
        let store = MemoryStore::new();
        let owner = UserId::new();
        let other = UserId::new();
        let mine = recipe(&owner);
        store.create_recipe(&mine).await.unwrap();
        store.create_recipe(&recipe(&other)).await.unwrap();

        let owned = store.list_recipes_by_owners(&[owner.clone()]).await.unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].id, mine.id);

        let current = store.get_recipe(&mine.id).await.unwrap().unwrap();
        store.delete_recipe(&mine.id, &current.version).await.unwrap();
        assert!(store.get_recipe(&mine.id).await.unwrap().is_none());
        assert_eq!(store.list_recipes().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_with_stale_version_fails() {
        let store = MemoryStore::new();
        let r = recipe(&UserId::new());
        store.create_recipe(&r).await.unwrap();
        let stale = store.get_recipe(&r.id).await.unwrap().unwrap();

        let mut updated = stale.clone();
        updated.value.name = "Stew".to_string();
        store.commit(vec![StoreWrite::recipe(updated)]).await.unwrap();

        let err = store.delete_recipe(&r.id, &stale.version).await.unwrap_err();
        assert!(err.is_precondition_failed());
    }
}
