//! Follow graph mutations.
//!
//! An edge lives on both ends: the follower's `following` and the followee's
//! `followers`. Both documents are committed together so the two sides never
//! disagree.

use std::sync::Arc;

use tracing::info;

use rk_models::{User, UserId};
use rk_store::{DocumentStore, StoreWrite, Versioned};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::services::identity::USER_NOT_FOUND;
use crate::services::retry::with_optimistic_retry;

pub const FOLLOW_SELF: &str = "You cannot follow yourself";
pub const ALREADY_FOLLOWING: &str = "You are already following this user";
pub const NOT_FOLLOWING: &str = "You are not following this user";
pub const FOLLOWED: &str = "Followed successfully";
pub const UNFOLLOWED: &str = "Unfollowed successfully";

#[derive(Clone)]
pub struct SocialService {
    store: Arc<dyn DocumentStore>,
}

impl SocialService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn follow(&self, caller: &UserId, target: &UserId) -> ApiResult<()> {
        if caller == target {
            return Err(ApiError::bad_request(FOLLOW_SELF));
        }

        with_optimistic_retry("follow", move || async move {
            let (mut me, mut them) = self.load_pair(caller, target).await?;
            if them.value.is_followed_by(caller) || me.value.following.contains(target) {
                return Err(ApiError::bad_request(ALREADY_FOLLOWING));
            }

            me.value.following.push(target.clone());
            them.value.followers.push(caller.clone());
            self.commit_pair(me, them).await
        })
        .await?;

        metrics::record_follow_change("follow");
        info!(user_id = %caller, target_id = %target, "User followed");
        Ok(())
    }

    pub async fn unfollow(&self, caller: &UserId, target: &UserId) -> ApiResult<()> {
        with_optimistic_retry("unfollow", move || async move {
            let (mut me, mut them) = self.load_pair(caller, target).await?;
            if !them.value.is_followed_by(caller) && !me.value.following.contains(target) {
                return Err(ApiError::bad_request(NOT_FOLLOWING));
            }

            me.value.following.retain(|id| id != target);
            them.value.followers.retain(|id| id != caller);
            self.commit_pair(me, them).await
        })
        .await?;

        metrics::record_follow_change("unfollow");
        info!(user_id = %caller, target_id = %target, "User unfollowed");
        Ok(())
    }

    async fn load_pair(
        &self,
        caller: &UserId,
        target: &UserId,
    ) -> ApiResult<(Versioned<User>, Versioned<User>)> {
        let them = self.load(target).await?;
        let me = self.load(caller).await?;
        Ok((me, them))
    }

    async fn load(&self, id: &UserId) -> ApiResult<Versioned<User>> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| ApiError::not_found(USER_NOT_FOUND))
    }

    async fn commit_pair(&self, mut me: Versioned<User>, mut them: Versioned<User>) -> ApiResult<()> {
        me.value.touch();
        them.value.touch();
        self.store
            .commit(vec![StoreWrite::user(me), StoreWrite::user(them)])
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rk_models::PasswordHash;
    use rk_store::MemoryStore;

    async fn setup() -> (Arc<MemoryStore>, SocialService, UserId, UserId) {
        let store = Arc::new(MemoryStore::new());
        let a = User::new("a", PasswordHash::from_phc("$argon2id$a"), "i", "b");
        let b = User::new("b", PasswordHash::from_phc("$argon2id$b"), "i", "b");
        store.create_user(&a).await.unwrap();
        store.create_user(&b).await.unwrap();
        let svc = SocialService::new(store.clone());
        (store, svc, a.id, b.id)
    }

    async fn user(store: &MemoryStore, id: &UserId) -> User {
        store.get_user(id).await.unwrap().unwrap().value
    }

    #[tokio::test]
    async fn test_follow_is_symmetric_and_not_duplicated() {
        let (store, svc, a, b) = setup().await;
        svc.follow(&a, &b).await.unwrap();

        assert_eq!(user(&store, &a).await.following, vec![b.clone()]);
        assert_eq!(user(&store, &b).await.followers, vec![a.clone()]);

        let err = svc.follow(&a, &b).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == ALREADY_FOLLOWING));
        assert_eq!(user(&store, &b).await.followers.len(), 1);
    }

    #[tokio::test]
    async fn test_unfollow_removes_both_sides() {
        let (store, svc, a, b) = setup().await;
        svc.follow(&a, &b).await.unwrap();
        svc.unfollow(&a, &b).await.unwrap();

        assert!(user(&store, &a).await.following.is_empty());
        assert!(user(&store, &b).await.followers.is_empty());

        let err = svc.unfollow(&a, &b).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == NOT_FOLLOWING));
    }

    #[tokio::test]
    async fn test_self_and_unknown_targets() {
        let (_, svc, a, _) = setup().await;
        let err = svc.follow(&a, &a).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == FOLLOW_SELF));

        let err = svc.follow(&a, &UserId::from("ghost")).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(ref m) if m == USER_NOT_FOUND));
    }
}
