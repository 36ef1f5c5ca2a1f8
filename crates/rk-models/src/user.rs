//! User documents and their public projection.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{RecipeId, UserId};
use crate::rating::{self, Rating};

/// Stored credential in PHC string form.
///
/// Deliberately not `Serialize`: the only way a hash leaves the process is
/// through the store adapters.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn from_phc(phc: impl Into<String>) -> Self {
        Self(phc.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}

/// Feedback left about a user's recipes collectively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEntry {
    /// Optional star rating attached to the feedback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// Author of the feedback.
    pub user_id: UserId,

    pub created_at: DateTime<Utc>,
}

/// Record that this user rated a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RatingEntry {
    pub recipe_id: RecipeId,
    pub rating: Rating,
}

/// User record as persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password: PasswordHash,
    pub image: String,
    pub bio: String,
    /// Who follows this user.
    pub followers: Vec<UserId>,
    /// Whom this user follows.
    pub following: Vec<UserId>,
    pub feedback: Vec<FeedbackEntry>,
    pub ratings: Vec<RatingEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a fresh user with empty social edges and history.
    pub fn new(
        username: impl Into<String>,
        password: PasswordHash,
        image: impl Into<String>,
        bio: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            username: username.into(),
            password,
            image: image.into(),
            bio: bio.into(),
            followers: Vec::new(),
            following: Vec::new(),
            feedback: Vec::new(),
            ratings: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Mean of the ratings attached to feedback, or 0 when there are none.
    pub fn average_rating(&self) -> f64 {
        rating::mean(self.feedback.iter().filter_map(|f| f.rating))
    }

    /// True if this user already rated the recipe.
    pub fn has_rated(&self, recipe_id: &RecipeId) -> bool {
        self.ratings.iter().any(|r| &r.recipe_id == recipe_id)
    }

    /// True if `other` is among this user's followers.
    pub fn is_followed_by(&self, other: &UserId) -> bool {
        self.followers.contains(other)
    }

    /// Sum and count of the ratings this user has given to recipes.
    pub fn given_ratings_summary(&self) -> (f64, u32) {
        self.ratings
            .iter()
            .fold((0.0, 0), |(sum, count), r| (sum + r.rating.value(), count + 1))
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Projection that is safe to return to clients.
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            username: self.username.clone(),
            image: self.image.clone(),
            bio: self.bio.clone(),
            followers: self.followers.clone(),
            following: self.following.clone(),
            feedback: self.feedback.clone(),
            ratings: self.ratings.clone(),
            average_rating: self.average_rating(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// User as returned by every listing and fetch route. Has no credential field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub username: String,
    pub image: String,
    pub bio: String,
    pub followers: Vec<UserId>,
    pub following: Vec<UserId>,
    pub feedback: Vec<FeedbackEntry>,
    pub ratings: Vec<RatingEntry>,
    pub average_rating: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        user.to_public()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User::new("alice", PasswordHash::from_phc("$argon2id$stub"), "img.png", "hi")
    }

    fn feedback(rating: Option<f64>) -> FeedbackEntry {
        FeedbackEntry {
            rating: rating.map(|r| Rating::new(r).unwrap()),
            comment: Some("nice".to_string()),
            user_id: UserId::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_average_rating_empty_is_zero() {
        assert_eq!(user().average_rating(), 0.0);
    }

    #[test]
    fn test_average_rating_ignores_unrated_feedback() {
        let mut u = user();
        u.feedback.push(feedback(Some(4.0)));
        u.feedback.push(feedback(Some(2.0)));
        u.feedback.push(feedback(None));
        assert_eq!(u.average_rating(), 3.0);
    }

    #[test]
    fn test_public_projection_has_no_password() {
        let u = user();
        let json = serde_json::to_value(u.to_public()).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["_id"], u.id.as_str());
        assert_eq!(json["averageRating"], 0.0);
    }

    #[test]
    fn test_password_hash_debug_is_redacted() {
        let u = user();
        assert!(!format!("{:?}", u).contains("$argon2id$stub"));
    }

    #[test]
    fn test_has_rated() {
        let mut u = user();
        let recipe = RecipeId::new();
        assert!(!u.has_rated(&recipe));
        u.ratings.push(RatingEntry {
            recipe_id: recipe.clone(),
            rating: Rating::new(3.0).unwrap(),
        });
        assert!(u.has_rated(&recipe));
        assert_eq!(u.given_ratings_summary(), (3.0, 1));
    }
}
