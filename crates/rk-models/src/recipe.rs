//! Recipe documents, create/update payloads and the owner-expanded view.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use crate::ids::{RecipeId, UserId};
use crate::user::PublicUser;

/// Recipe category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum RecipeCategory {
    Healthy,
    Party,
}

impl RecipeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipeCategory::Healthy => "Healthy",
            RecipeCategory::Party => "Party",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Healthy" => Some(RecipeCategory::Healthy),
            "Party" => Some(RecipeCategory::Party),
            _ => None,
        }
    }
}

impl fmt::Display for RecipeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recipe as persisted and listed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    #[serde(rename = "_id")]
    pub id: RecipeId,
    pub name: String,
    pub ingredients: Vec<String>,
    pub image: String,
    pub link: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<RecipeCategory>,
    pub steps: Vec<String>,
    /// Displayed rating, 0..=5.
    #[serde(default)]
    pub rating: f64,
    /// Owner. Immutable after creation.
    pub user_id: UserId,
    /// Number of ratings received.
    #[serde(default)]
    pub rating_count: u32,
    /// Sum of ratings received.
    #[serde(default)]
    pub rating_total: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recipe {
    /// Build a new recipe owned by `owner` from a validated draft.
    pub fn from_draft(draft: RecipeDraft, owner: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: RecipeId::new(),
            name: draft.name,
            ingredients: draft.ingredients,
            image: draft.image,
            link: draft.link,
            description: draft.description,
            category: draft.category,
            steps: draft.steps,
            rating: 0.0,
            user_id: owner,
            rating_count: 0,
            rating_total: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    /// Fold one more received rating into the counters and recompute the mean.
    pub fn record_rating(&mut self, value: f64) {
        self.rating_count += 1;
        self.rating_total += value;
        self.rating = clamp_rating(self.rating_total / f64::from(self.rating_count));
        self.updated_at = Utc::now();
    }

    /// Set the displayed rating from an externally computed aggregate.
    pub fn set_rating(&mut self, value: f64) {
        self.rating = clamp_rating(value);
        self.updated_at = Utc::now();
    }

    /// Apply a partial update. Owner and rating fields are not part of a patch.
    pub fn apply_patch(&mut self, patch: RecipePatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(ingredients) = patch.ingredients {
            self.ingredients = ingredients;
        }
        if let Some(image) = patch.image {
            self.image = image;
        }
        if let Some(link) = patch.link {
            self.link = link;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(category) = patch.category {
            self.category = Some(category);
        }
        if let Some(steps) = patch.steps {
            self.steps = steps;
        }
        self.updated_at = Utc::now();
    }

    /// Combine with the owner's public profile, as served by the single-recipe route.
    pub fn with_owner(self, owner: PublicUser) -> RecipeWithOwner {
        RecipeWithOwner {
            id: self.id,
            name: self.name,
            ingredients: self.ingredients,
            image: self.image,
            link: self.link,
            description: self.description,
            category: self.category,
            steps: self.steps,
            rating: self.rating,
            user_id: owner,
            rating_count: self.rating_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

fn clamp_rating(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 5.0)
    } else {
        0.0
    }
}

/// Recipe with its owner reference expanded into the owner's profile.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipeWithOwner {
    #[serde(rename = "_id")]
    pub id: RecipeId,
    pub name: String,
    pub ingredients: Vec<String>,
    pub image: String,
    pub link: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<RecipeCategory>,
    pub steps: Vec<String>,
    pub rating: f64,
    pub user_id: PublicUser,
    pub rating_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create payload. Any owner field sent by the client is ignored.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDraft {
    #[serde(default)]
    #[validate(length(min = 1, message = "Please enter a Recipe Name"))]
    pub name: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "is required"))]
    pub ingredients: Vec<String>,

    #[serde(default)]
    #[validate(length(min = 1, message = "is required"))]
    pub image: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "is required"))]
    pub link: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "is required"))]
    pub description: String,

    #[serde(default)]
    pub category: Option<RecipeCategory>,

    #[serde(default)]
    #[validate(length(min = 1, message = "is required"))]
    pub steps: Vec<String>,
}

/// Partial update payload.
///
/// Has no `userId`, `rating` or counter fields; unknown keys in the request
/// body are dropped during deserialization, so an owner reference in the body
/// can never reach the stored document.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecipePatch {
    #[validate(length(min = 1, message = "Please enter a Recipe Name"))]
    pub name: Option<String>,

    #[validate(length(min = 1, message = "cannot be empty"))]
    pub ingredients: Option<Vec<String>>,

    #[validate(length(min = 1, message = "cannot be empty"))]
    pub image: Option<String>,

    #[validate(length(min = 1, message = "cannot be empty"))]
    pub link: Option<String>,

    #[validate(length(min = 1, message = "cannot be empty"))]
    pub description: Option<String>,

    pub category: Option<RecipeCategory>,

    #[validate(length(min = 1, message = "cannot be empty"))]
    pub steps: Option<Vec<String>>,
}
