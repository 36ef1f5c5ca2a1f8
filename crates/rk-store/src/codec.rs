//! Conversion between domain models and Firestore documents.
//!
//! Stored field names are snake_case. Every document carries `created_at`
//! and `updated_at` timestamps.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use rk_models::{
    FeedbackEntry, PasswordHash, Rating, RatingEntry, Recipe, RecipeCategory, RecipeId, User,
    UserId,
};

use crate::error::{StoreError, StoreResult};
use crate::types::{ArrayValue, Document, FromFirestoreValue, ToFirestoreValue, Value};

pub const USERS: &str = "users";
pub const RECIPES: &str = "recipes";
pub const USERNAMES: &str = "usernames";

/// Document id of the username index entry.
///
/// Percent-encoded and prefixed so that any username maps to a legal
/// Firestore id (no `/`, never `.` or `..`).
pub fn username_key(username: &str) -> String {
    format!("u_{}", urlencoding::encode(username))
}

type Fields = HashMap<String, Value>;

fn fields_of(doc: &Document) -> StoreResult<&Fields> {
    doc.fields
        .as_ref()
        .ok_or_else(|| StoreError::invalid_document("Document has no fields"))
}

fn doc_id(doc: &Document) -> StoreResult<String> {
    doc.id()
        .map(str::to_string)
        .ok_or_else(|| StoreError::invalid_document("Document has no name"))
}

fn get<T: FromFirestoreValue>(fields: &Fields, key: &str) -> Option<T> {
    fields.get(key).and_then(T::from_firestore_value)
}

fn require<T: FromFirestoreValue>(fields: &Fields, key: &str) -> StoreResult<T> {
    get(fields, key).ok_or_else(|| StoreError::invalid_document(format!("missing field `{}`", key)))
}

fn timestamp(fields: &Fields, key: &str) -> DateTime<Utc> {
    get(fields, key).unwrap_or_else(Utc::now)
}

fn ids_to_value(ids: &[UserId]) -> Value {
    ids.iter()
        .map(|id| id.as_str().to_string())
        .collect::<Vec<String>>()
        .to_firestore_value()
}

fn ids_from(fields: &Fields, key: &str) -> Vec<UserId> {
    get::<Vec<String>>(fields, key)
        .unwrap_or_default()
        .into_iter()
        .map(UserId::from)
        .collect()
}

// ============================================================================
// Users
// ============================================================================

fn feedback_to_value(entry: &FeedbackEntry) -> Value {
    let mut map = HashMap::new();
    if let Some(rating) = entry.rating {
        map.insert("rating".to_string(), rating.value().to_firestore_value());
    }
    if let Some(comment) = &entry.comment {
        map.insert("comment".to_string(), comment.to_firestore_value());
    }
    map.insert("user_id".to_string(), entry.user_id.as_str().to_firestore_value());
    map.insert("created_at".to_string(), entry.created_at.to_firestore_value());
    Value::map(map)
}

fn feedback_from_value(value: &Value) -> Option<FeedbackEntry> {
    let map = value.as_map()?;
    Some(FeedbackEntry {
        rating: get::<f64>(map, "rating").and_then(|r| Rating::new(r).ok()),
        comment: get(map, "comment"),
        user_id: UserId::from(get::<String>(map, "user_id")?),
        created_at: timestamp(map, "created_at"),
    })
}

fn rating_entry_to_value(entry: &RatingEntry) -> Value {
    let mut map = HashMap::new();
    map.insert("recipe_id".to_string(), entry.recipe_id.as_str().to_firestore_value());
    map.insert("rating".to_string(), entry.rating.value().to_firestore_value());
    Value::map(map)
}

fn rating_entry_from_value(value: &Value) -> Option<RatingEntry> {
    let map = value.as_map()?;
    Some(RatingEntry {
        recipe_id: RecipeId::from(get::<String>(map, "recipe_id")?),
        rating: Rating::new(get(map, "rating")?).ok()?,
    })
}

pub fn user_to_fields(user: &User) -> Fields {
    let mut fields = HashMap::new();
    fields.insert("username".to_string(), user.username.to_firestore_value());
    fields.insert("password_hash".to_string(), user.password.as_str().to_firestore_value());
    fields.insert("image".to_string(), user.image.to_firestore_value());
    fields.insert("bio".to_string(), user.bio.to_firestore_value());
    fields.insert("followers".to_string(), ids_to_value(&user.followers));
    fields.insert("following".to_string(), ids_to_value(&user.following));
    fields.insert(
        "feedback".to_string(),
        Value::ArrayValue(ArrayValue {
            values: Some(user.feedback.iter().map(feedback_to_value).collect()),
        }),
    );
    fields.insert(
        "ratings".to_string(),
        Value::ArrayValue(ArrayValue {
            values: Some(user.ratings.iter().map(rating_entry_to_value).collect()),
        }),
    );
    fields.insert("created_at".to_string(), user.created_at.to_firestore_value());
    fields.insert("updated_at".to_string(), user.updated_at.to_firestore_value());
    fields
}

pub fn document_to_user(doc: &Document) -> StoreResult<User> {
    let fields = fields_of(doc)?;

    let array = |key: &str| -> Vec<Value> {
        fields
            .get(key)
            .and_then(Value::as_array)
            .map(<[Value]>::to_vec)
            .unwrap_or_default()
    };

    Ok(User {
        id: UserId::from(doc_id(doc)?),
        username: require(fields, "username")?,
        password: PasswordHash::from_phc(require::<String>(fields, "password_hash")?),
        image: get(fields, "image").unwrap_or_default(),
        bio: get(fields, "bio").unwrap_or_default(),
        followers: ids_from(fields, "followers"),
        following: ids_from(fields, "following"),
        feedback: array("feedback").iter().filter_map(feedback_from_value).collect(),
        ratings: array("ratings").iter().filter_map(rating_entry_from_value).collect(),
        created_at: timestamp(fields, "created_at"),
        updated_at: timestamp(fields, "updated_at"),
    })
}

pub fn username_index_fields(user: &User) -> Fields {
    let mut fields = HashMap::new();
    fields.insert("user_id".to_string(), user.id.as_str().to_firestore_value());
    fields.insert("username".to_string(), user.username.to_firestore_value());
    fields.insert("created_at".to_string(), user.created_at.to_firestore_value());
    fields
}

// ============================================================================
// Recipes
// ============================================================================

pub fn recipe_to_fields(recipe: &Recipe) -> Fields {
    let mut fields = HashMap::new();
    fields.insert("name".to_string(), recipe.name.to_firestore_value());
    fields.insert("ingredients".to_string(), recipe.ingredients.to_firestore_value());
    fields.insert("image".to_string(), recipe.image.to_firestore_value());
    fields.insert("link".to_string(), recipe.link.to_firestore_value());
    fields.insert("description".to_string(), recipe.description.to_firestore_value());
    if let Some(category) = recipe.category {
        fields.insert("category".to_string(), category.as_str().to_firestore_value());
    }
    fields.insert("steps".to_string(), recipe.steps.to_firestore_value());
    fields.insert("rating".to_string(), recipe.rating.to_firestore_value());
    fields.insert("user_id".to_string(), recipe.user_id.as_str().to_firestore_value());
    fields.insert("rating_count".to_string(), recipe.rating_count.to_firestore_value());
    fields.insert("rating_total".to_string(), recipe.rating_total.to_firestore_value());
    fields.insert("created_at".to_string(), recipe.created_at.to_firestore_value());
    fields.insert("updated_at".to_string(), recipe.updated_at.to_firestore_value());
    fields
}

pub fn document_to_recipe(doc: &Document) -> StoreResult<Recipe> {
    let fields = fields_of(doc)?;

    Ok(Recipe {
        id: RecipeId::from(doc_id(doc)?),
        name: get(fields, "name").unwrap_or_default(),
        ingredients: get(fields, "ingredients").unwrap_or_default(),
        image: get(fields, "image").unwrap_or_default(),
        link: get(fields, "link").unwrap_or_default(),
        description: get(fields, "description").unwrap_or_default(),
        category: get::<String>(fields, "category").and_then(|c| RecipeCategory::parse(&c)),
        steps: get(fields, "steps").unwrap_or_default(),
        rating: get(fields, "rating").unwrap_or(0.0),
        user_id: UserId::from(require::<String>(fields, "user_id")?),
        rating_count: get(fields, "rating_count").unwrap_or(0),
        rating_total: get(fields, "rating_total").unwrap_or(0.0),
        created_at: timestamp(fields, "created_at"),
        updated_at: timestamp(fields, "updated_at"),
    })
}
