//! [`DocumentStore`] backed by the Firestore REST API.
//!
//! Layout:
//! - `users/{user_id}`
//! - `usernames/{key}` index entry, written in the same commit as the user
//! - `recipes/{recipe_id}`

use async_trait::async_trait;
use tracing::info;

use rk_models::{Recipe, RecipeId, User, UserId};

use crate::client::FirestoreClient;
use crate::codec::{
    document_to_recipe, document_to_user, recipe_to_fields, user_to_fields, username_index_fields,
    username_key, RECIPES, USERNAMES, USERS,
};
use crate::error::{StoreError, StoreResult};
use crate::port::{DocumentStore, StoreWrite, Version, Versioned};
use crate::types::{Document, FieldFilter, StructuredQuery, ToFirestoreValue, Write};

/// Firestore accepts at most this many values in an `IN` filter.
const MAX_IN_VALUES: usize = 30;

pub struct FirestoreStore {
    client: FirestoreClient,
}

impl FirestoreStore {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &FirestoreClient {
        &self.client
    }

    fn version_of(doc: &Document) -> StoreResult<Version> {
        doc.update_time
            .clone()
            .map(Version)
            .ok_or_else(|| StoreError::invalid_document("Document has no updateTime"))
    }

    fn to_write(&self, write: StoreWrite) -> Write {
        match write {
            StoreWrite::PutUser { user, expected } => Write::replace_if_unchanged(
                Document::named(
                    self.client.full_document_name(USERS, user.id.as_str()),
                    user_to_fields(&user),
                ),
                expected.0,
            ),
            StoreWrite::PutRecipe { recipe, expected } => Write::replace_if_unchanged(
                Document::named(
                    self.client.full_document_name(RECIPES, recipe.id.as_str()),
                    recipe_to_fields(&recipe),
                ),
                expected.0,
            ),
        }
    }
}

fn oldest_first<T>(items: &mut [T], created_at: impl Fn(&T) -> chrono::DateTime<chrono::Utc>) {
    items.sort_by_key(|item| created_at(item));
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    fn backend(&self) -> &'static str {
        "firestore"
    }

    async fn ping(&self) -> StoreResult<()> {
        self.client.list_documents(USERS, Some(1), None).await?;
        Ok(())
    }

    async fn create_user(&self, user: &User) -> StoreResult<()> {
        let writes = vec![
            Write::create(Document::named(
                self.client.full_document_name(USERS, user.id.as_str()),
                user_to_fields(user),
            )),
            Write::create(Document::named(
                self.client
                    .full_document_name(USERNAMES, &username_key(&user.username)),
                username_index_fields(user),
            )),
        ];

        self.client.commit(writes).await.map_err(|e| match e {
            // exists=false on the index entry is the uniqueness check
            StoreError::AlreadyExists(_) => StoreError::AlreadyExists(user.username.clone()),
            other => other,
        })?;

        info!(user_id = %user.id, "Created user document");
        Ok(())
    }

    async fn get_user(&self, id: &UserId) -> StoreResult<Option<Versioned<User>>> {
        match self.client.get_document(USERS, id.as_str()).await? {
            Some(doc) => Ok(Some(Versioned::new(
                document_to_user(&doc)?,
                Self::version_of(&doc)?,
            ))),
            None => Ok(None),
        }
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let query = StructuredQuery::collection_where(
            USERS,
            FieldFilter::equals("username", username.to_firestore_value()),
        );
        let docs = self.client.run_query(None, query).await?;
        docs.first().map(document_to_user).transpose()
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let docs = self.client.list_all(USERS).await?;
        let mut users = docs
            .iter()
            .map(document_to_user)
            .collect::<StoreResult<Vec<_>>>()?;
        oldest_first(&mut users, |u| u.created_at);
        Ok(users)
    }

    async fn create_recipe(&self, recipe: &Recipe) -> StoreResult<()> {
        let write = Write::create(Document::named(
            self.client.full_document_name(RECIPES, recipe.id.as_str()),
            recipe_to_fields(recipe),
        ));
        self.client.commit(vec![write]).await?;

        info!(recipe_id = %recipe.id, user_id = %recipe.user_id, "Created recipe document");
        Ok(())
    }

    async fn get_recipe(&self, id: &RecipeId) -> StoreResult<Option<Versioned<Recipe>>> {
        match self.client.get_document(RECIPES, id.as_str()).await? {
            Some(doc) => Ok(Some(Versioned::new(
                document_to_recipe(&doc)?,
                Self::version_of(&doc)?,
            ))),
            None => Ok(None),
        }
    }

    async fn list_recipes(&self) -> StoreResult<Vec<Recipe>> {
        let docs = self.client.list_all(RECIPES).await?;
        let mut recipes = docs
            .iter()
            .map(document_to_recipe)
            .collect::<StoreResult<Vec<_>>>()?;
        oldest_first(&mut recipes, |r| r.created_at);
        Ok(recipes)
    }

    async fn list_recipes_by_owners(&self, owners: &[UserId]) -> StoreResult<Vec<Recipe>> {
        let mut recipes = Vec::new();

        for chunk in owners.chunks(MAX_IN_VALUES) {
            let values = chunk
                .iter()
                .map(|id| id.as_str().to_firestore_value())
                .collect();
            let query =
                StructuredQuery::collection_where(RECIPES, FieldFilter::is_in("user_id", values));
            for doc in self.client.run_query(None, query).await? {
                recipes.push(document_to_recipe(&doc)?);
            }
        }

        oldest_first(&mut recipes, |r| r.created_at);
        Ok(recipes)
    }

    async fn delete_recipe(&self, id: &RecipeId, expected: &Version) -> StoreResult<()> {
        let write = Write::delete_if_unchanged(
            self.client.full_document_name(RECIPES, id.as_str()),
            expected.as_str(),
        );
        self.client.commit(vec![write]).await?;

        info!(recipe_id = %id, "Deleted recipe document");
        Ok(())
    }

    async fn commit(&self, writes: Vec<StoreWrite>) -> StoreResult<()> {
        let writes: Vec<Write> = writes.into_iter().map(|w| self.to_write(w)).collect();
        self.client.commit(writes).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::FirestoreConfig;
    use rk_models::PasswordHash;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DOCS: &str = "/v1/projects/test-project/databases/(default)/documents";

    async fn store_for(server: &MockServer) -> FirestoreStore {
        let config = FirestoreConfig::emulator("test-project", server.uri());
        FirestoreStore::new(FirestoreClient::new(config).await.unwrap())
    }

    fn user_doc(id: &str, username: &str) -> serde_json::Value {
        json!({
            "name": format!("projects/test-project/databases/(default)/documents/users/{}", id),
            "fields": {
                "username": {"stringValue": username},
                "password_hash": {"stringValue": "$argon2id$stub"},
                "image": {"stringValue": "a.png"},
                "bio": {"stringValue": "hello"},
                "followers": {"arrayValue": {}},
                "following": {"arrayValue": {"values": [{"stringValue": "u9"}]}},
                "feedback": {"arrayValue": {}},
                "ratings": {"arrayValue": {}},
                "created_at": {"timestampValue": "2024-03-01T10:00:00Z"},
                "updated_at": {"timestampValue": "2024-03-01T10:00:00Z"}
            },
            "updateTime": "2024-03-01T10:00:00.123456Z"
        })
    }

    fn recipe_doc(id: &str, owner: &str, created: &str) -> serde_json::Value {
        json!({
            "name": format!("projects/test-project/databases/(default)/documents/recipes/{}", id),
            "fields": {
                "name": {"stringValue": format!("Recipe {}", id)},
                "user_id": {"stringValue": owner},
                "rating": {"doubleValue": 0.0},
                "created_at": {"timestampValue": created},
                "updated_at": {"timestampValue": created}
            },
            "updateTime": created
        })
    }

    #[tokio::test]
    async fn test_get_user_carries_update_time_version() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{}/users/u1", DOCS)))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_doc("u1", "alice")))
            .mount(&server)
            .await;

        let store = store_for(&server).await;
        let user = store.get_user(&UserId::from("u1")).await.unwrap().unwrap();
        assert_eq!(user.value.username, "alice");
        assert_eq!(user.value.following, vec![UserId::from("u9")]);
        assert_eq!(user.version.as_str(), "2024-03-01T10:00:00.123456Z");
    }

    #[tokio::test]
    async fn test_get_missing_recipe_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r".*/recipes/.*"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": {"code": 404}})))
            .mount(&server)
            .await;

        let store = store_for(&server).await;
        assert!(store.get_recipe(&RecipeId::from("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_user_claims_username_in_same_commit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{}:commit", DOCS)))
            .and(body_partial_json(json!({
                "writes": [
                    {"currentDocument": {"exists": false}},
                    {
                        "update": {"name": "projects/test-project/databases/(default)/documents/usernames/u_alice"},
                        "currentDocument": {"exists": false}
                    }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"writeResults": [{}, {}]})))
            .expect(1)
            .mount(&server)
            .await;

        let store = store_for(&server).await;
        let user = User::new("alice", PasswordHash::from_phc("$argon2id$stub"), "a.png", "hi");
        store.create_user(&user).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_user_with_taken_username_is_already_exists() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{}:commit", DOCS)))
            .respond_with(
                ResponseTemplate::new(409)
                    .set_body_json(json!({"error": {"code": 409, "status": "ALREADY_EXISTS"}})),
            )
            .mount(&server)
            .await;

        let store = store_for(&server).await;
        let user = User::new("alice", PasswordHash::from_phc("$argon2id$stub"), "a.png", "hi");
        let err = store.create_user(&user).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(name) if name == "alice"));
    }

    #[tokio::test]
    async fn test_stale_commit_is_precondition_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{}:commit", DOCS)))
            .and(body_partial_json(json!({
                "writes": [{"currentDocument": {"updateTime": "2024-03-01T10:00:00.123456Z"}}]
            })))
            .respond_with(ResponseTemplate::new(400).set_body_json(
                json!({"error": {"code": 400, "status": "FAILED_PRECONDITION"}}),
            ))
            .mount(&server)
            .await;

        let store = store_for(&server).await;
        let user = User::new("alice", PasswordHash::from_phc("$argon2id$stub"), "a.png", "hi");
        let err = store
            .commit(vec![StoreWrite::PutUser {
                user,
                expected: Version("2024-03-01T10:00:00.123456Z".to_string()),
            }])
            .await
            .unwrap_err();
        assert!(err.is_precondition_failed());
    }

    #[tokio::test]
    async fn test_list_recipes_follows_page_tokens_and_sorts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{}/recipes", DOCS)))
            .and(wiremock::matchers::query_param("pageToken", "next"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "documents": [recipe_doc("r1", "u1", "2024-01-01T00:00:00Z")]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{}/recipes", DOCS)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "documents": [recipe_doc("r2", "u1", "2024-02-01T00:00:00Z")],
                "nextPageToken": "next"
            })))
            .mount(&server)
            .await;

        let store = store_for(&server).await;
        let recipes = store.list_recipes().await.unwrap();
        let ids: Vec<&str> = recipes.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r2"]);
    }

    #[tokio::test]
    async fn test_recipes_by_owners_queries_in_chunks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{}:runQuery", DOCS)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"document": recipe_doc("r1", "u1", "2024-01-01T00:00:00Z")},
                {"readTime": "2024-01-01T00:00:00Z"}
            ])))
            .expect(2)
            .mount(&server)
            .await;

        let store = store_for(&server).await;
        let owners: Vec<UserId> = (0..31).map(|i| UserId::from(format!("u{}", i))).collect();
        let recipes = store.list_recipes_by_owners(&owners).await.unwrap();
        assert_eq!(recipes.len(), 2);
    }

    #[tokio::test]
    async fn test_no_owners_means_no_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let store = store_for(&server).await;
        assert!(store.list_recipes_by_owners(&[]).await.unwrap().is_empty());
    }
}
