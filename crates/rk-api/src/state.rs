//! Application state.

use std::sync::Arc;

use tracing::info;

use rk_store::{DocumentStore, FirestoreClient, FirestoreStore, MemoryStore, StoreResult};

use crate::auth::TokenIssuer;
use crate::config::{ApiConfig, StoreBackend};
use crate::services::{
    CatalogService, FeedService, FeedbackService, IdentityService, RatingService, SocialService,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Arc<dyn DocumentStore>,
    pub tokens: Arc<TokenIssuer>,
    pub identity: IdentityService,
    pub catalog: CatalogService,
    pub ratings: RatingService,
    pub feedback: FeedbackService,
    pub social: SocialService,
    pub feeds: FeedService,
}

impl AppState {
    /// Create application state, connecting to the configured store.
    pub async fn new(config: ApiConfig) -> StoreResult<Self> {
        let store: Arc<dyn DocumentStore> = match config.store_backend {
            StoreBackend::Firestore => {
                Arc::new(FirestoreStore::new(FirestoreClient::from_env().await?))
            }
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
        };
        info!(backend = store.backend(), "Document store initialized");

        Ok(Self::with_store(config, store))
    }

    /// Build state around an existing store.
    pub fn with_store(config: ApiConfig, store: Arc<dyn DocumentStore>) -> Self {
        let tokens = Arc::new(TokenIssuer::new(&config.jwt_secret, config.jwt_ttl));
        crate::error::hide_internal_details(config.is_production());

        Self {
            identity: IdentityService::new(Arc::clone(&store), Arc::clone(&tokens)),
            catalog: CatalogService::new(Arc::clone(&store)),
            ratings: RatingService::new(Arc::clone(&store), config.rating_policy),
            feedback: FeedbackService::new(Arc::clone(&store)),
            social: SocialService::new(Arc::clone(&store)),
            feeds: FeedService::new(Arc::clone(&store)),
            config,
            store,
            tokens,
        }
    }
}
