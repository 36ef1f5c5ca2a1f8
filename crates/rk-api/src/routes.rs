//! API routes.

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::error::ApiError;
use crate::handlers::{
    comment_recipe, create_recipe, delete_recipe, follow_user, followed_recipes, get_recipe,
    get_user, health, list_recipes, list_users, login, me, my_recipes, rate_recipe, ready, signup,
    unfollow_user, update_recipe,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    RateLimiterCache,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let user_routes = Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user))
        .route("/users/:id/follow", post(follow_user))
        .route("/users/:id/unfollow", post(unfollow_user))
        .route("/auth/me", get(me));

    // Path casing matches what existing clients call.
    let recipe_routes = Router::new()
        .route("/Recipe", get(list_recipes).post(create_recipe))
        .route(
            "/Recipe/:id",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
        .route("/Recipe/:id/rate", post(rate_recipe))
        .route("/Recipe/:id/comment", post(comment_recipe))
        .route("/myRecipes", get(my_recipes))
        .route("/followedRecipes", get(followed_recipes));

    let rate_limiter = Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    let api_routes = Router::new()
        .merge(user_routes)
        .merge(recipe_routes)
        .route_layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .merge(api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .fallback(|| async { ApiError::not_found("Route not found") })
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_logging))
        .layer(middleware::from_fn(request_id))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
