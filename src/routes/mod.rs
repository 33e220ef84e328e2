use axum::{http::StatusCode, middleware::from_fn, routing::get, Json, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::{
    db::Stores,
    middleware::{make_span_with_request_id, request_id_middleware},
    services::{RecommendationService, RecommendationSettings, ShelfQueryEngine},
};

pub mod error;
pub mod recommendations;
pub mod shelf;

/// Services shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub shelf: ShelfQueryEngine,
    pub recommendations: RecommendationService,
}

impl AppState {
    pub fn new(stores: &Stores, settings: RecommendationSettings) -> Self {
        Self {
            shelf: ShelfQueryEngine::new(stores),
            recommendations: RecommendationService::new(stores, settings),
        }
    }
}

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
        )
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/users/:user_id/shelf", get(shelf::list_shelf))
        .route(
            "/users/:user_id/recommendations",
            get(recommendations::recommend),
        )
        .route(
            "/users/:user_id/recommendations/:genre",
            get(recommendations::recommend_more),
        )
        .route(
            "/users/:user_id/friends/recommendations",
            get(recommendations::recommend_from_friends),
        )
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
