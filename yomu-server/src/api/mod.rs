//! HTTP surface: shared state, router, middleware.

pub mod analyze;
pub mod words;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use yomu_core::LexiconCache;

use crate::deepseek::DeepSeekClient;
use crate::store::PgVocabStore;

/// Shared application state injected into every handler.
///
/// The lexicon cache is the only long-lived mutable resource; everything a
/// request derives from it is owned by that request.
#[derive(Clone)]
pub struct AppState {
    pub lexicon: Arc<LexiconCache>,
    pub store: Arc<PgVocabStore>,
    pub oracle: Arc<DeepSeekClient>,
}

/// Error body for non-streaming endpoints.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/analyze", post(analyze::analyze))
        .route("/api/words", post(words::create_word))
        .route("/api/words/generate", post(words::generate_word))
        .route(
            "/api/words/:id",
            put(words::update_word).delete(words::delete_word),
        )
        .route("/api/lexicon/reload", post(words::reload_lexicon))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}
