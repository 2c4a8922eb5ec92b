//! Course Cupid API Gateway
//!
//! The HTTP entry point for the chat identity and transcript subsystem.
//! Handles:
//! - Caller identity resolution
//! - Session lifecycle and listing
//! - Chat turns and transcript retrieval
//! - Observability (logging, metrics, request ids)

pub mod handlers;
pub mod responder;
pub mod services;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use cupid_common::{config::AppConfig, db::Repository};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::responder::Responder;
use crate::services::ChatService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repo: Repository,
    pub chat: Arc<ChatService>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, repo: Repository, responder: Arc<dyn Responder>) -> Self {
        let chat = Arc::new(ChatService::new(
            repo.clone(),
            responder,
            config.responder.history_window,
        ));
        Self { config, repo, chat }
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let timeout = TimeoutLayer::new(state.config.request_timeout());

    // API routes
    let api_routes = Router::new()
        // Session endpoints
        .route(
            "/sessions",
            post(handlers::sessions::create_session).get(handlers::sessions::list_sessions),
        )
        .route(
            "/sessions/{identifier}",
            get(handlers::sessions::get_session).delete(handlers::sessions::delete_session),
        )
        .route(
            "/sessions/{identifier}/title",
            put(handlers::sessions::rename_session),
        )
        // Chat endpoints
        .route("/chat/{identifier}", post(handlers::chat::post_turn))
        .route(
            "/chat/{identifier}/messages",
            get(handlers::chat::list_messages),
        );

    // Compose the app
    Router::new()
        .nest("/api", api_routes)
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(timeout)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}
