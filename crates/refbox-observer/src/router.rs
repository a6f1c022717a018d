//! Axum router construction for the Observer API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin viewer access.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::operator;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the Observer server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /ws/state` -- `WebSocket` match state stream
/// - `GET /api/state` -- newest published snapshot
/// - `GET /api/history` -- undo history length
/// - `POST /api/events` -- submit a match event
/// - `POST /api/operator/undo` -- undo the last action
/// - `POST /api/operator/publish` -- re-publish the current state
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/ws/state", get(ws::ws_state))
        .route("/api/state", get(handlers::get_state))
        .route("/api/history", get(handlers::get_history))
        .route("/api/events", post(handlers::post_event))
        .route("/api/operator/undo", post(operator::undo))
        .route("/api/operator/publish", post(operator::publish))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
