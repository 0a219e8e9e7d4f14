use axum::routing::get;
use axum::{middleware, Json, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth;
use crate::notify::events::ws_handler;
use crate::shared::state::AppState;
use crate::tickets;
use crate::users;

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Assembles the full application router: public routes (auth, health,
/// the realtime socket) plus the token-gated API surface.
pub fn build_router(state: Arc<AppState>) -> Router {
    let public = Router::new()
        .merge(auth::configure_auth_routes())
        .route("/api/health", get(health))
        .route("/api/ws", get(ws_handler));

    let protected = Router::new()
        .merge(tickets::configure_tickets_routes())
        .merge(users::configure_users_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
