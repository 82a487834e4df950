use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};

use super::app_state::AppState;
use super::{rest_api, ws_handler};

/// Build the axum router with all HTTP and WebSocket routes.
pub fn build_router(state: Arc<AppState>, static_dir: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let index = format!("{static_dir}/index.html");

    Router::new()
        .route("/ws", axum::routing::get(ws_handler::ws_upgrade))
        .route(
            "/api/users/online",
            axum::routing::get(rest_api::get_online_users),
        )
        .route("/api/messages", axum::routing::get(rest_api::get_messages))
        .route(
            "/api/rooms/{name}",
            axum::routing::get(rest_api::get_room_info),
        )
        // Static frontend with SPA fallback — unmatched routes serve index.html
        .fallback_service(ServeDir::new(static_dir).fallback(ServeFile::new(index)))
        .layer(cors)
        .with_state(state)
}
