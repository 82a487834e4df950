use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use crate::engine::chat_engine::DEFAULT_ROOM;
use crate::engine::events::{MemberInfo, RoomInfo, StoredMessage};

use super::app_state::AppState;

#[derive(Deserialize)]
pub struct OnlineUsersParams {
    /// Restrict to one room; omitted means everyone currently joined anywhere.
    pub room: Option<String>,
}

#[derive(Serialize)]
pub struct OnlineUsersResponse {
    pub success: bool,
    pub users: Vec<MemberInfo>,
}

/// GET /api/users/online
pub async fn get_online_users(
    State(state): State<Arc<AppState>>,
    Query(params): Query<OnlineUsersParams>,
) -> impl IntoResponse {
    let users = state.engine.online_users(params.room.as_deref());
    Json(OnlineUsersResponse {
        success: true,
        users,
    })
}

#[derive(Deserialize)]
pub struct MessagesParams {
    pub room: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct MessagesResponse {
    pub success: bool,
    pub messages: Vec<StoredMessage>,
}

/// GET /api/messages — recent history, oldest first. The limit is clamped
/// server-side regardless of what the caller requests.
pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MessagesParams>,
) -> impl IntoResponse {
    let room = params.room.as_deref().unwrap_or(DEFAULT_ROOM);
    let messages = state.engine.recent_messages(room, params.limit);
    Json(MessagesResponse {
        success: true,
        messages,
    })
}

#[derive(Serialize)]
pub struct RoomResponse {
    pub success: bool,
    pub room: RoomInfo,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

/// GET /api/rooms/{name} — 404 for a room that was never populated.
pub async fn get_room_info(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.engine.room_info(&name) {
        Some(room) => Json(RoomResponse {
            success: true,
            room,
        })
        .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                success: false,
                error: format!("No such room: {name}"),
            }),
        )
            .into_response(),
    }
}
