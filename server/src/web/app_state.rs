use std::sync::Arc;

use crate::engine::chat_engine::ChatEngine;

/// State shared with every HTTP and WebSocket handler.
pub struct AppState {
    pub engine: Arc<ChatEngine>,
}
