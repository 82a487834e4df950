use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::engine::error::ChatError;
use crate::engine::events::{ChatEvent, SessionId};

use super::app_state::AppState;

fn default_room() -> String {
    crate::engine::chat_engine::DEFAULT_ROOM.to_string()
}

/// Inbound frame from a client, `{"type": ...}` tagged. The `room` field on
/// everything but `join` is advisory — the engine's record of the session's
/// current room is authoritative.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    Join {
        username: String,
        #[serde(default = "default_room")]
        room: String,
        /// Optional history replay limit (clamped server-side).
        limit: Option<usize>,
    },
    SendMessage {
        message: String,
        #[serde(default)]
        room: Option<String>,
    },
    Typing {
        is_typing: bool,
        #[serde(default)]
        room: Option<String>,
    },
    LeaveRoom {
        #[serde(default)]
        room: Option<String>,
    },
}

/// GET /ws — upgrade to a chat session.
pub async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (session_id, mut rx) = state.engine.connect();
    let (mut sender, mut receiver) = socket.split();

    // Outbound: drain the session's event queue into the socket.
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    warn!(error = %e, "failed to serialize outbound event");
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Inbound: parse frames and dispatch to the engine.
    let recv_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(frame) = receiver.next().await {
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    debug!(%session_id, error = %e, "websocket read error");
                    break;
                }
            };

            match frame {
                Message::Text(text) => {
                    let command = match serde_json::from_str::<ClientCommand>(&text) {
                        Ok(command) => command,
                        Err(e) => {
                            recv_state.engine.notify(
                                session_id,
                                ChatEvent::Error {
                                    message: format!("Malformed command: {e}"),
                                },
                            );
                            continue;
                        }
                    };
                    if let Err(e) = dispatch(&recv_state, session_id, command) {
                        recv_state.engine.notify(
                            session_id,
                            ChatEvent::Error {
                                message: e.to_string(),
                            },
                        );
                    }
                }
                Message::Close(_) => {
                    debug!(%session_id, "client requested close");
                    break;
                }
                // Ping/pong is handled by the protocol layer
                _ => {}
            }
        }
    });

    // Whichever side finishes first tears down the other.
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    // Transport closure is an implicit leave: same cleanup and notices.
    state.engine.disconnect(session_id);
    info!(%session_id, "websocket closed");
}

fn dispatch(state: &AppState, session_id: SessionId, command: ClientCommand) -> Result<(), ChatError> {
    match command {
        ClientCommand::Join {
            username,
            room,
            limit,
        } => state.engine.join(session_id, &username, &room, limit),
        ClientCommand::SendMessage { message, .. } => state.engine.send_message(session_id, &message),
        ClientCommand::Typing { is_typing, .. } => state.engine.typing(session_id, is_typing),
        ClientCommand::LeaveRoom { .. } => state.engine.leave_room(session_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_command_parses_with_default_room() {
        let command: ClientCommand =
            serde_json::from_str(r#"{"type": "join", "username": "alice"}"#).unwrap();
        match command {
            ClientCommand::Join {
                username,
                room,
                limit,
            } => {
                assert_eq!(username, "alice");
                assert_eq!(room, "general");
                assert_eq!(limit, None);
            }
            other => panic!("expected Join, got {other:?}"),
        }
    }

    #[test]
    fn test_send_message_command_parses() {
        let command: ClientCommand = serde_json::from_str(
            r#"{"type": "send_message", "message": "hi", "room": "general"}"#,
        )
        .unwrap();
        assert!(matches!(
            command,
            ClientCommand::SendMessage { message, .. } if message == "hi"
        ));
    }

    #[test]
    fn test_typing_command_parses() {
        let command: ClientCommand =
            serde_json::from_str(r#"{"type": "typing", "is_typing": true}"#).unwrap();
        assert!(matches!(
            command,
            ClientCommand::Typing { is_typing: true, .. }
        ));
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(serde_json::from_str::<ClientCommand>(r#"{"type": "nuke"}"#).is_err());
    }
}
