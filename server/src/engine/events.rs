use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Unique identifier for a connected session (one per connection, not per user).
pub type SessionId = Uuid;

/// One member of a room, as reported to clients.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MemberInfo {
    pub session_id: SessionId,
    pub username: String,
}

/// Name and current member count of a room.
#[derive(Debug, Clone, Serialize)]
pub struct RoomInfo {
    pub name: String,
    pub member_count: usize,
}

/// An immutable chat message as held by the message store. The sequence id
/// and timestamp are assigned by the store at append time, never by clients.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StoredMessage {
    pub seq: u64,
    pub user_id: SessionId,
    pub username: String,
    pub message: String,
    pub room: String,
    pub timestamp: DateTime<Utc>,
}

/// Outbound event delivered to a session's WebSocket write loop.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A chat message, broadcast to the whole room including the sender.
    NewMessage {
        seq: u64,
        user_id: SessionId,
        username: String,
        message: String,
        room: String,
        timestamp: DateTime<Utc>,
    },

    /// A user joined the session's room. Not echoed to the joiner.
    UserJoined { username: String },

    /// A user left the session's room (explicit leave or disconnect).
    UserLeft { username: String },

    /// Current members of the room, sent to a joiner on entry.
    OnlineUsers { users: Vec<MemberInfo> },

    /// A user's typing state flipped.
    UserTyping { username: String, is_typing: bool },

    /// Human-readable room notice ("alice joined the room").
    SystemMessage { message: String },

    /// History replay sent to a joiner, oldest message first.
    History { messages: Vec<StoredMessage> },

    /// Rejection response, sent only to the session that caused it.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_tags() {
        let event = ChatEvent::UserTyping {
            username: "alice".into(),
            is_typing: true,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "user_typing");
        assert_eq!(json["username"], "alice");
        assert_eq!(json["is_typing"], true);
    }

    #[test]
    fn test_online_users_shape() {
        let event = ChatEvent::OnlineUsers {
            users: vec![MemberInfo {
                session_id: Uuid::nil(),
                username: "bob".into(),
            }],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "online_users");
        assert_eq!(json["users"][0]["username"], "bob");
        assert!(json["users"][0]["session_id"].is_string());
    }
}
