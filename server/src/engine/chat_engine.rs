use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use super::broadcast::RoomBroadcaster;
use super::error::ChatError;
use super::events::{ChatEvent, MemberInfo, RoomInfo, SessionId, StoredMessage};
use super::message_store::{DEFAULT_CAPACITY, MAX_FETCH, MessageStore};
use super::presence::PresenceRegistry;
use super::session::{MAX_OUTBOUND_QUEUE, UserSession};
use super::typing::{DEFAULT_DEBOUNCE, TypingTracker};
use super::validation;

/// Room used when a client doesn't name one.
pub const DEFAULT_ROOM: &str = "general";

/// Tunables for the chat engine, filled in from the config file.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    /// History messages replayed to a joiner when no limit is requested.
    pub history_default: usize,
    /// Hard cap on any single history fetch.
    pub history_max: usize,
    /// Total retained messages across all rooms.
    pub message_cap: usize,
    /// Typing indicator inactivity window.
    pub typing_debounce: Duration,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            history_default: 50,
            history_max: MAX_FETCH,
            message_cap: DEFAULT_CAPACITY,
            typing_debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// The central hub that owns all chat state. One instance per process,
/// constructed at startup and shared with every connection handler. All
/// session lifecycle transitions go through here; the presence registry and
/// message store are never mutated by anything else.
pub struct ChatEngine {
    /// All currently connected sessions, keyed by session ID.
    sessions: Arc<DashMap<SessionId, Arc<UserSession>>>,
    presence: Arc<PresenceRegistry>,
    store: MessageStore,
    broadcaster: Arc<RoomBroadcaster>,
    typing: TypingTracker,
    settings: ChatSettings,
}

impl ChatEngine {
    pub fn new(settings: ChatSettings) -> Self {
        let sessions = Arc::new(DashMap::new());
        let presence = Arc::new(PresenceRegistry::new());
        let broadcaster = Arc::new(RoomBroadcaster::new(sessions.clone(), presence.clone()));
        let typing = TypingTracker::new(broadcaster.clone(), settings.typing_debounce);
        let store = MessageStore::new(settings.message_cap, settings.history_max);

        Self {
            sessions,
            presence,
            store,
            broadcaster,
            typing,
            settings,
        }
    }

    // ── Session lifecycle ───────────────────────────────────────────

    /// Register a new connection. Returns the session ID and the receiver
    /// the transport drains into its write loop.
    pub fn connect(&self) -> (SessionId, mpsc::Receiver<ChatEvent>) {
        let session_id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(MAX_OUTBOUND_QUEUE);
        self.sessions
            .insert(session_id, Arc::new(UserSession::new(session_id, tx)));
        info!(%session_id, "session connected");
        (session_id, rx)
    }

    /// Join a room. Re-join is allowed and implicitly leaves the previous
    /// room. On success the joiner receives the room's current member list
    /// and a history replay; everyone already in the room is notified.
    /// Validation failures reject without any side effects.
    pub fn join(
        &self,
        session_id: SessionId,
        username: &str,
        room: &str,
        history_limit: Option<usize>,
    ) -> Result<(), ChatError> {
        let session = self
            .sessions
            .get(&session_id)
            .ok_or(ChatError::NotJoined)?
            .clone();

        let username = validation::validate_username(username)?;
        let room = validation::validate_room_name(room)?;

        // Member snapshot before registration: the joiner sees who was
        // already there, not themselves.
        let mut existing = self.presence.members_of(room);
        existing.retain(|m| m.session_id != session_id);

        let previous = session.enter_room(username, room);
        self.presence.register(session_id, username, room);

        let rejoining_same_room = previous.as_deref() == Some(room);
        if let Some(prev) = previous.filter(|p| p.as_str() != room) {
            self.typing.forget(session_id, &prev);
            self.notify_departure(&prev, username);
        }

        if !rejoining_same_room {
            self.broadcaster.broadcast_except(
                room,
                &ChatEvent::UserJoined {
                    username: username.to_string(),
                },
                Some(session_id),
            );
            self.broadcaster.broadcast_except(
                room,
                &ChatEvent::SystemMessage {
                    message: format!("{username} joined the room"),
                },
                Some(session_id),
            );
        }

        let limit = history_limit.unwrap_or(self.settings.history_default);
        session.send(ChatEvent::OnlineUsers { users: existing });
        session.send(ChatEvent::History {
            messages: self.store.recent(room, limit),
        });

        info!(%session_id, %username, %room, "joined room");
        Ok(())
    }

    /// Send a message to the session's current room. A body that is empty
    /// after trimming is silently ignored. The broadcast includes the sender,
    /// who recognizes its own message by the `user_id` field, so every
    /// member observes the room's messages in the same order.
    pub fn send_message(&self, session_id: SessionId, body: &str) -> Result<(), ChatError> {
        let session = self
            .sessions
            .get(&session_id)
            .ok_or(ChatError::NotJoined)?
            .clone();
        let (username, room) = session.joined().ok_or(ChatError::NotJoined)?;

        let Some(body) = validation::validate_message(body)? else {
            return Ok(());
        };

        // Fan-out happens inside the store lock so concurrent sends to the
        // same room reach every recipient in append order.
        self.store
            .append_with(session_id, &username, body, &room, |stored| {
                self.broadcaster.broadcast(
                    &room,
                    &ChatEvent::NewMessage {
                        seq: stored.seq,
                        user_id: stored.user_id,
                        username: stored.username.clone(),
                        message: stored.message.clone(),
                        room: stored.room.clone(),
                        timestamp: stored.timestamp,
                    },
                );
            });

        info!(%session_id, %username, %room, "message sent");
        Ok(())
    }

    /// Forward a typing signal to the debounce tracker.
    pub fn typing(&self, session_id: SessionId, is_typing: bool) -> Result<(), ChatError> {
        let session = self
            .sessions
            .get(&session_id)
            .ok_or(ChatError::NotJoined)?
            .clone();
        let (username, room) = session.joined().ok_or(ChatError::NotJoined)?;

        if is_typing {
            self.typing.ping(session_id, &room, &username);
        } else {
            self.typing.stop(session_id, &room);
        }
        Ok(())
    }

    /// Explicitly leave the current room. The transport stays open and the
    /// session returns to the connected-but-roomless state, free to join
    /// another room.
    pub fn leave_room(&self, session_id: SessionId) -> Result<(), ChatError> {
        let session = self
            .sessions
            .get(&session_id)
            .ok_or(ChatError::NotJoined)?
            .clone();
        let (username, room) = session.exit_room().ok_or(ChatError::NotJoined)?;

        self.presence.unregister(session_id);
        self.typing.forget(session_id, &room);
        self.notify_departure(&room, &username);

        info!(%session_id, %username, %room, "left room");
        Ok(())
    }

    /// Tear down a session on transport closure. An abrupt disconnect
    /// produces exactly the same membership cleanup and notices as an
    /// explicit leave. Idempotent; terminal.
    pub fn disconnect(&self, session_id: SessionId) {
        let Some((_, session)) = self.sessions.remove(&session_id) else {
            return;
        };

        if let Some((username, room)) = session.exit_room() {
            self.presence.unregister(session_id);
            self.typing.forget(session_id, &room);
            self.notify_departure(&room, &username);
        }

        info!(%session_id, "session disconnected");
    }

    /// Send one event to one session (rejection responses from the
    /// transport layer).
    pub fn notify(&self, session_id: SessionId, event: ChatEvent) {
        self.broadcaster.deliver(session_id, &event);
    }

    fn notify_departure(&self, room: &str, username: &str) {
        self.broadcaster.broadcast(
            room,
            &ChatEvent::UserLeft {
                username: username.to_string(),
            },
        );
        self.broadcaster.broadcast(
            room,
            &ChatEvent::SystemMessage {
                message: format!("{username} left the room"),
            },
        );
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// Online users for one room, or every connected-and-joined user when no
    /// room is given.
    pub fn online_users(&self, room: Option<&str>) -> Vec<MemberInfo> {
        match room {
            Some(room) => self.presence.members_of(room),
            None => self.presence.all_members(),
        }
    }

    /// Recent messages for a room, oldest first. The limit defaults from
    /// settings and is clamped by the store.
    pub fn recent_messages(&self, room: &str, limit: Option<usize>) -> Vec<StoredMessage> {
        self.store
            .recent(room, limit.unwrap_or(self.settings.history_default))
    }

    /// Room name and member count, or `None` for a room never populated.
    pub fn room_info(&self, room: &str) -> Option<RoomInfo> {
        self.presence.room_info(room)
    }

    /// Number of currently open sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
