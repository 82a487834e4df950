use std::collections::HashMap;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::events::{MemberInfo, RoomInfo, SessionId};

/// In-memory state for a single room. Rooms are created implicitly on first
/// join and retained once empty — lookups by name stay idempotent and an
/// empty room is harmless.
#[derive(Debug)]
pub struct RoomState {
    pub name: String,
    /// Currently joined members, session id -> username.
    pub members: HashMap<SessionId, String>,
    pub created_at: DateTime<Utc>,
}

impl RoomState {
    fn new(name: String) -> Self {
        Self {
            name,
            members: HashMap::new(),
            created_at: Utc::now(),
        }
    }
}

/// Tracks which sessions are in which room. A session belongs to at most one
/// room at a time; registering into a new room removes it from the old one
/// first, so the union of all member sets holds each session id exactly once.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    rooms: DashMap<String, RoomState>,
    /// Reverse index: session id -> room name it currently occupies.
    session_rooms: DashMap<SessionId, String>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session to a room, removing it from any prior room first.
    /// Returns the room it was moved out of, if any. Re-registering with the
    /// same room is a membership no-op but refreshes the username.
    pub fn register(&self, session_id: SessionId, username: &str, room: &str) -> Option<String> {
        let previous = match self.session_rooms.insert(session_id, room.to_string()) {
            Some(prev) if prev != room => {
                if let Some(mut state) = self.rooms.get_mut(&prev) {
                    state.members.remove(&session_id);
                }
                Some(prev)
            }
            _ => None,
        };

        self.rooms
            .entry(room.to_string())
            .or_insert_with(|| RoomState::new(room.to_string()))
            .members
            .insert(session_id, username.to_string());

        previous
    }

    /// Remove a session from whatever room it occupies. Returns that room's
    /// name so the caller can notify remaining members, or `None` if the
    /// session was not registered.
    pub fn unregister(&self, session_id: SessionId) -> Option<String> {
        let (_, room) = self.session_rooms.remove(&session_id)?;
        if let Some(mut state) = self.rooms.get_mut(&room) {
            state.members.remove(&session_id);
        }
        Some(room)
    }

    /// Snapshot of a room's members. Copy-on-read — never a live view, safe
    /// to compute while concurrent registrations occur.
    pub fn members_of(&self, room: &str) -> Vec<MemberInfo> {
        let Some(state) = self.rooms.get(room) else {
            return Vec::new();
        };
        state
            .members
            .iter()
            .map(|(session_id, username)| MemberInfo {
                session_id: *session_id,
                username: username.clone(),
            })
            .collect()
    }

    /// Room name and member count, or `None` if the room was never populated.
    pub fn room_info(&self, room: &str) -> Option<RoomInfo> {
        self.rooms.get(room).map(|state| RoomInfo {
            name: state.name.clone(),
            member_count: state.members.len(),
        })
    }

    /// The room a session is currently registered in, if any.
    pub fn room_of(&self, session_id: SessionId) -> Option<String> {
        self.session_rooms.get(&session_id).map(|r| r.clone())
    }

    /// Snapshot of every registered session across all rooms.
    pub fn all_members(&self) -> Vec<MemberInfo> {
        self.rooms
            .iter()
            .flat_map(|state| {
                state
                    .members
                    .iter()
                    .map(|(session_id, username)| MemberInfo {
                        session_id: *session_id,
                        username: username.clone(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}
