use std::sync::Arc;

use dashmap::DashMap;
use tracing::warn;

use super::events::{ChatEvent, SessionId};
use super::presence::PresenceRegistry;
use super::session::UserSession;

/// Fans an event out to every session in a room, per a presence snapshot
/// taken at call time. Sessions joining after the snapshot miss the event;
/// sessions leaving before delivery may or may not receive it. Best effort,
/// no retry.
pub struct RoomBroadcaster {
    sessions: Arc<DashMap<SessionId, Arc<UserSession>>>,
    presence: Arc<PresenceRegistry>,
}

impl RoomBroadcaster {
    pub fn new(
        sessions: Arc<DashMap<SessionId, Arc<UserSession>>>,
        presence: Arc<PresenceRegistry>,
    ) -> Self {
        Self { sessions, presence }
    }

    /// Deliver `event` to every member of `room`.
    pub fn broadcast(&self, room: &str, event: &ChatEvent) {
        self.broadcast_except(room, event, None);
    }

    /// Same, skipping one session (join/typing notices are not echoed back
    /// to the session that caused them).
    pub fn broadcast_except(&self, room: &str, event: &ChatEvent, exclude: Option<SessionId>) {
        for member in self.presence.members_of(room) {
            if Some(member.session_id) == exclude {
                continue;
            }
            self.deliver(member.session_id, event);
        }
    }

    /// Deliver one event to one session. A session that has already closed
    /// (or whose queue is full) is logged and skipped — partial failure is
    /// expected and never propagated to the sender of the original action.
    pub fn deliver(&self, session_id: SessionId, event: &ChatEvent) {
        if let Some(session) = self.sessions.get(&session_id)
            && !session.send(event.clone())
        {
            warn!(%session_id, "failed to deliver event to session (queue closed or full)");
        }
    }
}
