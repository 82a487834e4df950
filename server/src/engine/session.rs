use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use super::events::{ChatEvent, SessionId};

/// Maximum queued outbound events per session (prevents memory exhaustion from slow clients).
pub const MAX_OUTBOUND_QUEUE: usize = 256;

/// Where a session is in its lifecycle. A session starts `Connected` (transport
/// open, no room) and moves to `Joined` once a join succeeds. Closing the
/// transport removes the session entirely, which is the terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Connected,
    Joined { username: String, room: String },
}

/// A connected client session. The transport layer owns the socket; the engine
/// only ever talks to the session through its outbound queue.
#[derive(Debug)]
pub struct UserSession {
    pub id: SessionId,
    /// Send outbound events to this session's write loop (bounded to prevent memory exhaustion).
    pub outbound: mpsc::Sender<ChatEvent>,
    pub connected_at: DateTime<Utc>,
    phase: Mutex<SessionPhase>,
}

impl UserSession {
    pub fn new(id: SessionId, outbound: mpsc::Sender<ChatEvent>) -> Self {
        Self {
            id,
            outbound,
            connected_at: Utc::now(),
            phase: Mutex::new(SessionPhase::Connected),
        }
    }

    /// Send an event to this session. Returns false if the channel is closed
    /// or the outbound queue is full (slow client protection — drops event rather than blocking).
    pub fn send(&self, event: ChatEvent) -> bool {
        self.outbound.try_send(event).is_ok()
    }

    /// Snapshot of the current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase.lock().unwrap().clone()
    }

    /// The (username, room) pair if this session has joined a room.
    pub fn joined(&self) -> Option<(String, String)> {
        match &*self.phase.lock().unwrap() {
            SessionPhase::Joined { username, room } => Some((username.clone(), room.clone())),
            SessionPhase::Connected => None,
        }
    }

    /// Mark the session as joined. Returns the room it previously occupied,
    /// if any (the caller owes that room a leave notice).
    pub fn enter_room(&self, username: &str, room: &str) -> Option<String> {
        let mut phase = self.phase.lock().unwrap();
        let previous = match &*phase {
            SessionPhase::Joined { room, .. } => Some(room.clone()),
            SessionPhase::Connected => None,
        };
        *phase = SessionPhase::Joined {
            username: username.to_string(),
            room: room.to_string(),
        };
        previous
    }

    /// Return the session to `Connected`. Returns the (username, room) it was
    /// joined to, or `None` if it was not in a room.
    pub fn exit_room(&self) -> Option<(String, String)> {
        let mut phase = self.phase.lock().unwrap();
        match std::mem::replace(&mut *phase, SessionPhase::Connected) {
            SessionPhase::Joined { username, room } => Some((username, room)),
            SessionPhase::Connected => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn session() -> (UserSession, mpsc::Receiver<ChatEvent>) {
        let (tx, rx) = mpsc::channel(MAX_OUTBOUND_QUEUE);
        (UserSession::new(Uuid::new_v4(), tx), rx)
    }

    #[test]
    fn test_phase_transitions() {
        let (s, _rx) = session();
        assert_eq!(s.phase(), SessionPhase::Connected);
        assert!(s.joined().is_none());

        assert_eq!(s.enter_room("alice", "general"), None);
        assert_eq!(
            s.joined(),
            Some(("alice".to_string(), "general".to_string()))
        );

        // Re-join into another room reports the previous one
        assert_eq!(s.enter_room("alice", "rust"), Some("general".to_string()));

        assert_eq!(s.exit_room(), Some(("alice".to_string(), "rust".to_string())));
        assert_eq!(s.phase(), SessionPhase::Connected);
        assert_eq!(s.exit_room(), None);
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (s, rx) = session();
        drop(rx);
        assert!(!s.send(ChatEvent::SystemMessage {
            message: "hi".into()
        }));
    }
}
