use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;

use super::broadcast::RoomBroadcaster;
use super::events::{ChatEvent, SessionId};

/// Default inactivity window before a typing indicator auto-reverts.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(3);

struct TypingEntry {
    username: String,
    /// Generation of the most recent ping. Expiry tasks carry the generation
    /// they were armed with; a refresh bumps it so stale tasks become no-ops.
    generation: u64,
}

type TypingKey = (SessionId, String);

/// Converts raw keystroke pings into start/stop typing events. For any
/// (session, room) pair at most one `is_typing: true` broadcast is
/// outstanding without a matching `false` having fired in between.
pub struct TypingTracker {
    entries: Arc<DashMap<TypingKey, TypingEntry>>,
    broadcaster: Arc<RoomBroadcaster>,
    debounce: Duration,
    next_generation: AtomicU64,
}

impl TypingTracker {
    pub fn new(broadcaster: Arc<RoomBroadcaster>, debounce: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            broadcaster,
            debounce,
            next_generation: AtomicU64::new(0),
        }
    }

    /// Record a keystroke ping. Flipping from "not typing" broadcasts
    /// `is_typing: true` to the rest of the room; a redundant ping only
    /// refreshes the timeout. Either way the expiry timer restarts.
    pub fn ping(&self, session_id: SessionId, room: &str, username: &str) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let key = (session_id, room.to_string());

        use dashmap::mapref::entry::Entry;
        let flipped = match self.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                occupied.get_mut().generation = generation;
                false
            }
            Entry::Vacant(vacant) => {
                vacant.insert(TypingEntry {
                    username: username.to_string(),
                    generation,
                });
                true
            }
        };

        if flipped {
            self.broadcaster.broadcast_except(
                room,
                &ChatEvent::UserTyping {
                    username: username.to_string(),
                    is_typing: true,
                },
                Some(session_id),
            );
        }

        let entries = self.entries.clone();
        let broadcaster = self.broadcaster.clone();
        let debounce = self.debounce;
        tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            // Only the timer armed by the latest ping may expire the entry
            if let Some((_, entry)) = entries.remove_if(&key, |_, e| e.generation == generation) {
                broadcast_stopped(&broadcaster, key.0, &key.1, &entry.username);
            }
        });
    }

    /// Explicit stop signal from the client. Treated like a timeout expiry:
    /// immediate flip plus broadcast. Pending timers find no entry and no-op.
    pub fn stop(&self, session_id: SessionId, room: &str) {
        if let Some((_, entry)) = self.entries.remove(&(session_id, room.to_string())) {
            broadcast_stopped(&self.broadcaster, session_id, room, &entry.username);
        }
    }

    /// Drop a session's typing state without any broadcast (the room is
    /// already being told the user left).
    pub fn forget(&self, session_id: SessionId, room: &str) {
        self.entries.remove(&(session_id, room.to_string()));
    }
}

/// Typing events are never echoed back to the typist.
fn broadcast_stopped(
    broadcaster: &RoomBroadcaster,
    session_id: SessionId,
    room: &str,
    username: &str,
) {
    broadcaster.broadcast_except(
        room,
        &ChatEvent::UserTyping {
            username: username.to_string(),
            is_typing: false,
        },
        Some(session_id),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::presence::PresenceRegistry;
    use crate::engine::session::{MAX_OUTBOUND_QUEUE, UserSession};
    use tokio::sync::mpsc;
    use uuid::Uuid;

    struct Harness {
        tracker: TypingTracker,
        typist: SessionId,
        observer_rx: mpsc::Receiver<ChatEvent>,
        _typist_rx: mpsc::Receiver<ChatEvent>,
    }

    /// Two sessions in "general": a typist and an observer whose queue we
    /// inspect for typing events.
    fn setup(debounce: Duration) -> Harness {
        let sessions = Arc::new(DashMap::new());
        let presence = Arc::new(PresenceRegistry::new());

        let typist = Uuid::new_v4();
        let (typist_tx, typist_rx) = mpsc::channel(MAX_OUTBOUND_QUEUE);
        sessions.insert(typist, Arc::new(UserSession::new(typist, typist_tx)));
        presence.register(typist, "alice", "general");

        let observer = Uuid::new_v4();
        let (observer_tx, observer_rx) = mpsc::channel(MAX_OUTBOUND_QUEUE);
        sessions.insert(observer, Arc::new(UserSession::new(observer, observer_tx)));
        presence.register(observer, "bob", "general");

        let broadcaster = Arc::new(RoomBroadcaster::new(sessions, presence));
        Harness {
            tracker: TypingTracker::new(broadcaster, debounce),
            typist,
            observer_rx,
            _typist_rx: typist_rx,
        }
    }

    fn typing_events(rx: &mut mpsc::Receiver<ChatEvent>) -> Vec<bool> {
        let mut flips = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let ChatEvent::UserTyping { is_typing, .. } = event {
                flips.push(is_typing);
            }
        }
        flips
    }

    #[tokio::test]
    async fn test_repeated_pings_broadcast_once() {
        let mut h = setup(Duration::from_secs(30));
        for _ in 0..5 {
            h.tracker.ping(h.typist, "general", "alice");
        }
        assert_eq!(typing_events(&mut h.observer_rx), vec![true]);
    }

    #[tokio::test]
    async fn test_explicit_stop_flips_once() {
        let mut h = setup(Duration::from_secs(30));
        h.tracker.ping(h.typist, "general", "alice");
        h.tracker.stop(h.typist, "general");
        // Second stop is a no-op
        h.tracker.stop(h.typist, "general");
        assert_eq!(typing_events(&mut h.observer_rx), vec![true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_broadcasts_stop_exactly_once() {
        let mut h = setup(DEFAULT_DEBOUNCE);
        h.tracker.ping(h.typist, "general", "alice");

        // Paused time auto-advances to the expiry timer
        tokio::time::sleep(DEFAULT_DEBOUNCE + Duration::from_millis(100)).await;
        tokio::task::yield_now().await;

        assert_eq!(typing_events(&mut h.observer_rx), vec![true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_postpones_timeout() {
        let mut h = setup(DEFAULT_DEBOUNCE);
        h.tracker.ping(h.typist, "general", "alice");

        tokio::time::sleep(Duration::from_secs(2)).await;
        h.tracker.ping(h.typist, "general", "alice");

        // 2s + 2s exceeds the 3s window, but the refresh restarted it
        tokio::time::sleep(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert_eq!(typing_events(&mut h.observer_rx), vec![true]);

        tokio::time::sleep(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert_eq!(typing_events(&mut h.observer_rx), vec![false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_pending_timer() {
        let mut h = setup(DEFAULT_DEBOUNCE);
        h.tracker.ping(h.typist, "general", "alice");
        h.tracker.stop(h.typist, "general");

        tokio::time::sleep(DEFAULT_DEBOUNCE * 2).await;
        tokio::task::yield_now().await;

        // One true, one false from the explicit stop, nothing from the timer
        assert_eq!(typing_events(&mut h.observer_rx), vec![true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ping_after_stop_starts_fresh_cycle() {
        let mut h = setup(DEFAULT_DEBOUNCE);
        h.tracker.ping(h.typist, "general", "alice");
        h.tracker.stop(h.typist, "general");
        h.tracker.ping(h.typist, "general", "alice");

        tokio::time::sleep(DEFAULT_DEBOUNCE + Duration::from_millis(100)).await;
        tokio::task::yield_now().await;

        assert_eq!(
            typing_events(&mut h.observer_rx),
            vec![true, false, true, false]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_forget_suppresses_broadcast() {
        let mut h = setup(DEFAULT_DEBOUNCE);
        h.tracker.ping(h.typist, "general", "alice");
        h.tracker.forget(h.typist, "general");

        tokio::time::sleep(DEFAULT_DEBOUNCE * 2).await;
        tokio::task::yield_now().await;

        assert_eq!(typing_events(&mut h.observer_rx), vec![true]);
    }
}
