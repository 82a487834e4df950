use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::Utc;

use super::events::{SessionId, StoredMessage};

/// Default number of retained messages across all rooms.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Hard cap on how many messages a single `recent` call may return.
pub const MAX_FETCH: usize = 200;

/// Bounded append-only log of chat messages. Messages are immutable once
/// appended; ordering is arrival order at the store, not client-declared
/// time. Once the capacity is reached the oldest entries are evicted.
pub struct MessageStore {
    inner: Mutex<StoreInner>,
    capacity: usize,
    max_fetch: usize,
}

struct StoreInner {
    buf: VecDeque<StoredMessage>,
    next_seq: u64,
    last_timestamp: chrono::DateTime<Utc>,
}

impl MessageStore {
    pub fn new(capacity: usize, max_fetch: usize) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                buf: VecDeque::with_capacity(capacity.min(1024)),
                next_seq: 0,
                last_timestamp: Utc::now(),
            }),
            capacity: capacity.max(1),
            max_fetch: max_fetch.max(1),
        }
    }

    /// Append a message, assigning its sequence id and timestamp. The
    /// `deliver` closure runs under the store lock so that fan-out of two
    /// concurrent appends to the same room cannot interleave — recipients
    /// observe messages in append order. The closure must not block (the
    /// broadcaster only does non-blocking queue pushes).
    pub fn append_with(
        &self,
        user_id: SessionId,
        username: &str,
        message: &str,
        room: &str,
        deliver: impl FnOnce(&StoredMessage),
    ) -> StoredMessage {
        let mut inner = self.inner.lock().unwrap();

        // Timestamps are monotonic per store even if the wall clock steps back.
        let timestamp = Utc::now().max(inner.last_timestamp);
        inner.last_timestamp = timestamp;

        let stored = StoredMessage {
            seq: inner.next_seq,
            user_id,
            username: username.to_string(),
            message: message.to_string(),
            room: room.to_string(),
            timestamp,
        };
        inner.next_seq += 1;

        if inner.buf.len() == self.capacity {
            inner.buf.pop_front();
        }
        inner.buf.push_back(stored.clone());

        deliver(&stored);
        stored
    }

    /// Append without a delivery hook. Used by tests and callers that fan out
    /// through some other path.
    pub fn append(
        &self,
        user_id: SessionId,
        username: &str,
        message: &str,
        room: &str,
    ) -> StoredMessage {
        self.append_with(user_id, username, message, room, |_| {})
    }

    /// Up to `limit` most recent messages for a room, oldest first. The limit
    /// is clamped to the store's fetch cap regardless of what the caller asks
    /// for, to bound payload size.
    pub fn recent(&self, room: &str, limit: usize) -> Vec<StoredMessage> {
        let limit = limit.min(self.max_fetch);
        let inner = self.inner.lock().unwrap();
        let mut messages: Vec<StoredMessage> = inner
            .buf
            .iter()
            .rev()
            .filter(|m| m.room == room)
            .take(limit)
            .cloned()
            .collect();
        messages.reverse();
        messages
    }

    /// Total number of retained messages across all rooms.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, MAX_FETCH)
    }
}
