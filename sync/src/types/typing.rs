//! Typing indicator tracking with deadline expiry.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Quiet period after which a typing entry expires without a renewal.
pub const TYPING_TTL: Duration = Duration::from_secs(3);

/// One remote user typing in one room.
#[derive(Debug, Clone, PartialEq)]
pub struct TypingEntry {
    pub room_id: String,
    pub user_id: String,
    pub user_name: String,
    pub signaled_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Remote typing state, keyed by `(room_id, user_id)`.
///
/// Each entry carries its own deadline; a renewed signal replaces the
/// deadline and an explicit stop removes the entry, so nothing leaks when
/// a user's "stopped typing" never arrives. The caller drives expiry by
/// polling [`TypingTracker::expire_due`] with the current time.
#[derive(Debug, Default)]
pub struct TypingTracker {
    entries: HashMap<(String, String), TypingEntry>,
}

impl TypingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert an entry with a fresh deadline of `now + 3s`.
    pub fn started(&mut self, room_id: &str, user_id: &str, user_name: &str, now: DateTime<Utc>) {
        self.entries.insert(
            (room_id.to_string(), user_id.to_string()),
            TypingEntry {
                room_id: room_id.to_string(),
                user_id: user_id.to_string(),
                user_name: user_name.to_string(),
                signaled_at: now,
                expires_at: now + TYPING_TTL,
            },
        );
    }

    /// Remove an entry on an explicit stop signal, cancelling its deadline.
    pub fn stopped(&mut self, room_id: &str, user_id: &str) -> bool {
        self.entries
            .remove(&(room_id.to_string(), user_id.to_string()))
            .is_some()
    }

    /// Remove and return every entry whose deadline has passed.
    ///
    /// The returned entries let the caller surface synthetic stopped-typing
    /// updates for users whose renewal never arrived.
    pub fn expire_due(&mut self, now: DateTime<Utc>) -> Vec<TypingEntry> {
        let due: Vec<(String, String)> = self
            .entries
            .iter()
            .filter(|(_, e)| e.expires_at <= now)
            .map(|(k, _)| k.clone())
            .collect();

        due.into_iter()
            .filter_map(|k| self.entries.remove(&k))
            .collect()
    }

    /// Earliest pending deadline, for drivers that sleep until the next one.
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.entries.values().map(|e| e.expires_at).min()
    }

    /// Users currently typing in a room.
    pub fn typing_in(&self, room_id: &str) -> Vec<&TypingEntry> {
        let mut entries: Vec<&TypingEntry> = self
            .entries
            .values()
            .filter(|e| e.room_id == room_id)
            .collect();
        entries.sort_by(|a, b| a.signaled_at.cmp(&b.signaled_at));
        entries
    }

    pub fn is_typing(&self, room_id: &str, user_id: &str) -> bool {
        self.entries
            .contains_key(&(room_id.to_string(), user_id.to_string()))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
