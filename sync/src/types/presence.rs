//! Best-effort online/offline presence.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use palaver_protocol::{PresenceStatus, PresenceUpdate};

/// One user's last known presence.
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceEntry {
    pub user_id: String,
    pub user_name: String,
    pub status: PresenceStatus,
    pub last_seen: DateTime<Utc>,
}

impl From<&PresenceUpdate> for PresenceEntry {
    fn from(update: &PresenceUpdate) -> Self {
        Self {
            user_id: update.user_id.clone(),
            user_name: update.user_name.clone(),
            status: update.status,
            last_seen: update.last_seen,
        }
    }
}

/// Presence cache keyed by user id.
///
/// Last-write-wins per event; there is no reconciliation pass against
/// server truth.
#[derive(Debug, Default)]
pub struct PresenceMap {
    users: HashMap<String, PresenceEntry>,
}

impl PresenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, update: &PresenceUpdate) {
        self.users
            .insert(update.user_id.clone(), PresenceEntry::from(update));
    }

    /// Replace the whole map with a server snapshot.
    pub fn replace(&mut self, users: &[PresenceUpdate]) {
        self.users = users
            .iter()
            .map(|u| (u.user_id.clone(), PresenceEntry::from(u)))
            .collect();
    }

    pub fn get(&self, user_id: &str) -> Option<&PresenceEntry> {
        self.users.get(user_id)
    }

    /// Availability for a user, defaulting to offline if unknown.
    pub fn status_of(&self, user_id: &str) -> PresenceStatus {
        self.users
            .get(user_id)
            .map(|e| e.status)
            .unwrap_or(PresenceStatus::Offline)
    }

    pub fn online_count(&self) -> usize {
        self.users
            .values()
            .filter(|e| e.status == PresenceStatus::Online)
            .count()
    }

    pub fn clear(&mut self) {
        self.users.clear();
    }
}
