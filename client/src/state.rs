use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::RwLock;

use palaver_protocol::AuthPayload;

use crate::ConnectionStatus;

/// The local user's identity, sent during the authentication handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl UserInfo {
    pub(crate) fn auth_payload(&self) -> AuthPayload {
        AuthPayload {
            user_id: self.id.clone(),
            user_name: self.name.clone(),
            user_email: self.email.clone(),
            user_role: self.role.clone(),
        }
    }
}

/// Shared state between the handle, the receiver, and the connection task.
///
/// The membership set is the client's source of truth for which rooms are
/// live; the connection task replays it as fresh joins after every
/// reconnect, since the server keeps no membership across a severed socket.
pub(crate) struct ClientState {
    status: RwLock<ConnectionStatus>,
    pub rooms: RwLock<HashSet<String>>,
    pub attempts: AtomicU32,
}

impl ClientState {
    pub fn new() -> Self {
        Self {
            status: RwLock::new(ConnectionStatus::Disconnected),
            rooms: RwLock::new(HashSet::new()),
            attempts: AtomicU32::new(0),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
            .read()
            .map(|s| *s)
            .unwrap_or(ConnectionStatus::Disconnected)
    }

    pub fn set_status(&self, status: ConnectionStatus) {
        if let Ok(mut slot) = self.status.write() {
            *slot = status;
        }
    }

    pub fn reset_attempts(&self) {
        self.attempts.store(0, Ordering::Relaxed);
    }

    /// Bump and return the attempt number for the next reconnect.
    pub fn next_attempt(&self) -> u32 {
        self.attempts.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn room_ids(&self) -> Vec<String> {
        self.rooms
            .read()
            .map(|r| r.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear_rooms(&self) {
        if let Ok(mut rooms) = self.rooms.write() {
            rooms.clear();
        }
    }
}
