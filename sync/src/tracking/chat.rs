//! TrackedChat - main chat state tracking struct

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use palaver_protocol::{Message, MessageDraft, MessageStatus};
use uuid::Uuid;

use crate::types::{
    DraftError, PresenceMap, RoomState, TypingEntry, TypingTracker, MAX_CONTENT_LEN,
    MAX_FILE_BYTES,
};

/// Chat state reconstructed from server events and local actions.
///
/// This struct merges the three message sources a client sees - paginated
/// HTTP history, optimistic local sends, and real-time pushes - into one
/// consistent per-room list. All operations are idempotent and tolerate
/// out-of-order arrival: de-duplication is by message id and status moves
/// only upward through the delivery lattice, so it does not matter whether
/// the HTTP response or the socket echo lands first.
#[derive(Debug)]
pub struct TrackedChat {
    local_user_id: String,

    /// Tracked rooms by id.
    pub(crate) rooms: HashMap<String, RoomState>,

    /// Currently displayed room; its unread counter stays pinned at zero.
    selected: Option<String>,

    /// Remote users' typing state.
    pub(crate) typing: TypingTracker,

    /// Rooms where the local user is currently typing.
    typing_local: HashSet<String>,

    /// Best-effort presence of other users.
    pub(crate) presence: PresenceMap,
}

impl TrackedChat {
    pub fn new(local_user_id: &str) -> Self {
        Self {
            local_user_id: local_user_id.to_string(),
            rooms: HashMap::new(),
            selected: None,
            typing: TypingTracker::new(),
            typing_local: HashSet::new(),
            presence: PresenceMap::new(),
        }
    }

    pub fn local_user_id(&self) -> &str {
        &self.local_user_id
    }

    // === Rooms ===

    pub fn room(&self, room_id: &str) -> Option<&RoomState> {
        self.rooms.get(room_id)
    }

    pub fn rooms(&self) -> impl Iterator<Item = &RoomState> {
        self.rooms.values()
    }

    pub(crate) fn room_entry(&mut self, room_id: &str) -> &mut RoomState {
        self.rooms
            .entry(room_id.to_string())
            .or_insert_with(|| RoomState::new(room_id))
    }

    /// Select the room currently on screen (or none).
    ///
    /// Selection zeroes the room's unread counter; messages arriving for
    /// the selected room do not count as unread.
    pub fn select_room(&mut self, room_id: Option<&str>) {
        self.selected = room_id.map(str::to_string);
        if let Some(id) = room_id
            && let Some(room) = self.rooms.get_mut(id)
        {
            room.unread_count = 0;
        }
    }

    pub fn selected_room(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub(crate) fn is_selected(&self, room_id: &str) -> bool {
        self.selected.as_deref() == Some(room_id)
    }

    pub fn unread_total(&self) -> u32 {
        self.rooms.values().map(|r| r.unread_count).sum()
    }

    // === History ===

    /// Fold a history page into the room.
    ///
    /// The first page replaces the list; later pages merge with
    /// de-duplication by id, so overlap with pushed messages is harmless.
    pub fn ingest_history(
        &mut self,
        room_id: &str,
        page: u32,
        messages: Vec<Message>,
        has_more: bool,
    ) {
        let room = self.room_entry(room_id);
        if page <= 1 {
            room.set_history(messages, has_more);
        } else {
            room.merge_history(messages, has_more);
        }
    }

    // === Sending ===

    /// Create and append the optimistic entry for a send.
    ///
    /// Validates the draft before anything touches the network, then
    /// appends a `sending` entry under a fresh temp id. The returned
    /// message is what the caller POSTs; its `temp_id` must be echoed by
    /// the server for exact reconciliation.
    pub fn send_optimistic(
        &mut self,
        draft: MessageDraft,
        now: DateTime<Utc>,
    ) -> Result<Message, DraftError> {
        validate_draft(&draft)?;

        let temp_id = format!("temp_{}", Uuid::new_v4());
        let message = Message {
            id: temp_id.clone(),
            room_id: draft.room_id,
            sender_id: draft.sender_id,
            sender_name: draft.sender_name,
            content: draft.content,
            kind: draft.kind,
            timestamp: now,
            status: MessageStatus::Sending,
            temp_id: Some(temp_id),
            is_optimistic: true,
            delivered_at: None,
            read_at: None,
            read_by: Vec::new(),
        };

        self.room_entry(&message.room_id).add_message(message.clone());
        Ok(message)
    }

    /// Reconcile the HTTP send response against the pending optimistic
    /// entry, replacing it in place so the message does not visually jump.
    ///
    /// Falls back to a plain deduplicated insert when the optimistic entry
    /// is already gone (e.g. the socket echo won the race).
    pub fn confirm_sent(&mut self, temp_id: &str, canonical: Message) {
        let room = self.room_entry(&canonical.room_id);
        if !room.confirm_optimistic(temp_id, canonical.clone()) {
            let mut msg = canonical;
            msg.is_optimistic = false;
            if msg.status == MessageStatus::Sending {
                msg.status = MessageStatus::Sent;
            }
            room.add_message(msg);
        }
    }

    /// Mark a pending send as failed. The entry stays in the list so the
    /// user can see it and retry or discard it.
    pub fn mark_failed(&mut self, room_id: &str, temp_id: &str) -> bool {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return false;
        };
        match room.find_mut(temp_id) {
            Some(msg) if msg.is_optimistic => {
                msg.status = MessageStatus::Failed;
                true
            }
            _ => false,
        }
    }

    /// Put a failed entry back into `sending` for a retry.
    pub fn mark_sending(&mut self, room_id: &str, temp_id: &str) -> bool {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return false;
        };
        match room.find_mut(temp_id) {
            Some(msg) if msg.status == MessageStatus::Failed => {
                msg.status = MessageStatus::Sending;
                true
            }
            _ => false,
        }
    }

    /// Remove a message after a server-confirmed delete. No-op when the
    /// message is already gone.
    pub fn remove_message(&mut self, room_id: &str, message_id: &str) -> bool {
        self.rooms
            .get_mut(room_id)
            .is_some_and(|room| room.remove_message(message_id))
    }

    // === Typing ===

    /// Users currently typing in a room (remote users only).
    pub fn typing_users(&self, room_id: &str) -> Vec<&TypingEntry> {
        self.typing.typing_in(room_id)
    }

    /// Expire overdue typing entries, returning them so callers can emit
    /// synthetic stopped-typing updates.
    pub fn expire_typing(&mut self, now: DateTime<Utc>) -> Vec<TypingEntry> {
        self.typing.expire_due(now)
    }

    /// Earliest typing deadline, for drivers that sleep until the next one.
    pub fn next_typing_deadline(&self) -> Option<DateTime<Utc>> {
        self.typing.next_deadline()
    }

    /// Track whether the local user is typing in a room.
    ///
    /// Returns true when the flag changed, i.e. when a typing or
    /// stop-typing signal should actually be emitted.
    pub fn set_local_typing(&mut self, room_id: &str, typing: bool) -> bool {
        if typing {
            self.typing_local.insert(room_id.to_string())
        } else {
            self.typing_local.remove(room_id)
        }
    }

    pub fn is_local_typing(&self, room_id: &str) -> bool {
        self.typing_local.contains(room_id)
    }

    // === Presence ===

    pub fn presence(&self) -> &PresenceMap {
        &self.presence
    }

    /// Drop all tracked state (logout).
    pub fn reset(&mut self) {
        self.rooms.clear();
        self.selected = None;
        self.typing.clear();
        self.typing_local.clear();
        self.presence.clear();
    }
}

fn validate_draft(draft: &MessageDraft) -> Result<(), DraftError> {
    if draft.content.trim().is_empty() {
        return Err(DraftError::EmptyContent);
    }
    if draft.content.chars().count() > MAX_CONTENT_LEN {
        return Err(DraftError::ContentTooLong);
    }
    if let Some(size) = draft.file_size
        && size > MAX_FILE_BYTES
    {
        return Err(DraftError::FileTooLarge(size));
    }
    Ok(())
}
