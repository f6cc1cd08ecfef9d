//! Per-room message list state.

use chrono::{DateTime, Utc};
use palaver_protocol::{Message, MessageKind, MessageStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest message body accepted before any network call.
pub const MAX_CONTENT_LEN: usize = 4000;

/// Largest attachment accepted before any network call (10 MiB).
pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Local validation failures, rejected before the draft leaves the client.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DraftError {
    #[error("Message content is empty")]
    EmptyContent,

    #[error("Message content exceeds {MAX_CONTENT_LEN} characters")]
    ContentTooLong,

    #[error("Attachment of {0} bytes exceeds the {MAX_FILE_BYTES} byte limit")]
    FileTooLarge(u64),
}

/// Compact summary of a room's most recent message, for room lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSummary {
    pub message_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub content: String,
    pub kind: MessageKind,
    pub timestamp: DateTime<Utc>,
}

impl MessageSummary {
    fn of(msg: &Message) -> Self {
        Self {
            message_id: msg.id.clone(),
            sender_id: msg.sender_id.clone(),
            sender_name: msg.sender_name.clone(),
            content: msg.content.clone(),
            kind: msg.kind,
            timestamp: msg.timestamp,
        }
    }
}

/// One room's tracked state.
///
/// The message list is kept sorted by timestamp ascending and contains each
/// message id exactly once, regardless of how many paths (history fetch,
/// optimistic send, socket push) delivered it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomState {
    pub id: String,
    pub messages: Vec<Message>,
    pub unread_count: u32,
    pub last_message: Option<MessageSummary>,
    /// Whether older pages remain on the server.
    pub has_more: bool,
    /// Whether the first history page has been fetched.
    pub loaded: bool,
}

impl RoomState {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Self::default()
        }
    }

    pub fn contains(&self, message_id: &str) -> bool {
        self.messages.iter().any(|m| m.id == message_id)
    }

    pub fn find(&self, message_id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == message_id)
    }

    pub(crate) fn find_mut(&mut self, message_id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == message_id)
    }

    /// Insert a message at its sorted position, deduplicating by id.
    ///
    /// Returns false if a message with the same id already exists.
    pub fn add_message(&mut self, msg: Message) -> bool {
        if self.contains(&msg.id) {
            return false;
        }

        let pos = self
            .messages
            .binary_search_by(|m| m.timestamp.cmp(&msg.timestamp))
            .unwrap_or_else(|pos| pos);

        self.refresh_summary(&msg);
        self.messages.insert(pos, msg);
        true
    }

    /// Replace the whole list with the first history page.
    pub fn set_history(&mut self, mut messages: Vec<Message>, has_more: bool) {
        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        if let Some(last) = messages.last() {
            self.last_message = Some(MessageSummary::of(last));
        }
        self.messages = messages;
        self.has_more = has_more;
        self.loaded = true;
    }

    /// Merge a later history page, deduplicating by id.
    pub fn merge_history(&mut self, messages: Vec<Message>, has_more: bool) {
        for msg in messages {
            // add_message refreshes the summary only for newer messages,
            // so merging an older page cannot move it backwards.
            self.add_message(msg);
        }
        self.has_more = has_more;
        self.loaded = true;
    }

    /// Remove a message by id. Returns false if it was not present.
    pub fn remove_message(&mut self, message_id: &str) -> bool {
        let before = self.messages.len();
        self.messages.retain(|m| m.id != message_id);
        let removed = self.messages.len() != before;
        if removed
            && self
                .last_message
                .as_ref()
                .is_some_and(|s| s.message_id == message_id)
        {
            self.last_message = self.messages.last().map(MessageSummary::of);
        }
        removed
    }

    /// Replace the optimistic entry carrying `temp_id` in place with the
    /// canonical record, preserving its position in the list.
    ///
    /// Returns false if no entry with that temp id is pending (e.g. it was
    /// already reconciled through the push path).
    pub fn confirm_optimistic(&mut self, temp_id: &str, mut canonical: Message) -> bool {
        let Some(pos) = self
            .messages
            .iter()
            .position(|m| m.is_optimistic && m.id == temp_id)
        else {
            return false;
        };

        canonical.is_optimistic = false;
        if canonical.status == MessageStatus::Sending {
            canonical.status = MessageStatus::Sent;
        }
        self.refresh_summary(&canonical);
        if self
            .last_message
            .as_ref()
            .is_some_and(|s| s.message_id == temp_id)
        {
            self.last_message = Some(MessageSummary::of(&canonical));
        }
        self.messages[pos] = canonical;
        true
    }

    /// Pending optimistic entry that best matches a pushed message whose
    /// temp id was not echoed: same sender (the local user), identical
    /// content, within 30 seconds; oldest pending first.
    pub(crate) fn fallback_match(&self, pushed: &Message) -> Option<String> {
        self.messages
            .iter()
            .filter(|m| {
                m.is_optimistic
                    && m.sender_id == pushed.sender_id
                    && m.content == pushed.content
                    && (pushed.timestamp - m.timestamp).num_seconds().abs() < 30
            })
            .min_by_key(|m| m.timestamp)
            .map(|m| m.id.clone())
    }

    fn refresh_summary(&mut self, msg: &Message) {
        let newer = self
            .last_message
            .as_ref()
            .is_none_or(|s| s.timestamp <= msg.timestamp);
        if newer {
            self.last_message = Some(MessageSummary::of(msg));
        }
    }
}
