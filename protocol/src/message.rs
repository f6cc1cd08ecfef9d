use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    File,
    Audio,
    System,
}

/// Delivery lifecycle of a message.
///
/// `Sending`, `Sent`, `Delivered`, and `Read` form a lattice: a message's
/// status only ever advances along it, so a late `delivered` receipt can
/// never downgrade an already-`read` message. `Failed` is a local terminal
/// state for sends the server rejected; it sits outside the lattice and is
/// only cleared by a retry or discard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sending,
    Sent,
    Delivered,
    Read,
    Failed,
}

impl MessageStatus {
    /// Position in the lattice, or `None` for `Failed`.
    fn rank(self) -> Option<u8> {
        match self {
            Self::Sending => Some(0),
            Self::Sent => Some(1),
            Self::Delivered => Some(2),
            Self::Read => Some(3),
            Self::Failed => None,
        }
    }

    /// Whether moving to `next` is an upward move in the lattice.
    pub fn can_advance_to(self, next: MessageStatus) -> bool {
        match (self.rank(), next.rank()) {
            (Some(current), Some(next)) => next > current,
            _ => false,
        }
    }
}

/// A chat message as carried on the wire and stored per room.
///
/// `id` is server-assigned; before the server acknowledges a send, an
/// optimistic entry uses a locally generated temporary id and carries
/// `is_optimistic = true`. The server echoes the client's temp id back in
/// `temp_id` on confirmation, which is what reconciliation keys on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub room_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub timestamp: DateTime<Utc>,
    pub status: MessageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_id: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_optimistic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub read_by: Vec<String>,
}

/// What the user asked to send, before an optimistic entry is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDraft {
    pub room_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Size in bytes of an attached file, for image/file/audio drafts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}
