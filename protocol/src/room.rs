use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A participant entry in a room's member list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMember {
    pub user_id: String,
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// A chat room as described by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub participants: Vec<RoomMember>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Room {
    /// Whether the given user appears in the participant list.
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|m| m.user_id == user_id)
    }
}
