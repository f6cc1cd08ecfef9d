use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identification payload sent right after the socket opens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub user_role: String,
}

/// Join or leave intent for a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomIntent {
    pub room_id: String,
    pub user_id: String,
    pub user_name: String,
}

/// Acknowledge local delivery of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAck {
    pub message_id: String,
    pub room_id: String,
    pub user_id: String,
    pub delivered_at: DateTime<Utc>,
}

/// Acknowledge that the local user read a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadAck {
    pub message_id: String,
    pub room_id: String,
    pub user_id: String,
    pub read_at: DateTime<Utc>,
}

/// Mark a whole room read in one signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomReadAck {
    pub room_id: String,
    pub user_id: String,
    pub read_at: DateTime<Utc>,
}

/// Start or stop typing in a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingIntent {
    pub room_id: String,
    pub user_id: String,
    pub user_name: String,
}

/// Explicit presence announcement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresencePayload {
    pub user_id: String,
    pub status: crate::server::PresenceStatus,
    pub last_seen: DateTime<Utc>,
}

/// Events the client emits to the server.
///
/// Serializes to the same `{"event": ..., "data": ...}` envelope the server
/// uses, with camelCase event names on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    Authenticate(AuthPayload),
    JoinRoom(RoomIntent),
    LeaveRoom(RoomIntent),
    MessageDelivered(DeliveryAck),
    MessageRead(ReadAck),
    RoomRead(RoomReadAck),
    Typing(TypingIntent),
    StopTyping(TypingIntent),
    PresenceUpdate(PresencePayload),
}

impl ClientEvent {
    /// Serialize to the wire envelope.
    pub fn to_wire_format(&self) -> String {
        // Serialization of these payloads cannot fail: no maps with
        // non-string keys, no untagged enums.
        serde_json::to_string(self).unwrap_or_default()
    }
}
