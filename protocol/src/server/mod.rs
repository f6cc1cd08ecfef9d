mod tests;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::Message;
use crate::room::Room;
use crate::ParseError;

/// Receipt that a message reached a recipient's client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReceipt {
    pub message_id: String,
    pub room_id: String,
    pub delivered_at: DateTime<Utc>,
}

/// Receipt that a recipient read a message.
///
/// One event per reader; clients accumulate `read_by` into a set for
/// group rooms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceipt {
    pub message_id: String,
    pub room_id: String,
    pub read_at: DateTime<Utc>,
    pub read_by: String,
}

/// A remote user's typing state change in a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingSignal {
    pub room_id: String,
    pub user_id: String,
    pub user_name: String,
    pub is_typing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Offline,
}

/// Best-effort presence for a single user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceUpdate {
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    pub status: PresenceStatus,
    pub last_seen: DateTime<Utc>,
}

/// Server acknowledgment of a room join or leave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomEvent {
    pub room_id: String,
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
}

/// Events pushed by the server over the socket.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// A message broadcast to a room (may be the echo of our own send).
    NewMessage(Message),
    /// Direct confirmation of our own send, carrying the canonical record.
    MessageSent(Message),
    MessageDelivered(DeliveryReceipt),
    MessageRead(ReadReceipt),
    UserTyping(TypingSignal),
    UserJoined(PresenceUpdate),
    UserLeft(PresenceUpdate),
    RoomCreated { room: Room },
    RoomJoined(RoomEvent),
    RoomLeft(RoomEvent),
    OnlineUsers(Vec<PresenceUpdate>),
}

/// Wire envelope: `{"event": "<name>", "data": <payload>}`.
#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize)]
struct RoomCreatedPayload {
    room: Room,
}

/// Parse one socket text frame into a structured event.
///
/// Unknown event names are reported as [`ParseError::UnknownEvent`] so the
/// connection loop can log and skip them without dying.
pub fn parse_server_event(text: &str) -> Result<ServerEvent, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::EmptyEvent);
    }

    let envelope: Envelope =
        serde_json::from_str(text).map_err(|e| ParseError::InvalidFormat(e.to_string()))?;

    if envelope.event.is_empty() {
        return Err(ParseError::EmptyEvent);
    }

    let event = match envelope.event.as_str() {
        "newMessage" => ServerEvent::NewMessage(payload(&envelope.event, envelope.data)?),
        "messageSent" => ServerEvent::MessageSent(payload(&envelope.event, envelope.data)?),
        "messageDelivered" => {
            ServerEvent::MessageDelivered(payload(&envelope.event, envelope.data)?)
        }
        "messageRead" => ServerEvent::MessageRead(payload(&envelope.event, envelope.data)?),
        "userTyping" => ServerEvent::UserTyping(payload(&envelope.event, envelope.data)?),
        "userJoined" => ServerEvent::UserJoined(payload(&envelope.event, envelope.data)?),
        "userLeft" => ServerEvent::UserLeft(payload(&envelope.event, envelope.data)?),
        "roomCreated" => {
            let RoomCreatedPayload { room } = payload(&envelope.event, envelope.data)?;
            ServerEvent::RoomCreated { room }
        }
        "roomJoined" => ServerEvent::RoomJoined(payload(&envelope.event, envelope.data)?),
        "roomLeft" => ServerEvent::RoomLeft(payload(&envelope.event, envelope.data)?),
        "onlineUsers" => ServerEvent::OnlineUsers(payload(&envelope.event, envelope.data)?),
        other => return Err(ParseError::UnknownEvent(other.to_string())),
    };

    Ok(event)
}

fn payload<T: serde::de::DeserializeOwned>(event: &str, data: Value) -> Result<T, ParseError> {
    serde_json::from_value(data).map_err(|e| ParseError::InvalidPayload {
        event: event.to_string(),
        reason: e.to_string(),
    })
}
