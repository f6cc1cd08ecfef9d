use anyhow::{Context, Result};
use palaver_protocol::{Message, Room};
use serde::{Deserialize, Serialize};

/// One page of room history.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub has_more: bool,
}

/// Room admin changes.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// REST collaborator for message persistence and room admin.
///
/// The socket carries real-time pushes; durable operations go through
/// here. A failed `post_message` is what turns an optimistic entry into a
/// `failed` one - the caller maps the error onto `TrackedChat::mark_failed`
/// rather than letting it propagate to the UI as a crash.
pub struct ChatApi {
    http: reqwest::Client,
    base_url: String,
}

impl ChatApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Rooms the given user belongs to.
    pub async fn fetch_rooms(&self, user_id: &str) -> Result<Vec<Room>> {
        let url = format!("{}/chat/rooms/user/{}", self.base_url, user_id);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch rooms for {user_id}"))?
            .error_for_status()
            .context("Room list request rejected")?;
        response.json().await.context("Invalid room list payload")
    }

    /// One page of message history, newest pages first.
    pub async fn fetch_messages(&self, room_id: &str, page: u32, limit: u32) -> Result<MessagePage> {
        let url = format!("{}/chat/messages", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("roomId", room_id),
                ("page", &page.to_string()),
                ("limit", &limit.to_string()),
            ])
            .send()
            .await
            .with_context(|| format!("Failed to fetch messages for room {room_id}"))?
            .error_for_status()
            .context("Message page request rejected")?;
        response.json().await.context("Invalid message page payload")
    }

    /// Persist a message; the server responds with the canonical record,
    /// echoing the client's temp id.
    pub async fn post_message(&self, message: &Message) -> Result<Message> {
        let url = format!("{}/chat/messages", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(message)
            .send()
            .await
            .context("Failed to send message")?
            .error_for_status()
            .context("Message rejected by server")?;
        response.json().await.context("Invalid message response")
    }

    pub async fn delete_message(&self, message_id: &str) -> Result<()> {
        let url = format!("{}/chat/messages/{}", self.base_url, message_id);
        self.http
            .delete(&url)
            .send()
            .await
            .with_context(|| format!("Failed to delete message {message_id}"))?
            .error_for_status()
            .context("Message delete rejected")?;
        Ok(())
    }

    pub async fn delete_room(&self, room_id: &str) -> Result<()> {
        let url = format!("{}/chat/rooms/{}", self.base_url, room_id);
        self.http
            .delete(&url)
            .send()
            .await
            .with_context(|| format!("Failed to delete room {room_id}"))?
            .error_for_status()
            .context("Room delete rejected")?;
        Ok(())
    }

    pub async fn update_room(&self, room_id: &str, update: &RoomUpdate) -> Result<Room> {
        let url = format!("{}/chat/rooms/{}", self.base_url, room_id);
        let response = self
            .http
            .put(&url)
            .json(update)
            .send()
            .await
            .with_context(|| format!("Failed to update room {room_id}"))?
            .error_for_status()
            .context("Room update rejected")?;
        response.json().await.context("Invalid room response")
    }
}
