use palaver_protocol::{
    DeliveryReceipt, Message, PresenceUpdate, ReadReceipt, Room, RoomEvent, TypingSignal,
};

use crate::ConnectionStatus;

/// Trait for handling chat events.
///
/// Implement this trait to react to server pushes and connection status
/// changes. All methods have default no-op implementations, so you only
/// need to implement the events you care about. The usual implementation
/// forwards events into a `palaver_sync::TrackedChat`.
///
/// # Example
///
/// ```ignore
/// struct StoreAdapter {
///     chat: TrackedChat,
/// }
///
/// impl ChatHandler for StoreAdapter {
///     async fn on_message(&mut self, message: &Message) {
///         self.chat.apply(&ServerEvent::NewMessage(message.clone()), Utc::now());
///     }
/// }
/// ```
#[allow(async_fn_in_trait)]
pub trait ChatHandler: Send {
    /// Called on every connection status transition.
    async fn on_status(&mut self, status: ConnectionStatus) {
        let _ = status;
    }

    /// Called for a message pushed to a joined room (including echoes of
    /// our own sends).
    async fn on_message(&mut self, message: &Message) {
        let _ = message;
    }

    /// Called when the server directly confirms one of our sends.
    async fn on_message_sent(&mut self, message: &Message) {
        let _ = message;
    }

    async fn on_message_delivered(&mut self, receipt: &DeliveryReceipt) {
        let _ = receipt;
    }

    async fn on_message_read(&mut self, receipt: &ReadReceipt) {
        let _ = receipt;
    }

    async fn on_typing(&mut self, signal: &TypingSignal) {
        let _ = signal;
    }

    async fn on_user_joined(&mut self, update: &PresenceUpdate) {
        let _ = update;
    }

    async fn on_user_left(&mut self, update: &PresenceUpdate) {
        let _ = update;
    }

    async fn on_online_users(&mut self, users: &[PresenceUpdate]) {
        let _ = users;
    }

    /// Called when a room is created. If the local user is a participant
    /// the client has already auto-joined it.
    async fn on_room_created(&mut self, room: &Room) {
        let _ = room;
    }

    async fn on_room_joined(&mut self, ack: &RoomEvent) {
        let _ = ack;
    }

    async fn on_room_left(&mut self, ack: &RoomEvent) {
        let _ = ack;
    }
}
