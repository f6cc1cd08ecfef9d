use std::sync::Arc;

use chrono::Utc;
use palaver_protocol::{
    ClientEvent, DeliveryAck, PresencePayload, PresenceStatus, ReadAck, RoomIntent, RoomReadAck,
    TypingIntent,
};
use tokio::sync::mpsc;

use crate::connection::Outgoing;
use crate::state::{ClientState, UserInfo};
use crate::ConnectionStatus;

/// Cloneable handle for emitting intents to the server.
///
/// Every emit is a no-op unless the connection is live; nothing here
/// throws or blocks. Membership mutations are optimistic - the local set
/// updates immediately, since the server's ack only confirms, it does not
/// gate local state.
#[derive(Clone)]
pub struct ChatHandle {
    tx: mpsc::UnboundedSender<Outgoing>,
    state: Arc<ClientState>,
    user: UserInfo,
}

impl ChatHandle {
    pub(crate) fn new(
        tx: mpsc::UnboundedSender<Outgoing>,
        state: Arc<ClientState>,
        user: UserInfo,
    ) -> Self {
        Self { tx, state, user }
    }

    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    pub fn status(&self) -> ConnectionStatus {
        self.state.status()
    }

    pub fn is_connected(&self) -> bool {
        self.state.status().is_connected()
    }

    /// Emit an event if the connection is live. Returns whether it was
    /// handed to the connection task.
    fn emit(&self, event: ClientEvent) -> bool {
        if !self.is_connected() {
            return false;
        }
        self.tx.send(Outgoing::Event(event)).is_ok()
    }

    fn room_intent(&self, room_id: &str) -> RoomIntent {
        RoomIntent {
            room_id: room_id.to_string(),
            user_id: self.user.id.clone(),
            user_name: self.user.name.clone(),
        }
    }

    // === Membership ===

    /// Join a room: record it in the membership set and tell the server.
    /// No-op while not connected.
    pub fn join_room(&self, room_id: &str) -> bool {
        if !self.is_connected() {
            return false;
        }
        if let Ok(mut rooms) = self.state.rooms.write() {
            rooms.insert(room_id.to_string());
        }
        self.emit(ClientEvent::JoinRoom(self.room_intent(room_id)))
    }

    /// Leave a room: drop it from the membership set and tell the server.
    /// No-op while not connected.
    pub fn leave_room(&self, room_id: &str) -> bool {
        if !self.is_connected() {
            return false;
        }
        if let Ok(mut rooms) = self.state.rooms.write() {
            rooms.remove(room_id);
        }
        self.emit(ClientEvent::LeaveRoom(self.room_intent(room_id)))
    }

    /// Rooms the client currently considers itself joined to.
    pub fn rooms(&self) -> Vec<String> {
        self.state.room_ids()
    }

    pub fn in_room(&self, room_id: &str) -> bool {
        self.state
            .rooms
            .read()
            .map(|r| r.contains(room_id))
            .unwrap_or(false)
    }

    // === Receipts ===

    pub fn mark_delivered(&self, message_id: &str, room_id: &str) -> bool {
        self.emit(ClientEvent::MessageDelivered(DeliveryAck {
            message_id: message_id.to_string(),
            room_id: room_id.to_string(),
            user_id: self.user.id.clone(),
            delivered_at: Utc::now(),
        }))
    }

    pub fn mark_read(&self, message_id: &str, room_id: &str) -> bool {
        self.emit(ClientEvent::MessageRead(ReadAck {
            message_id: message_id.to_string(),
            room_id: room_id.to_string(),
            user_id: self.user.id.clone(),
            read_at: Utc::now(),
        }))
    }

    /// Mark everything in a room read with one signal.
    pub fn mark_room_read(&self, room_id: &str) -> bool {
        self.emit(ClientEvent::RoomRead(RoomReadAck {
            room_id: room_id.to_string(),
            user_id: self.user.id.clone(),
            read_at: Utc::now(),
        }))
    }

    // === Typing / presence ===

    pub fn start_typing(&self, room_id: &str) -> bool {
        self.emit(ClientEvent::Typing(TypingIntent {
            room_id: room_id.to_string(),
            user_id: self.user.id.clone(),
            user_name: self.user.name.clone(),
        }))
    }

    pub fn stop_typing(&self, room_id: &str) -> bool {
        self.emit(ClientEvent::StopTyping(TypingIntent {
            room_id: room_id.to_string(),
            user_id: self.user.id.clone(),
            user_name: self.user.name.clone(),
        }))
    }

    pub fn announce_presence(&self, status: PresenceStatus) -> bool {
        self.emit(ClientEvent::PresenceUpdate(PresencePayload {
            user_id: self.user.id.clone(),
            status,
            last_seen: Utc::now(),
        }))
    }

    // === Lifecycle ===

    /// Tear the connection down for good - logout only.
    ///
    /// Clears the membership set and ends the connection task, which
    /// cancels any pending reconnect timer with it.
    pub fn disconnect(&self) {
        self.state.clear_rooms();
        let _ = self.tx.send(Outgoing::Shutdown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> UserInfo {
        UserInfo {
            id: "u7".to_string(),
            name: "Dana".to_string(),
            email: "dana@example.edu".to_string(),
            role: "student".to_string(),
        }
    }

    fn test_handle() -> (ChatHandle, mpsc::UnboundedReceiver<Outgoing>, Arc<ClientState>) {
        let state = Arc::new(ClientState::new());
        let (tx, rx) = mpsc::unbounded_channel();
        (ChatHandle::new(tx, state.clone(), test_user()), rx, state)
    }

    #[test]
    fn test_join_is_noop_while_disconnected() {
        let (handle, mut rx, _state) = test_handle();

        assert!(!handle.join_room("r1"));
        assert!(handle.rooms().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_join_and_leave_update_membership_optimistically() {
        let (handle, mut rx, state) = test_handle();
        state.set_status(ConnectionStatus::Connected);

        assert!(handle.join_room("r1"));
        assert!(handle.join_room("r2"));
        assert!(handle.in_room("r1"));
        assert!(handle.in_room("r2"));

        assert!(handle.leave_room("r1"));
        assert!(!handle.in_room("r1"));

        let mut wires = Vec::new();
        while let Ok(Outgoing::Event(event)) = rx.try_recv() {
            let value: serde_json::Value =
                serde_json::from_str(&event.to_wire_format()).unwrap();
            wires.push(value["event"].as_str().unwrap().to_string());
        }
        assert_eq!(wires, vec!["joinRoom", "joinRoom", "leaveRoom"]);
    }

    #[test]
    fn test_receipts_require_live_connection() {
        let (handle, mut rx, state) = test_handle();

        assert!(!handle.mark_delivered("msg_1", "r1"));
        state.set_status(ConnectionStatus::Connected);
        assert!(handle.mark_delivered("msg_1", "r1"));
        assert!(handle.mark_room_read("r1"));

        let Ok(Outgoing::Event(event)) = rx.try_recv() else {
            panic!("expected a delivery ack");
        };
        let value: serde_json::Value = serde_json::from_str(&event.to_wire_format()).unwrap();
        assert_eq!(value["event"], "messageDelivered");
        assert_eq!(value["data"]["messageId"], "msg_1");
        assert_eq!(value["data"]["userId"], "u7");
    }

    #[test]
    fn test_disconnect_clears_membership_and_shuts_down() {
        let (handle, mut rx, state) = test_handle();
        state.set_status(ConnectionStatus::Connected);
        handle.join_room("r1");

        handle.disconnect();
        assert!(handle.rooms().is_empty());

        // Join intent first, then the shutdown marker.
        assert!(matches!(rx.try_recv(), Ok(Outgoing::Event(_))));
        assert!(matches!(rx.try_recv(), Ok(Outgoing::Shutdown)));
    }
}
