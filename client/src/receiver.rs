use anyhow::Result;
use palaver_protocol::ServerEvent;
use tokio::sync::mpsc;

use crate::handle::ChatHandle;
use crate::handler::ChatHandler;
use crate::ChatEvent;

/// Receives events from the connection task and dispatches them to a
/// handler.
pub struct Receiver {
    incoming: mpsc::UnboundedReceiver<ChatEvent>,
    handle: ChatHandle,
}

impl Receiver {
    pub(crate) fn new(incoming: mpsc::UnboundedReceiver<ChatEvent>, handle: ChatHandle) -> Self {
        Self { incoming, handle }
    }

    /// Run the dispatch loop until the connection task ends.
    pub async fn run<H: ChatHandler>(&mut self, handler: &mut H) -> Result<()> {
        while let Some(event) = self.incoming.recv().await {
            self.dispatch(handler, event).await;
        }
        Ok(())
    }

    async fn dispatch<H: ChatHandler>(&mut self, handler: &mut H, event: ChatEvent) {
        match event {
            ChatEvent::Status(status) => handler.on_status(status).await,
            ChatEvent::Server(event) => {
                self.react(&event);
                self.dispatch_server(handler, event).await;
            }
        }
    }

    /// Transport-level reactions that happen before the handler sees the
    /// event: delivery acks for incoming messages, and auto-join of rooms
    /// created with the local user as a participant.
    fn react(&self, event: &ServerEvent) {
        match event {
            ServerEvent::NewMessage(msg)
                if msg.sender_id != self.handle.user_id() && self.handle.in_room(&msg.room_id) =>
            {
                self.handle.mark_delivered(&msg.id, &msg.room_id);
            }
            ServerEvent::RoomCreated { room } if room.has_participant(self.handle.user_id()) => {
                self.handle.join_room(&room.id);
            }
            _ => {}
        }
    }

    async fn dispatch_server<H: ChatHandler>(&self, handler: &mut H, event: ServerEvent) {
        match event {
            ServerEvent::NewMessage(msg) => handler.on_message(&msg).await,
            ServerEvent::MessageSent(msg) => handler.on_message_sent(&msg).await,
            ServerEvent::MessageDelivered(receipt) => {
                handler.on_message_delivered(&receipt).await;
            }
            ServerEvent::MessageRead(receipt) => handler.on_message_read(&receipt).await,
            ServerEvent::UserTyping(signal) => handler.on_typing(&signal).await,
            ServerEvent::UserJoined(update) => handler.on_user_joined(&update).await,
            ServerEvent::UserLeft(update) => handler.on_user_left(&update).await,
            ServerEvent::OnlineUsers(users) => handler.on_online_users(&users).await,
            ServerEvent::RoomCreated { room } => handler.on_room_created(&room).await,
            ServerEvent::RoomJoined(ack) => handler.on_room_joined(&ack).await,
            ServerEvent::RoomLeft(ack) => handler.on_room_left(&ack).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use palaver_protocol::{
        Message, MessageKind, MessageStatus, ReadReceipt, Room, RoomMember, ServerEvent,
    };
    use palaver_sync::TrackedChat;
    use tokio::sync::mpsc;

    use super::*;
    use crate::connection::Outgoing;
    use crate::state::{ClientState, UserInfo};
    use crate::ConnectionStatus;

    /// The usual wiring: translate dispatched events into tracked state.
    struct StoreAdapter {
        chat: TrackedChat,
    }

    impl ChatHandler for StoreAdapter {
        async fn on_message(&mut self, message: &Message) {
            self.chat
                .apply(&ServerEvent::NewMessage(message.clone()), Utc::now());
        }

        async fn on_message_read(&mut self, receipt: &ReadReceipt) {
            self.chat
                .apply(&ServerEvent::MessageRead(receipt.clone()), Utc::now());
        }
    }

    fn pushed(id: &str, room: &str, sender: &str) -> Message {
        Message {
            id: id.to_string(),
            room_id: room.to_string(),
            sender_id: sender.to_string(),
            sender_name: sender.to_uppercase(),
            content: "hi".to_string(),
            kind: MessageKind::Text,
            timestamp: Utc::now(),
            status: MessageStatus::Sent,
            temp_id: None,
            is_optimistic: false,
            delivered_at: None,
            read_at: None,
            read_by: Vec::new(),
        }
    }

    fn wiring() -> (
        Receiver,
        mpsc::UnboundedSender<ChatEvent>,
        mpsc::UnboundedReceiver<Outgoing>,
        Arc<ClientState>,
    ) {
        let state = Arc::new(ClientState::new());
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let user = UserInfo {
            id: "me".to_string(),
            name: "ME".to_string(),
            email: "me@example.edu".to_string(),
            role: "student".to_string(),
        };
        let handle = ChatHandle::new(out_tx, state.clone(), user);
        (Receiver::new(event_rx, handle), event_tx, out_rx, state)
    }

    #[tokio::test]
    async fn test_dispatch_feeds_tracked_state_and_acks_delivery() {
        let (mut receiver, event_tx, mut out_rx, state) = wiring();
        state.set_status(ConnectionStatus::Connected);
        if let Ok(mut rooms) = state.rooms.write() {
            rooms.insert("r1".to_string());
        }

        event_tx
            .send(ChatEvent::Server(ServerEvent::NewMessage(pushed(
                "msg_1", "r1", "u2",
            ))))
            .unwrap();
        event_tx
            .send(ChatEvent::Server(ServerEvent::MessageRead(ReadReceipt {
                message_id: "msg_1".to_string(),
                room_id: "r1".to_string(),
                read_at: Utc::now(),
                read_by: "u2".to_string(),
            })))
            .unwrap();
        drop(event_tx);

        let mut adapter = StoreAdapter {
            chat: TrackedChat::new("me"),
        };
        receiver.run(&mut adapter).await.unwrap();

        let room = adapter.chat.room("r1").unwrap();
        assert_eq!(room.messages.len(), 1);
        assert_eq!(room.messages[0].status, MessageStatus::Read);

        // The receiver acked delivery before dispatching.
        let Ok(Outgoing::Event(ack)) = out_rx.try_recv() else {
            panic!("expected a delivery ack");
        };
        let wire: serde_json::Value = serde_json::from_str(&ack.to_wire_format()).unwrap();
        assert_eq!(wire["event"], "messageDelivered");
        assert_eq!(wire["data"]["messageId"], "msg_1");
    }

    #[tokio::test]
    async fn test_own_messages_are_not_acked() {
        let (mut receiver, event_tx, mut out_rx, state) = wiring();
        state.set_status(ConnectionStatus::Connected);
        if let Ok(mut rooms) = state.rooms.write() {
            rooms.insert("r1".to_string());
        }

        event_tx
            .send(ChatEvent::Server(ServerEvent::NewMessage(pushed(
                "msg_1", "r1", "me",
            ))))
            .unwrap();
        drop(event_tx);

        let mut adapter = StoreAdapter {
            chat: TrackedChat::new("me"),
        };
        receiver.run(&mut adapter).await.unwrap();
        assert!(out_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_room_created_with_local_participant_auto_joins() {
        let (mut receiver, event_tx, mut out_rx, state) = wiring();
        state.set_status(ConnectionStatus::Connected);

        event_tx
            .send(ChatEvent::Server(ServerEvent::RoomCreated {
                room: Room {
                    id: "r9".to_string(),
                    name: "Study group".to_string(),
                    participants: vec![RoomMember {
                        user_id: "me".to_string(),
                        user_name: "ME".to_string(),
                        role: None,
                    }],
                    created_at: None,
                },
            }))
            .unwrap();
        drop(event_tx);

        let mut adapter = StoreAdapter {
            chat: TrackedChat::new("me"),
        };
        receiver.run(&mut adapter).await.unwrap();

        assert!(state.room_ids().contains(&"r9".to_string()));
        let Ok(Outgoing::Event(join)) = out_rx.try_recv() else {
            panic!("expected a join intent");
        };
        let wire: serde_json::Value = serde_json::from_str(&join.to_wire_format()).unwrap();
        assert_eq!(wire["event"], "joinRoom");
        assert_eq!(wire["data"]["roomId"], "r9");
    }
}
