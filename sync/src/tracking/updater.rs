//! Update logic for folding ServerEvents into tracked chat state

use chrono::{DateTime, Utc};
use palaver_protocol::{DeliveryReceipt, Message, MessageStatus, ReadReceipt, ServerEvent};

use super::chat::TrackedChat;

impl TrackedChat {
    /// Fold one server event into the tracked state.
    ///
    /// `now` is only consulted for typing deadlines; everything else uses
    /// the timestamps carried by the event itself.
    pub fn apply(&mut self, event: &ServerEvent, now: DateTime<Utc>) {
        match event {
            ServerEvent::NewMessage(msg) => {
                self.ingest_message(msg);
            }

            // Direct confirmation of our own send. Same reconciliation path
            // as a pushed echo; never counts as unread.
            ServerEvent::MessageSent(msg) => {
                self.ingest_message(msg);
            }

            ServerEvent::MessageDelivered(receipt) => {
                self.apply_delivered(receipt);
            }

            ServerEvent::MessageRead(receipt) => {
                self.apply_read(receipt);
            }

            ServerEvent::UserTyping(signal) => {
                // Our own signals echo back in group rooms; remote-only.
                if signal.user_id == self.local_user_id() {
                    return;
                }
                if signal.is_typing {
                    self.typing
                        .started(&signal.room_id, &signal.user_id, &signal.user_name, now);
                } else {
                    self.typing.stopped(&signal.room_id, &signal.user_id);
                }
            }

            ServerEvent::UserJoined(update) | ServerEvent::UserLeft(update) => {
                self.presence.upsert(update);
            }

            ServerEvent::OnlineUsers(users) => {
                self.presence.replace(users);
            }

            ServerEvent::RoomCreated { room } => {
                self.room_entry(&room.id);
            }

            ServerEvent::RoomJoined(ack) => {
                self.room_entry(&ack.room_id);
            }

            // Membership intent lives in the client layer; the ack carries
            // nothing the tracker needs.
            ServerEvent::RoomLeft(_) => {}
        }
    }

    /// Ingest a pushed message: reconcile against a pending optimistic
    /// entry if one matches, otherwise append with de-duplication by id.
    fn ingest_message(&mut self, pushed: &Message) {
        let local = pushed.sender_id == self.local_user_id();
        let selected = self.is_selected(&pushed.room_id);
        let room = self.room_entry(&pushed.room_id);

        // Exact reconciliation: the server echoes the client's temp id.
        if let Some(temp_id) = pushed.temp_id.as_deref()
            && room.confirm_optimistic(temp_id, pushed.clone())
        {
            return;
        }

        // Fallback for servers that drop the echo: match our own pending
        // sends by content and time proximity.
        if local
            && let Some(temp_id) = room.fallback_match(pushed)
            && room.confirm_optimistic(&temp_id, pushed.clone())
        {
            return;
        }

        let mut msg = pushed.clone();
        msg.is_optimistic = false;
        if msg.status == MessageStatus::Sending {
            msg.status = MessageStatus::Sent;
        }

        // Duplicate delivery from both the HTTP and socket paths lands here
        // as a rejected insert.
        if room.add_message(msg) && !local && !selected {
            room.unread_count += 1;
        }
    }

    /// Advance a message to `delivered`. Located by id across all rooms;
    /// a late receipt never downgrades an already-`read` message.
    fn apply_delivered(&mut self, receipt: &DeliveryReceipt) {
        if let Some(msg) = self.find_message_mut(&receipt.room_id, &receipt.message_id) {
            msg.delivered_at.get_or_insert(receipt.delivered_at);
            if msg.status.can_advance_to(MessageStatus::Delivered) {
                msg.status = MessageStatus::Delivered;
            }
        }
    }

    /// Advance a message to `read`, accumulating the reader set.
    fn apply_read(&mut self, receipt: &ReadReceipt) {
        if let Some(msg) = self.find_message_mut(&receipt.room_id, &receipt.message_id) {
            msg.read_at.get_or_insert(receipt.read_at);
            if !msg.read_by.contains(&receipt.read_by) {
                msg.read_by.push(receipt.read_by.clone());
            }
            if msg.status.can_advance_to(MessageStatus::Read) {
                msg.status = MessageStatus::Read;
            }
        }
    }

    /// Find a message by id, checking the hinted room first and then every
    /// other room. Receipts may race with room changes, so the hint is an
    /// optimization, not a requirement.
    fn find_message_mut(&mut self, room_hint: &str, message_id: &str) -> Option<&mut Message> {
        let hinted = self
            .rooms
            .get(room_hint)
            .is_some_and(|r| r.contains(message_id));
        if hinted {
            return self.rooms.get_mut(room_hint)?.find_mut(message_id);
        }
        self.rooms
            .values_mut()
            .find_map(|room| room.find_mut(message_id))
    }
}
