use thiserror::Error;

pub mod client;
pub mod message;
pub mod room;
pub mod server;

pub use client::{
    AuthPayload, ClientEvent, DeliveryAck, PresencePayload, ReadAck, RoomIntent, RoomReadAck,
    TypingIntent,
};
pub use message::{Message, MessageDraft, MessageKind, MessageStatus};
pub use room::{Room, RoomMember};
pub use server::{
    DeliveryReceipt, PresenceStatus, PresenceUpdate, ReadReceipt, RoomEvent, ServerEvent,
    TypingSignal, parse_server_event,
};

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Invalid event format: {0}")]
    InvalidFormat(String),

    #[error("Invalid payload for '{event}': {reason}")]
    InvalidPayload { event: String, reason: String },

    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Empty event")]
    EmptyEvent,
}
