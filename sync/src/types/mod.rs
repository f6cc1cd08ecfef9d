//! Domain state types for tracked chat.

mod presence;
mod room;
mod typing;

pub use presence::{PresenceEntry, PresenceMap};
pub use room::{DraftError, MessageSummary, RoomState, MAX_CONTENT_LEN, MAX_FILE_BYTES};
pub use typing::{TypingEntry, TypingTracker, TYPING_TTL};
