//! Chat state tracking for the palaver client.
//!
//! This crate reconstructs a consistent view of chat state from the three
//! independent input channels a client sees: paginated HTTP history,
//! optimistic local sends, and real-time socket events. It sits between
//! `palaver-protocol` (wire format) and higher-level components:
//!
//! ```text
//! palaver-protocol (wire format)
//!        │
//!        ▼
//! palaver-sync (reconciliation + typing/presence) ← THIS CRATE
//!        │
//!        └─> palaver-client / application stores
//! ```
//!
//! # Main Types
//!
//! - [`TrackedChat`] - main entry point: feed it events via
//!   [`TrackedChat::apply`], drive sends through
//!   [`TrackedChat::send_optimistic`] / [`TrackedChat::confirm_sent`]
//! - [`RoomState`] - one room's ordered message list, unread counter, and
//!   last-message summary
//! - [`TypingTracker`] - per-(room, user) typing entries with deadline
//!   expiry
//! - [`PresenceMap`] - best-effort online/offline map
//!
//! The crate performs no I/O and owns no timers: every operation that
//! involves time takes `now` from the caller, so reconciliation and expiry
//! are deterministic under test.
//!
//! # Example Usage
//!
//! ```ignore
//! use palaver_sync::TrackedChat;
//! use chrono::Utc;
//!
//! let mut chat = TrackedChat::new("me");
//!
//! // Process server events
//! chat.apply(&event, Utc::now());
//!
//! // Query state
//! if let Some(room) = chat.room("r1") {
//!     println!("{} unread", room.unread_count);
//! }
//! ```

pub mod tracking;
pub mod types;

pub use tracking::TrackedChat;
pub use types::{
    DraftError, MessageSummary, PresenceEntry, PresenceMap, RoomState, TypingEntry, TypingTracker,
    MAX_CONTENT_LEN, MAX_FILE_BYTES, TYPING_TTL,
};

// Re-export commonly used protocol types
pub use palaver_protocol::{Message, MessageDraft, MessageKind, MessageStatus, ServerEvent};
