//! Chat state tracking - reconstructs room state from server events,
//! history pages, and optimistic sends.

mod chat;
mod updater;

pub use chat::TrackedChat;
