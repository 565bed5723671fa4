//! Chat-platform delivery: the [`chat::ChatClient`] port and its adapters.

pub mod chat;
pub mod recording;
pub mod telegram;
