//! Eventcast lifecycle events and notification delivery.
//!
//! - [`EventBus`]: in-process publish/subscribe hub for [`LifecycleEvent`]s,
//!   backed by `tokio::sync::broadcast`.
//! - [`delivery`]: the chat-platform port ([`ChatClient`]), the Telegram
//!   HTTP adapter, and an in-memory recording client.
//! - [`media`]: the media-storage port.
//! - [`NotificationDispatcher`]: sequential, rate-limit-aware fan-out.

pub mod bus;
pub mod delivery;
pub mod dispatcher;
pub mod media;

pub use bus::{EventBus, LifecycleEvent};
pub use delivery::chat::{ChatClient, DeliveryError, Media, MessageRef, OutgoingMessage};
pub use delivery::recording::RecordingChatClient;
pub use delivery::telegram::{TelegramClient, TelegramConfig};
pub use dispatcher::{BroadcastProgress, DeliveryReport, DispatchConfig, NotificationDispatcher, Recipient};
pub use media::{MediaHandle, MediaStore, PassThroughMediaStore};
