//! The chat-platform port consumed by the dispatcher and the engine.

use async_trait::async_trait;
use eventcast_core::controls::Controls;
use eventcast_core::types::DbId;

use crate::media::MediaHandle;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Why a single delivery attempt failed.
///
/// Handled per recipient inside the dispatcher; never propagated out of a
/// broadcast.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The recipient blocked the bot or no longer exists.
    #[error("Recipient unreachable: {0}")]
    RecipientUnreachable(String),

    /// The platform asked us to back off.
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Network, DNS or timeout failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The platform rejected the request for another reason.
    #[error("Platform API error {code}: {description}")]
    Api { code: u16, description: String },
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Locates a sent message for later edit or delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: DbId,
    pub message_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Media {
    Photo(MediaHandle),
    Animation(MediaHandle),
}

/// A rendered message ready for delivery. The text uses the platform's
/// safe HTML markup subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub text: String,
    pub media: Option<Media>,
    pub controls: Controls,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            media: None,
            controls: Controls::default(),
        }
    }

    pub fn with_media(mut self, media: Option<Media>) -> Self {
        self.media = media;
        self
    }

    pub fn with_controls(mut self, controls: Controls) -> Self {
        self.controls = controls;
        self
    }
}

// ---------------------------------------------------------------------------
// Port
// ---------------------------------------------------------------------------

/// Sends, edits and deletes messages on the chat platform.
///
/// Each call uses the implementation's own timeout.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn send(
        &self,
        recipient: DbId,
        message: &OutgoingMessage,
    ) -> Result<MessageRef, DeliveryError>;

    /// Replace the text (or caption) and controls of a sent message.
    async fn edit(
        &self,
        message: MessageRef,
        text: &str,
        controls: &Controls,
    ) -> Result<(), DeliveryError>;

    async fn delete(&self, message: MessageRef) -> Result<(), DeliveryError>;
}
