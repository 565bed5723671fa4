//! In-memory [`ChatClient`] that records every call.
//!
//! Used as a dry-run client when no bot token is configured and as the
//! chat double in tests. Failures can be scripted per recipient.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use eventcast_core::controls::Controls;
use eventcast_core::types::DbId;

use super::chat::{ChatClient, DeliveryError, MessageRef, OutgoingMessage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub recipient: DbId,
    pub message: OutgoingMessage,
    pub at: tokio::time::Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditedMessage {
    pub message: MessageRef,
    pub text: String,
    pub controls: Controls,
}

#[derive(Default)]
struct State {
    sent: Vec<SentMessage>,
    edited: Vec<EditedMessage>,
    deleted: Vec<MessageRef>,
    attempts: HashMap<DbId, usize>,
    scripted: HashMap<DbId, VecDeque<DeliveryError>>,
}

#[derive(Default)]
pub struct RecordingChatClient {
    state: Mutex<State>,
    next_message_id: AtomicI64,
}

impl RecordingChatClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue failures for `recipient`; each send attempt consumes one before
    /// succeeding.
    pub fn fail_next(&self, recipient: DbId, errors: impl IntoIterator<Item = DeliveryError>) {
        let mut state = self.lock();
        state.scripted.entry(recipient).or_default().extend(errors);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.lock().sent.clone()
    }

    pub fn sent_to(&self, recipient: DbId) -> Vec<OutgoingMessage> {
        self.lock()
            .sent
            .iter()
            .filter(|s| s.recipient == recipient)
            .map(|s| s.message.clone())
            .collect()
    }

    pub fn edited(&self) -> Vec<EditedMessage> {
        self.lock().edited.clone()
    }

    pub fn deleted(&self) -> Vec<MessageRef> {
        self.lock().deleted.clone()
    }

    /// Send attempts made for `recipient`, successful or not.
    pub fn attempts(&self, recipient: DbId) -> usize {
        self.lock().attempts.get(&recipient).copied().unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A poisoned lock only means a test thread panicked mid-record.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ChatClient for RecordingChatClient {
    async fn send(
        &self,
        recipient: DbId,
        message: &OutgoingMessage,
    ) -> Result<MessageRef, DeliveryError> {
        let mut state = self.lock();
        *state.attempts.entry(recipient).or_default() += 1;
        if let Some(err) = state.scripted.get_mut(&recipient).and_then(VecDeque::pop_front) {
            return Err(err);
        }
        tracing::debug!(recipient, text_len = message.text.len(), "Recorded outgoing message");
        state.sent.push(SentMessage {
            recipient,
            message: message.clone(),
            at: tokio::time::Instant::now(),
        });
        Ok(MessageRef {
            chat_id: recipient,
            message_id: self.next_message_id.fetch_add(1, Ordering::Relaxed) + 1,
        })
    }

    async fn edit(
        &self,
        message: MessageRef,
        text: &str,
        controls: &Controls,
    ) -> Result<(), DeliveryError> {
        self.lock().edited.push(EditedMessage {
            message,
            text: text.to_string(),
            controls: controls.clone(),
        });
        Ok(())
    }

    async fn delete(&self, message: MessageRef) -> Result<(), DeliveryError> {
        self.lock().deleted.push(message);
        Ok(())
    }
}
