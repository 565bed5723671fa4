//! In-process lifecycle event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>`. Lifecycle code publishes after
//! its transaction commits; glue such as the author notifier subscribes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use eventcast_core::types::DbId;

// ---------------------------------------------------------------------------
// LifecycleEvent
// ---------------------------------------------------------------------------

/// Something that happened to a post.
///
/// Constructed via [`LifecycleEvent::new`] and enriched with the builder
/// methods [`with_author`](LifecycleEvent::with_author),
/// [`with_actor`](LifecycleEvent::with_actor),
/// [`with_title`](LifecycleEvent::with_title) and
/// [`with_comment`](LifecycleEvent::with_comment).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// Dot-separated event name, e.g. `"post.approved"`.
    pub event_type: String,

    pub post_id: DbId,

    pub author_id: Option<DbId>,

    /// Moderator or user that triggered the event.
    pub actor_id: Option<DbId>,

    pub title: Option<String>,

    /// Moderator comment, forwarded verbatim to the author.
    pub comment: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl LifecycleEvent {
    pub fn new(event_type: impl Into<String>, post_id: DbId) -> Self {
        Self {
            event_type: event_type.into(),
            post_id,
            author_id: None,
            actor_id: None,
            title: None,
            comment: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_author(mut self, author_id: DbId) -> Self {
        self.author_id = Some(author_id);
        self
    }

    pub fn with_actor(mut self, actor_id: DbId) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out event bus.
///
/// ```rust
/// use eventcast_events::bus::{EventBus, LifecycleEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(LifecycleEvent::new("post.submitted", 1));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<LifecycleEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed events are dropped
    /// and slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers. Dropped silently when
    /// nobody is listening.
    pub fn publish(&self, event: LifecycleEvent) {
        tracing::debug!(event_type = %event.event_type, post_id = event.post_id, "Publishing lifecycle event");
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
