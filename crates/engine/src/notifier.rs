//! Messages a post's author about moderation outcomes.
//!
//! [`AuthorNotifier`] subscribes to the [`EventBus`](eventcast_events::EventBus)
//! and runs as a long-lived background task until the bus is dropped or
//! the cancellation token fires.

use std::sync::Arc;

use eventcast_core::controls::main_menu_controls;
use eventcast_core::lifecycle::{
    EVENT_POST_APPROVED, EVENT_POST_CHANGES_REQUESTED, EVENT_POST_REJECTED, EVENT_POST_SUBMITTED,
};
use eventcast_events::{ChatClient, LifecycleEvent, OutgoingMessage};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

pub struct AuthorNotifier {
    client: Arc<dyn ChatClient>,
}

impl AuthorNotifier {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self { client }
    }

    pub async fn run(
        &self,
        mut receiver: broadcast::Receiver<LifecycleEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Author notifier stopping");
                    break;
                }
                received = receiver.recv() => match received {
                    Ok(event) => self.handle(&event).await,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Author notifier lagged, some authors were not notified");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Event bus closed, author notifier shutting down");
                        break;
                    }
                },
            }
        }
    }

    /// Deliver the author message for `event`, if it warrants one.
    pub async fn handle(&self, event: &LifecycleEvent) {
        let (Some(author_id), Some(text)) = (event.author_id, author_message(event)) else {
            return;
        };
        let message = OutgoingMessage::text(text).with_controls(main_menu_controls());
        if let Err(e) = self.client.send(author_id, &message).await {
            tracing::error!(
                post_id = event.post_id,
                author_id,
                event_type = %event.event_type,
                error = %e,
                "Failed to notify author"
            );
        }
    }
}

/// Text sent to the author, `None` for events authors are not told about.
pub fn author_message(event: &LifecycleEvent) -> Option<String> {
    let title = event.title.as_deref().unwrap_or_default();
    let comment = event.comment.as_deref().unwrap_or_default();

    let text = match event.event_type.as_str() {
        EVENT_POST_SUBMITTED => "✅ Мероприятие отправлено на модерацию!\n\
             После одобрения вы получите уведомление."
            .to_string(),
        EVENT_POST_APPROVED => format!("Ваше мероприятие «{title}» одобрено и опубликовано 🤟😌"),
        EVENT_POST_REJECTED => format!(
            "Ваше мероприятие «{title}» отклонено. Пожалуйста, создайте его заново \
             с учетом указанного комментария 🥲\n\n<b>Комментарий модератора:</b> {comment}"
        ),
        EVENT_POST_CHANGES_REQUESTED => format!(
            "Ваше мероприятие «{title}» требует изменений. Пожалуйста, создайте его заново \
             с учетом указанного комментария ✍️\n\n<b>Комментарий модератора:</b> {comment}"
        ),
        _ => return None,
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use eventcast_core::lifecycle::EVENT_POST_DELETED;
    use eventcast_events::{EventBus, RecordingChatClient};

    use super::*;

    fn event(event_type: &str) -> LifecycleEvent {
        LifecycleEvent::new(event_type, 9)
            .with_author(42)
            .with_title("Quiz night")
            .with_comment(Some("Add the venue <address>".to_string()))
    }

    #[test]
    fn rejection_forwards_comment_verbatim() {
        let text = author_message(&event(EVENT_POST_REJECTED)).unwrap();
        assert!(text.starts_with("Ваше мероприятие «Quiz night» отклонено."));
        assert!(text.ends_with("<b>Комментарий модератора:</b> Add the venue <address>"));
    }

    #[test]
    fn approval_and_changes_have_their_own_texts() {
        assert_eq!(
            author_message(&event(EVENT_POST_APPROVED)).unwrap(),
            "Ваше мероприятие «Quiz night» одобрено и опубликовано 🤟😌"
        );
        assert!(author_message(&event(EVENT_POST_CHANGES_REQUESTED))
            .unwrap()
            .contains("требует изменений"));
    }

    #[test]
    fn deletion_is_silent() {
        assert!(author_message(&event(EVENT_POST_DELETED)).is_none());
    }

    #[tokio::test]
    async fn run_delivers_to_the_author_until_cancelled() {
        let client = Arc::new(RecordingChatClient::new());
        let notifier = AuthorNotifier::new(client.clone());
        let bus = EventBus::default();
        let rx = bus.subscribe();
        let cancel = CancellationToken::new();

        bus.publish(event(EVENT_POST_APPROVED));
        bus.publish(LifecycleEvent::new(EVENT_POST_APPROVED, 10));
        drop(bus);
        notifier.run(rx, cancel).await;

        let sent = client.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, 42);
    }
}
