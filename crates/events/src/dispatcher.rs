//! Sequential notification fan-out with per-recipient failure handling.
//!
//! [`NotificationDispatcher`] delivers one rendered message per recipient,
//! one at a time with a fixed inter-message delay. Failures never abort the
//! batch:
//!
//! - `RecipientUnreachable`: counted as failed, not retried.
//! - `RateLimited(n)`: pause exactly `n` seconds, retry that recipient once;
//!   a second failure is counted as failed.
//! - anything else: logged and counted as failed.
//!
//! The dispatcher holds no lock or database session; callers fetch the
//! recipient list first and hand over a plain slice.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use eventcast_core::types::DbId;
use serde::Serialize;
use tokio::sync::watch;

use crate::delivery::chat::{ChatClient, DeliveryError, OutgoingMessage};

/// Default pause between two deliveries.
const DEFAULT_DELAY_MS: u64 = 50;

/// Default number of recipients between two progress updates.
const DEFAULT_PROGRESS_EVERY: usize = 25;

// ---------------------------------------------------------------------------
// DispatchConfig
// ---------------------------------------------------------------------------

/// Immutable dispatcher and render settings, built once at startup.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Pause between two consecutive deliveries.
    pub delay: Duration,
    /// Animations attached to subscriber notifications.
    pub animation_ids: Vec<String>,
    /// Ceiling on recipients for administrative broadcasts.
    pub max_recipients: Option<usize>,
    /// Progress is reported after this many recipients.
    pub progress_every: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
            animation_ids: Vec::new(),
            max_recipients: None,
            progress_every: DEFAULT_PROGRESS_EVERY,
        }
    }
}

impl DispatchConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable                     | Default |
    /// |------------------------------|---------|
    /// | `DISPATCH_DELAY_MS`          | `50`    |
    /// | `NOTIFICATION_ANIMATION_IDS` | empty   |
    /// | `BROADCAST_MAX_RECIPIENTS`   | none    |
    /// | `BROADCAST_PROGRESS_EVERY`   | `25`    |
    pub fn from_env() -> Self {
        let delay_ms = std::env::var("DISPATCH_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_DELAY_MS);
        let animation_ids = std::env::var("NOTIFICATION_ANIMATION_IDS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let max_recipients = std::env::var("BROADCAST_MAX_RECIPIENTS")
            .ok()
            .and_then(|v| v.parse().ok());
        let progress_every = std::env::var("BROADCAST_PROGRESS_EVERY")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|n: &usize| *n > 0)
            .unwrap_or(DEFAULT_PROGRESS_EVERY);

        Self {
            delay: Duration::from_millis(delay_ms),
            animation_ids,
            max_recipients,
            progress_every,
        }
    }

    /// Animation attached to notifications for `post_id`; stable per post.
    pub fn animation_for(&self, post_id: DbId) -> Option<&str> {
        if self.animation_ids.is_empty() {
            return None;
        }
        let idx = post_id.rem_euclid(self.animation_ids.len() as i64) as usize;
        self.animation_ids.get(idx).map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// One delivery target with the state its payload must reflect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Recipient {
    pub user_id: DbId,
    /// Whether this recipient has already liked the post.
    pub has_liked: bool,
}

impl Recipient {
    pub fn new(user_id: DbId) -> Self {
        Self {
            user_id,
            has_liked: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
    /// Recipients never attempted: duplicates and those past the ceiling.
    pub skipped: usize,
}

impl DeliveryReport {
    pub fn total(&self) -> usize {
        self.sent + self.failed + self.skipped
    }
}

/// Live broadcast state published to the operator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastProgress {
    pub processed: usize,
    pub total: usize,
    pub report: DeliveryReport,
    pub finished: bool,
}

enum Outcome {
    Sent,
    Failed,
}

// ---------------------------------------------------------------------------
// NotificationDispatcher
// ---------------------------------------------------------------------------

pub struct NotificationDispatcher {
    client: Arc<dyn ChatClient>,
    config: DispatchConfig,
}

impl NotificationDispatcher {
    pub fn new(client: Arc<dyn ChatClient>, config: DispatchConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn client(&self) -> &Arc<dyn ChatClient> {
        &self.client
    }

    /// Deliver a per-recipient rendering to every recipient.
    ///
    /// `render` is called once per recipient so each payload can reflect
    /// that recipient's own state.
    pub async fn broadcast<F>(&self, recipients: &[Recipient], render: F) -> DeliveryReport
    where
        F: Fn(&Recipient) -> OutgoingMessage,
    {
        self.run(recipients, render, None, None).await
    }

    /// Administrative broadcast: capped by `max_recipients` and publishing
    /// progress every `progress_every` recipients and on completion.
    pub async fn broadcast_with_progress<F>(
        &self,
        recipients: &[Recipient],
        render: F,
        progress: &watch::Sender<BroadcastProgress>,
    ) -> DeliveryReport
    where
        F: Fn(&Recipient) -> OutgoingMessage,
    {
        self.run(recipients, render, self.config.max_recipients, Some(progress))
            .await
    }

    async fn run<F>(
        &self,
        recipients: &[Recipient],
        render: F,
        ceiling: Option<usize>,
        progress: Option<&watch::Sender<BroadcastProgress>>,
    ) -> DeliveryReport
    where
        F: Fn(&Recipient) -> OutgoingMessage,
    {
        let mut report = DeliveryReport::default();
        let mut seen = HashSet::with_capacity(recipients.len());
        let mut targets = Vec::with_capacity(recipients.len());
        for r in recipients {
            if !seen.insert(r.user_id) || ceiling.is_some_and(|max| targets.len() >= max) {
                report.skipped += 1;
            } else {
                targets.push(*r);
            }
        }

        let total = targets.len();
        tracing::info!(total, skipped = report.skipped, "Starting broadcast");

        for (idx, recipient) in targets.iter().enumerate() {
            if idx > 0 && !self.config.delay.is_zero() {
                tokio::time::sleep(self.config.delay).await;
            }

            let message = render(recipient);
            match self.deliver(recipient.user_id, &message).await {
                Outcome::Sent => report.sent += 1,
                Outcome::Failed => report.failed += 1,
            }

            let processed = idx + 1;
            if let Some(tx) = progress {
                if processed % self.config.progress_every.max(1) == 0 && processed < total {
                    tx.send_replace(BroadcastProgress {
                        processed,
                        total,
                        report,
                        finished: false,
                    });
                }
            }
        }

        if let Some(tx) = progress {
            tx.send_replace(BroadcastProgress {
                processed: total,
                total,
                report,
                finished: true,
            });
        }

        tracing::info!(
            sent = report.sent,
            failed = report.failed,
            skipped = report.skipped,
            "Broadcast finished"
        );
        report
    }

    /// Deliver to one recipient, honouring a single rate-limit retry.
    async fn deliver(&self, recipient: DbId, message: &OutgoingMessage) -> Outcome {
        match self.client.send(recipient, message).await {
            Ok(_) => Outcome::Sent,
            Err(DeliveryError::RateLimited { retry_after_secs }) => {
                tracing::warn!(recipient, retry_after_secs, "Rate limited, pausing before retry");
                tokio::time::sleep(Duration::from_secs(retry_after_secs)).await;
                match self.client.send(recipient, message).await {
                    Ok(_) => Outcome::Sent,
                    Err(e) => {
                        tracing::warn!(recipient, error = %e, "Retry after rate limit failed");
                        Outcome::Failed
                    }
                }
            }
            Err(DeliveryError::RecipientUnreachable(reason)) => {
                tracing::info!(recipient, reason = %reason, "Recipient unreachable, skipping");
                Outcome::Failed
            }
            Err(e) => {
                tracing::warn!(recipient, error = %e, "Delivery failed");
                Outcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use eventcast_core::controls::notification_controls;

    use super::*;
    use crate::delivery::recording::RecordingChatClient;

    fn dispatcher(client: Arc<RecordingChatClient>, config: DispatchConfig) -> NotificationDispatcher {
        NotificationDispatcher::new(client, config)
    }

    fn render(r: &Recipient) -> OutgoingMessage {
        OutgoingMessage::text("New event").with_controls(notification_controls(1, r.has_liked, None))
    }

    fn recipients(ids: &[DbId]) -> Vec<Recipient> {
        ids.iter().copied().map(Recipient::new).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_twice_counts_as_one_failure() {
        let client = Arc::new(RecordingChatClient::new());
        client.fail_next(
            2,
            [
                DeliveryError::RateLimited { retry_after_secs: 5 },
                DeliveryError::RateLimited { retry_after_secs: 5 },
            ],
        );
        let d = dispatcher(client.clone(), DispatchConfig::default());

        let start = tokio::time::Instant::now();
        let report = d.broadcast(&recipients(&[1, 2, 3]), render).await;

        assert_eq!(report, DeliveryReport { sent: 2, failed: 1, skipped: 0 });
        assert_eq!(client.attempts(2), 2);
        assert_eq!(client.attempts(3), 1);
        // Two inter-message delays plus exactly the requested back-off.
        assert_eq!(start.elapsed(), Duration::from_secs(5) + Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_retry_can_succeed() {
        let client = Arc::new(RecordingChatClient::new());
        client.fail_next(1, [DeliveryError::RateLimited { retry_after_secs: 3 }]);
        let d = dispatcher(client.clone(), DispatchConfig::default());

        let report = d.broadcast(&recipients(&[1]), render).await;
        assert_eq!(report.sent, 1);
        assert_eq!(client.sent_to(1).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_is_not_retried() {
        let client = Arc::new(RecordingChatClient::new());
        client.fail_next(1, [DeliveryError::RecipientUnreachable("blocked".into())]);
        let d = dispatcher(client.clone(), DispatchConfig::default());

        let report = d.broadcast(&recipients(&[1, 2]), render).await;
        assert_eq!(report, DeliveryReport { sent: 1, failed: 1, skipped: 0 });
        assert_eq!(client.attempts(1), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn payload_reflects_each_recipients_like_state() {
        let client = Arc::new(RecordingChatClient::new());
        let d = dispatcher(client.clone(), DispatchConfig::default());
        let list = [
            Recipient { user_id: 1, has_liked: true },
            Recipient { user_id: 2, has_liked: false },
        ];

        d.broadcast(&list, render).await;
        assert_eq!(client.sent_to(1)[0].controls.rows[0][0].text, "❤️ В избранном");
        assert_eq!(client.sent_to(2)[0].controls.rows[0][0].text, "🤍 В избранное");
    }

    #[tokio::test(start_paused = true)]
    async fn duplicates_and_ceiling_are_skipped() {
        let client = Arc::new(RecordingChatClient::new());
        let config = DispatchConfig {
            max_recipients: Some(2),
            progress_every: 1,
            ..DispatchConfig::default()
        };
        let d = dispatcher(client.clone(), config);
        let (tx, rx) = watch::channel(BroadcastProgress::default());

        let report = d
            .broadcast_with_progress(&recipients(&[1, 1, 2, 3]), render, &tx)
            .await;
        assert_eq!(report, DeliveryReport { sent: 2, failed: 0, skipped: 2 });
        assert_eq!(client.attempts(3), 0);

        let last = *rx.borrow();
        assert!(last.finished);
        assert_eq!(last.processed, 2);
        assert_eq!(last.report, report);
    }

    #[tokio::test(start_paused = true)]
    async fn plain_broadcast_ignores_the_ceiling() {
        let client = Arc::new(RecordingChatClient::new());
        let config = DispatchConfig {
            max_recipients: Some(1),
            ..DispatchConfig::default()
        };
        let d = dispatcher(client, config);
        let report = d.broadcast(&recipients(&[1, 2, 3]), render).await;
        assert_eq!(report.sent, 3);
    }

    #[tokio::test]
    async fn empty_recipient_list_is_a_no_op() {
        let client = Arc::new(RecordingChatClient::new());
        let d = dispatcher(client.clone(), DispatchConfig::default());
        assert_eq!(d.broadcast(&[], render).await, DeliveryReport::default());
        assert!(client.sent().is_empty());
    }

    #[test]
    fn animation_choice_is_stable_per_post() {
        let config = DispatchConfig {
            animation_ids: vec!["a".into(), "b".into()],
            ..DispatchConfig::default()
        };
        assert_eq!(config.animation_for(4), Some("a"));
        assert_eq!(config.animation_for(5), Some("b"));
        assert_eq!(config.animation_for(5), config.animation_for(5));
        assert_eq!(DispatchConfig::default().animation_for(5), None);
    }
}
