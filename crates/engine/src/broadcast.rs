//! Operator-triggered broadcast to all active users.
//!
//! Reuses the dispatcher's per-recipient failure handling. The operator
//! gets a progress message that is edited as deliveries proceed.

use std::sync::Arc;

use eventcast_core::controls::{main_menu_controls, Controls};
use eventcast_core::error::CoreError;
use eventcast_core::types::DbId;
use eventcast_db::repositories::UserRepo;
use eventcast_db::DbPool;
use eventcast_events::{
    BroadcastProgress, DeliveryReport, MessageRef, NotificationDispatcher, OutgoingMessage,
    Recipient,
};
use tokio::sync::watch;

use crate::config::EngineConfig;
use crate::error::EngineResult;

/// Longest operator message accepted for broadcast.
pub const MAX_BROADCAST_LENGTH: usize = 4_096;

pub struct AdminBroadcast {
    pool: DbPool,
    dispatcher: Arc<NotificationDispatcher>,
    config: Arc<EngineConfig>,
}

impl AdminBroadcast {
    pub fn new(pool: DbPool, dispatcher: Arc<NotificationDispatcher>, config: Arc<EngineConfig>) -> Self {
        Self {
            pool,
            dispatcher,
            config,
        }
    }

    /// Send `text` to every active user on behalf of `admin_id`.
    pub async fn run(&self, admin_id: DbId, text: &str) -> EngineResult<DeliveryReport> {
        if !self.config.is_admin(admin_id) {
            return Err(CoreError::Forbidden(format!("User {admin_id} is not an admin")).into());
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(CoreError::Validation("Broadcast message must not be empty".into()).into());
        }
        if text.chars().count() > MAX_BROADCAST_LENGTH {
            return Err(CoreError::Validation(format!(
                "Broadcast message must not exceed {MAX_BROADCAST_LENGTH} characters"
            ))
            .into());
        }

        let recipients: Vec<Recipient> = UserRepo::list_active_ids(&self.pool, None)
            .await?
            .into_iter()
            .map(Recipient::new)
            .collect();
        let planned = self
            .dispatcher
            .config()
            .max_recipients
            .map_or(recipients.len(), |max| recipients.len().min(max));

        tracing::info!(admin_id, recipients = recipients.len(), planned, "Admin broadcast started");

        let client = self.dispatcher.client().clone();
        let initial = BroadcastProgress {
            total: planned,
            ..BroadcastProgress::default()
        };
        let progress_message = match client
            .send(admin_id, &OutgoingMessage::text(progress_text(&initial)))
            .await
        {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::warn!(admin_id, error = %e, "Could not send broadcast progress message");
                None
            }
        };

        let (tx, rx) = watch::channel(initial);
        let message = OutgoingMessage::text(text).with_controls(main_menu_controls());

        let deliver = async {
            let report = self
                .dispatcher
                .broadcast_with_progress(&recipients, |_| message.clone(), &tx)
                .await;
            drop(tx);
            report
        };
        let (report, ()) = tokio::join!(deliver, self.report_progress(rx, progress_message));

        tracing::info!(
            admin_id,
            sent = report.sent,
            failed = report.failed,
            skipped = report.skipped,
            "Admin broadcast finished"
        );
        Ok(report)
    }

    /// Mirror progress updates into the operator's progress message.
    async fn report_progress(
        &self,
        mut rx: watch::Receiver<BroadcastProgress>,
        message: Option<MessageRef>,
    ) {
        let client = self.dispatcher.client();
        while rx.changed().await.is_ok() {
            let progress = *rx.borrow_and_update();
            tracing::info!(
                processed = progress.processed,
                total = progress.total,
                sent = progress.report.sent,
                failed = progress.report.failed,
                "Admin broadcast progress"
            );
            if let Some(message) = message {
                let controls = if progress.finished {
                    main_menu_controls()
                } else {
                    Controls::default()
                };
                if let Err(e) = client.edit(message, &progress_text(&progress), &controls).await {
                    tracing::warn!(error = %e, "Failed to update broadcast progress message");
                }
            }
            if progress.finished {
                break;
            }
        }
    }
}

pub fn progress_text(progress: &BroadcastProgress) -> String {
    if progress.finished {
        format!(
            "✅ Рассылка завершена\n\nОтправлено: {}\nОшибок: {}\nПропущено: {}",
            progress.report.sent, progress.report.failed, progress.report.skipped
        )
    } else {
        format!(
            "📣 Рассылка: {}/{}\n\nОтправлено: {}\nОшибок: {}",
            progress.processed, progress.total, progress.report.sent, progress.report.failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_text_reports_counts() {
        let running = BroadcastProgress {
            processed: 25,
            total: 80,
            report: DeliveryReport {
                sent: 24,
                failed: 1,
                skipped: 0,
            },
            finished: false,
        };
        assert!(progress_text(&running).starts_with("📣 Рассылка: 25/80"));

        let done = BroadcastProgress {
            finished: true,
            ..running
        };
        assert!(progress_text(&done).contains("Ошибок: 1"));
        assert!(progress_text(&done).starts_with("✅"));
    }
}
