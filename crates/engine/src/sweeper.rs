//! Periodic removal of posts whose event is over.
//!
//! A post is expired once `event_at <= now - grace`. Expired posts are
//! deleted together with every dependent row, one transaction per batch,
//! and their media is handed to the [`MediaStore`] for reclamation.
//! Undated posts never expire.

use std::sync::Arc;

use chrono::Utc;
use eventcast_core::lifecycle::EVENT_POSTS_EXPIRED;
use eventcast_core::types::{DbId, Timestamp};
use eventcast_db::repositories::PostRepo;
use eventcast_db::DbPool;
use eventcast_events::{EventBus, LifecycleEvent, MediaStore};
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::error::EngineResult;

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    pub deleted: u64,
    pub post_ids: Vec<DbId>,
    /// Media references of the removed posts.
    pub media_ids: Vec<String>,
}

pub struct ExpirySweeper {
    pool: DbPool,
    media: Arc<dyn MediaStore>,
    bus: Arc<EventBus>,
    config: Arc<EngineConfig>,
}

impl ExpirySweeper {
    pub fn new(
        pool: DbPool,
        media: Arc<dyn MediaStore>,
        bus: Arc<EventBus>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            pool,
            media,
            bus,
            config,
        }
    }

    /// Delete every post whose event time is at or before `now - grace`.
    ///
    /// Idempotent: a second run with no new expirations deletes nothing.
    pub async fn sweep(&self, now: Timestamp, grace: chrono::Duration) -> EngineResult<SweepOutcome> {
        let cutoff = now - grace;
        let batch_size = self.config.sweep_batch_size.max(1);
        let mut outcome = SweepOutcome::default();

        loop {
            let mut tx = self.pool.begin().await?;
            let batch = PostRepo::lock_expired_batch(&mut *tx, cutoff, batch_size).await?;
            if batch.is_empty() {
                break;
            }

            let ids: Vec<DbId> = batch.iter().map(|p| p.id).collect();
            let deleted = PostRepo::delete_many(&mut *tx, &ids).await?;
            tx.commit().await?;

            let media_ids: Vec<String> = batch.into_iter().filter_map(|p| p.image_id).collect();
            tracing::info!(
                deleted,
                media = media_ids.len(),
                cutoff = %cutoff,
                "Expiry sweep: removed batch"
            );

            if !media_ids.is_empty() {
                if let Err(e) = self.media.release(&media_ids).await {
                    tracing::warn!(error = %e, "Expiry sweep: media release failed");
                }
            }
            for &post_id in &ids {
                self.bus.publish(LifecycleEvent::new(EVENT_POSTS_EXPIRED, post_id));
            }

            outcome.deleted += deleted;
            outcome.post_ids.extend(ids);
            outcome.media_ids.extend(media_ids);

            if (deleted as i64) < batch_size {
                break;
            }
        }

        Ok(outcome)
    }

    /// Run the sweep every `sweep_interval` until `cancel` is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            interval_secs = self.config.sweep_interval.as_secs(),
            grace_hours = self.config.expiry_grace.num_hours(),
            "Expiry sweeper started"
        );

        let mut interval = tokio::time::interval(self.config.sweep_interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Expiry sweeper stopping");
                    break;
                }
                _ = interval.tick() => {
                    match self.sweep(Utc::now(), self.config.expiry_grace).await {
                        Ok(outcome) if outcome.deleted > 0 => {
                            tracing::info!(deleted = outcome.deleted, "Expiry sweep finished");
                        }
                        Ok(_) => tracing::debug!("Expiry sweep: nothing to remove"),
                        Err(e) => tracing::error!(error = %e, "Expiry sweep failed"),
                    }
                }
            }
        }
    }
}
