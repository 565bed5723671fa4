//! Post lifecycle orchestration.
//!
//! State changes run in one transaction with the post row locked
//! (`SELECT ... FOR UPDATE`), so concurrent decisions on the same post are
//! serialized by the store and the loser observes
//! [`CoreError::StaleDecision`]. Everything after the commit (subscriber
//! fan-out, moderator alerts, lifecycle events) is best-effort: failures are
//! logged and never roll the state change back.

use std::sync::Arc;

use eventcast_core::controls::{moderation_controls, notification_controls};
use eventcast_core::error::CoreError;
use eventcast_core::lifecycle::{
    self, PostState, Transition, EVENT_POST_APPROVED, EVENT_POST_CHANGES_REQUESTED,
    EVENT_POST_DELETED, EVENT_POST_REJECTED, EVENT_POST_SUBMITTED,
};
use eventcast_core::moderation::{
    CommentGate, Decision, DecisionStep, DecisionToken, ModerationAction,
};
use eventcast_core::submission::Draft;
use eventcast_core::types::{DbId, Timestamp};
use eventcast_db::models::post::{CreatePost, Post};
use eventcast_db::repositories::{CatalogRepo, PostRepo, UserRepo};
use eventcast_db::DbPool;
use eventcast_events::{
    DeliveryReport, EventBus, LifecycleEvent, Media, MediaStore, NotificationDispatcher,
    OutgoingMessage, Recipient,
};

use crate::cards::{moderation_card_text, post_card_text};
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::matcher::SubscriberMatcher;
use crate::queue::ModerationQueue;
use crate::users::dedup;

/// Result of an applied moderation decision.
#[derive(Debug, Clone)]
pub struct DecisionOutcome {
    pub post: Post,
    pub state: PostState,
    /// Subscriber fan-out report; `None` unless the post was published.
    pub report: Option<DeliveryReport>,
}

pub struct PostLifecycle {
    pool: DbPool,
    bus: Arc<EventBus>,
    dispatcher: Arc<NotificationDispatcher>,
    media: Arc<dyn MediaStore>,
    config: Arc<EngineConfig>,
}

impl PostLifecycle {
    pub fn new(
        pool: DbPool,
        bus: Arc<EventBus>,
        dispatcher: Arc<NotificationDispatcher>,
        media: Arc<dyn MediaStore>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            pool,
            bus,
            dispatcher,
            media,
            config,
        }
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    /// Persist a validated draft and move it into the moderation queue.
    pub async fn submit(&self, draft: Draft, now: Timestamp) -> EngineResult<Post> {
        draft.validate(now)?;
        self.ensure_catalog_targets(&draft).await?;

        let mut tx = self.pool.begin().await?;
        let created = PostRepo::create_draft(&mut *tx, &CreatePost::from(draft)).await?;
        let next = lifecycle::apply(created.id, created.state()?, Transition::Submit)?;
        let post = PostRepo::set_state(&mut *tx, created.id, next).await?;
        tx.commit().await?;

        tracing::info!(post_id = post.id, author_id = post.author_id, "Post submitted for moderation");

        self.bus.publish(
            LifecycleEvent::new(EVENT_POST_SUBMITTED, post.id)
                .with_author(post.author_id)
                .with_title(post.title.clone()),
        );
        self.alert_moderators(post.id).await;
        Ok(post)
    }

    // -----------------------------------------------------------------------
    // Moderation decisions
    // -----------------------------------------------------------------------

    /// First step of the decision surface: a moderator pressed a decision
    /// button. The post's current state is re-read rather than trusting the
    /// control that was pressed.
    pub async fn select_decision(
        &self,
        token: DecisionToken,
        moderator_id: DbId,
    ) -> EngineResult<DecisionStep> {
        self.ensure_moderator(moderator_id)?;
        self.ensure_pending(token.post_id).await?;
        Ok(CommentGate::begin(token, moderator_id))
    }

    /// Second step for reject / request-changes: the moderator's comment
    /// arrived. The post must still be pending.
    pub async fn complete_decision(
        &self,
        gate: CommentGate,
        comment: &str,
    ) -> EngineResult<DecisionOutcome> {
        let decision = gate.complete(comment)?;
        self.ensure_pending(decision.post_id).await?;
        self.decide(decision).await
    }

    pub async fn approve(&self, post_id: DbId, moderator_id: DbId) -> EngineResult<DecisionOutcome> {
        self.decide(Decision {
            post_id,
            moderator_id,
            action: ModerationAction::Approve,
            comment: None,
        })
        .await
    }

    pub async fn reject(
        &self,
        post_id: DbId,
        moderator_id: DbId,
        comment: &str,
    ) -> EngineResult<DecisionOutcome> {
        let gate = CommentGate {
            post_id,
            moderator_id,
            action: ModerationAction::Reject,
        };
        self.decide(gate.complete(comment)?).await
    }

    pub async fn request_changes(
        &self,
        post_id: DbId,
        moderator_id: DbId,
        comment: &str,
    ) -> EngineResult<DecisionOutcome> {
        let gate = CommentGate {
            post_id,
            moderator_id,
            action: ModerationAction::RequestChanges,
        };
        self.decide(gate.complete(comment)?).await
    }

    /// Apply a fully specified decision.
    pub async fn decide(&self, decision: Decision) -> EngineResult<DecisionOutcome> {
        self.ensure_moderator(decision.moderator_id)?;
        if decision.action.requires_comment() && decision.comment.is_none() {
            return Err(CoreError::Validation(format!(
                "A comment is required to {}",
                decision.action
            ))
            .into());
        }

        let post_id = decision.post_id;
        let mut tx = self.pool.begin().await?;

        let current = PostRepo::lock_for_update(&mut *tx, post_id)
            .await?
            .ok_or(CoreError::NotFound { entity: "Post", id: post_id })?;
        let next = lifecycle::apply(post_id, current.state()?, decision.action.transition())?;

        if next == PostState::Published {
            let categories = PostRepo::category_ids(&mut *tx, post_id).await?;
            let cities = PostRepo::city_ids(&mut *tx, post_id).await?;
            if categories.is_empty() || cities.is_empty() {
                return Err(CoreError::ConsistencyViolation(format!(
                    "Post {post_id} has no category or no city and cannot be published"
                ))
                .into());
            }
        }

        let post = PostRepo::set_state(&mut *tx, post_id, next).await?;
        ModerationQueue::record_decision(&mut *tx, &decision).await?;
        tx.commit().await?;

        tracing::info!(
            post_id,
            moderator_id = decision.moderator_id,
            action = %decision.action,
            state = %next,
            "Moderation decision applied"
        );

        let report = if next == PostState::Published {
            match self.notify_subscribers(post_id).await {
                Ok(report) => Some(report),
                Err(e) => {
                    tracing::error!(post_id, error = %e, "Subscriber notification failed");
                    None
                }
            }
        } else {
            None
        };

        let event_type = match decision.action {
            ModerationAction::Approve => EVENT_POST_APPROVED,
            ModerationAction::Reject => EVENT_POST_REJECTED,
            ModerationAction::RequestChanges => EVENT_POST_CHANGES_REQUESTED,
        };
        self.bus.publish(
            LifecycleEvent::new(event_type, post_id)
                .with_author(post.author_id)
                .with_actor(decision.moderator_id)
                .with_title(post.title.clone())
                .with_comment(decision.comment),
        );

        Ok(DecisionOutcome {
            post,
            state: next,
            report,
        })
    }

    // -----------------------------------------------------------------------
    // Deletion
    // -----------------------------------------------------------------------

    /// Delete a post on behalf of its author or a moderator. Likes and
    /// moderation records cascade; the image is released afterwards.
    pub async fn delete(&self, post_id: DbId, actor_id: DbId) -> EngineResult<()> {
        let mut tx = self.pool.begin().await?;

        let post = PostRepo::lock_for_update(&mut *tx, post_id)
            .await?
            .ok_or(CoreError::NotFound { entity: "Post", id: post_id })?;
        if post.author_id != actor_id && !self.config.is_moderator(actor_id) {
            return Err(CoreError::Forbidden(
                "Only the author or a moderator may delete a post".into(),
            )
            .into());
        }
        lifecycle::apply(post_id, post.state()?, Transition::Delete)?;

        let removed = PostRepo::delete(&mut *tx, post_id).await?;
        tx.commit().await?;

        tracing::info!(post_id, actor_id, "Post deleted");

        if let Some(image_id) = removed.and_then(|r| r.image_id) {
            if let Err(e) = self.media.release(&[image_id]).await {
                tracing::warn!(post_id, error = %e, "Failed to release post media");
            }
        }

        self.bus.publish(
            LifecycleEvent::new(EVENT_POST_DELETED, post_id)
                .with_author(post.author_id)
                .with_actor(actor_id)
                .with_title(post.title),
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Fan-out
    // -----------------------------------------------------------------------

    /// Deliver a published post to every matched subscriber.
    pub async fn notify_subscribers(&self, post_id: DbId) -> EngineResult<DeliveryReport> {
        let card = PostRepo::find_card(&self.pool, post_id)
            .await?
            .ok_or(CoreError::NotFound { entity: "Post", id: post_id })?;

        let recipients = SubscriberMatcher::match_post(&self.pool, post_id).await?;
        if recipients.is_empty() {
            tracing::info!(post_id, "No matching subscribers");
            return Ok(DeliveryReport::default());
        }

        let media = self.notification_media(post_id, card.post.image_id.as_deref()).await;
        let text = post_card_text(&card, self.config.local_offset);
        let link = card.post.link.clone();

        let report = self
            .dispatcher
            .broadcast(&recipients, |r: &Recipient| {
                OutgoingMessage::text(text.clone())
                    .with_media(media.clone())
                    .with_controls(notification_controls(post_id, r.has_liked, link.as_deref()))
            })
            .await;

        tracing::info!(
            post_id,
            sent = report.sent,
            failed = report.failed,
            skipped = report.skipped,
            "Subscribers notified"
        );
        Ok(report)
    }

    /// The post's own image if it resolves, otherwise the configured
    /// animation for this post.
    async fn notification_media(&self, post_id: DbId, image_id: Option<&str>) -> Option<Media> {
        if let Some(image_id) = image_id {
            match self.media.resolve(image_id).await {
                Ok(handle) => return Some(Media::Photo(handle)),
                Err(e) => tracing::warn!(post_id, error = %e, "Post image unavailable"),
            }
        }
        let animation = self.dispatcher.config().animation_for(post_id)?;
        match self.media.resolve(animation).await {
            Ok(handle) => Some(Media::Animation(handle)),
            Err(e) => {
                tracing::warn!(post_id, error = %e, "Notification animation unavailable");
                None
            }
        }
    }

    /// Send the moderation card of a new submission to every moderator.
    async fn alert_moderators(&self, post_id: DbId) {
        let moderators: Vec<Recipient> = self
            .config
            .moderator_list()
            .into_iter()
            .map(Recipient::new)
            .collect();
        if moderators.is_empty() {
            return;
        }

        let card = match PostRepo::find_card(&self.pool, post_id).await {
            Ok(Some(card)) => card,
            Ok(None) => return,
            Err(e) => {
                tracing::error!(post_id, error = %e, "Failed to load post for moderators");
                return;
            }
        };
        let author_name = match UserRepo::find_by_id(&self.pool, card.post.author_id).await {
            Ok(Some(user)) => user.display_name().to_string(),
            Ok(None) => "Аноним".to_string(),
            Err(e) => {
                tracing::warn!(post_id, error = %e, "Failed to load post author");
                "Аноним".to_string()
            }
        };

        let text = moderation_card_text(&card, &author_name, self.config.local_offset);
        let media = match card.post.image_id.as_deref() {
            Some(id) => self.media.resolve(id).await.ok().map(Media::Photo),
            None => None,
        };
        self.dispatcher
            .broadcast(&moderators, |_| {
                OutgoingMessage::text(text.clone())
                    .with_media(media.clone())
                    .with_controls(moderation_controls(post_id))
            })
            .await;
    }

    // -----------------------------------------------------------------------
    // Guards
    // -----------------------------------------------------------------------

    fn ensure_moderator(&self, user_id: DbId) -> Result<(), CoreError> {
        if self.config.is_moderator(user_id) {
            Ok(())
        } else {
            Err(CoreError::Forbidden(format!("User {user_id} is not a moderator")))
        }
    }

    /// Every targeted city and category must exist and still be active.
    async fn ensure_catalog_targets(&self, draft: &Draft) -> EngineResult<()> {
        let city_ids = dedup(&draft.city_ids);
        let cities = CatalogRepo::cities_by_ids(&self.pool, &city_ids).await?;
        if cities.len() != city_ids.len() || cities.iter().any(|c| !c.is_active) {
            return Err(CoreError::Validation("Unknown city selected".into()).into());
        }

        let category_ids = dedup(&draft.category_ids);
        let categories = CatalogRepo::categories_by_ids(&self.pool, &category_ids).await?;
        if categories.len() != category_ids.len() || categories.iter().any(|c| !c.is_active) {
            return Err(CoreError::Validation("Unknown category selected".into()).into());
        }
        Ok(())
    }

    async fn ensure_pending(&self, post_id: DbId) -> EngineResult<()> {
        let post = PostRepo::find_by_id(&self.pool, post_id)
            .await?
            .ok_or(CoreError::NotFound { entity: "Post", id: post_id })?;
        let state = post.state()?;
        if state != PostState::PendingModeration {
            return Err(CoreError::StaleDecision {
                post_id,
                current: state.to_string(),
            }
            .into());
        }
        Ok(())
    }
}
