//! The moderation queue and decision log.
//!
//! Queue membership is derived from post state; there is no queue table.

use eventcast_core::moderation::{Decision, ModerationAction};
use eventcast_core::pagination::{clamp_page, total_pages};
use eventcast_core::types::DbId;
use eventcast_db::models::moderation::ModerationRecord;
use eventcast_db::models::post::PostCard;
use eventcast_db::repositories::{ModerationRepo, PostRepo};
use eventcast_db::DbPool;
use sqlx::PgConnection;

/// One page of the queue.
#[derive(Debug, Clone)]
pub struct QueuePage {
    pub posts: Vec<PostCard>,
    pub page: u32,
    pub total_pages: u32,
    pub total: i64,
}

pub struct ModerationQueue;

impl ModerationQueue {
    /// Every pending post, oldest submission first.
    pub async fn queue(pool: &DbPool) -> Result<Vec<PostCard>, sqlx::Error> {
        PostRepo::list_pending(pool).await
    }

    pub async fn len(pool: &DbPool) -> Result<i64, sqlx::Error> {
        PostRepo::count_pending(pool).await
    }

    /// Page `page` of the queue, clamped to the last page.
    pub async fn page(pool: &DbPool, page: u32, per_page: u32) -> Result<QueuePage, sqlx::Error> {
        let total = PostRepo::count_pending(pool).await?;
        let pages = total_pages(total, per_page);
        let page = clamp_page(page, pages);
        let posts = PostRepo::pending_page(
            pool,
            i64::from(per_page),
            i64::from(page) * i64::from(per_page),
        )
        .await?;
        Ok(QueuePage {
            posts,
            page,
            total_pages: pages,
            total,
        })
    }

    /// Append the audit record for `decision`. Must run inside the
    /// transaction that applies the decision.
    pub async fn record_decision(
        conn: &mut PgConnection,
        decision: &Decision,
    ) -> Result<ModerationRecord, sqlx::Error> {
        ModerationRepo::append(
            conn,
            decision.post_id,
            decision.moderator_id,
            decision.action,
            decision.comment.as_deref(),
        )
        .await
    }

    /// A post's decisions, newest first.
    pub async fn history(pool: &DbPool, post_id: DbId) -> Result<Vec<ModerationRecord>, sqlx::Error> {
        ModerationRepo::history_for_post(pool, post_id).await
    }

    pub async fn by_moderator(
        pool: &DbPool,
        moderator_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ModerationRecord>, sqlx::Error> {
        ModerationRepo::list_by_moderator(pool, moderator_id, limit, offset).await
    }

    pub async fn by_action(
        pool: &DbPool,
        action: ModerationAction,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ModerationRecord>, sqlx::Error> {
        ModerationRepo::list_by_action(pool, action, limit, offset).await
    }
}
