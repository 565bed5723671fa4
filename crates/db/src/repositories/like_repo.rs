//! Repository for the `likes` table and the favorites view.

use sqlx::PgPool;
use eventcast_core::types::{DbId, Timestamp};

use crate::models::like::LikeToggle;
use crate::models::post::PostCard;
use crate::models::status::PostStatus;
use crate::repositories::post_repo::CARD_SELECT;

pub struct LikeRepo;

/// Favorites visibility: liked by the viewer, published, not yet past.
/// Binds: `$1` viewer id, `$2` published status id, `$3` now.
const FAVORITES_FILTER: &str = "WHERE p.status_id = $2 \
      AND (p.event_at IS NULL OR p.event_at > $3) \
      AND EXISTS (SELECT 1 FROM likes lk WHERE lk.post_id = p.id AND lk.user_id = $1)";

impl LikeRepo {
    /// Add the like if absent, remove it if present.
    ///
    /// Of two concurrent toggles by the same user, one reports `Added` and
    /// the other `Removed`.
    pub async fn toggle(
        pool: &PgPool,
        user_id: DbId,
        post_id: DbId,
    ) -> Result<LikeToggle, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let inserted: Option<DbId> = sqlx::query_scalar(
            "INSERT INTO likes (user_id, post_id) VALUES ($1, $2) \
             ON CONFLICT ON CONSTRAINT uq_likes_user_post DO NOTHING \
             RETURNING id",
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = if inserted.is_some() {
            LikeToggle::Added
        } else {
            sqlx::query("DELETE FROM likes WHERE user_id = $1 AND post_id = $2")
                .bind(user_id)
                .bind(post_id)
                .execute(&mut *tx)
                .await?;
            LikeToggle::Removed
        };

        tx.commit().await?;
        Ok(outcome)
    }

    pub async fn is_liked(pool: &PgPool, user_id: DbId, post_id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM likes WHERE user_id = $1 AND post_id = $2)",
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_one(pool)
        .await
    }

    pub async fn count_for_post(pool: &PgPool, post_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(pool)
            .await
    }

    pub async fn favorites_page(
        pool: &PgPool,
        viewer_id: DbId,
        now: Timestamp,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PostCard>, sqlx::Error> {
        let query = format!(
            "{CARD_SELECT} {FAVORITES_FILTER} \
             ORDER BY p.event_at ASC NULLS LAST, p.id ASC \
             LIMIT $4 OFFSET $5"
        );
        sqlx::query_as::<_, PostCard>(&query)
            .bind(viewer_id)
            .bind(PostStatus::Published.id())
            .bind(now)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn favorites_count(
        pool: &PgPool,
        viewer_id: DbId,
        now: Timestamp,
    ) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*) FROM posts p {FAVORITES_FILTER}");
        sqlx::query_scalar(&query)
            .bind(viewer_id)
            .bind(PostStatus::Published.id())
            .bind(now)
            .fetch_one(pool)
            .await
    }
}
