//! Repository for the append-only `moderation_records` table.

use sqlx::{PgConnection, PgPool};
use eventcast_core::moderation::ModerationAction;
use eventcast_core::types::DbId;

use crate::models::moderation::ModerationRecord;

/// Column list for `moderation_records` queries.
const COLUMNS: &str = "id, post_id, moderator_id, action, comment, created_at";

/// Sole writer of moderation records. There is no update or delete: records
/// disappear only by cascade with their post.
pub struct ModerationRepo;

impl ModerationRepo {
    pub async fn append(
        conn: &mut PgConnection,
        post_id: DbId,
        moderator_id: DbId,
        action: ModerationAction,
        comment: Option<&str>,
    ) -> Result<ModerationRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO moderation_records (post_id, moderator_id, action, comment) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ModerationRecord>(&query)
            .bind(post_id)
            .bind(moderator_id)
            .bind(action.id())
            .bind(comment)
            .fetch_one(conn)
            .await
    }

    /// A post's decision history, newest first.
    pub async fn history_for_post(
        pool: &PgPool,
        post_id: DbId,
    ) -> Result<Vec<ModerationRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM moderation_records \
             WHERE post_id = $1 ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, ModerationRecord>(&query)
            .bind(post_id)
            .fetch_all(pool)
            .await
    }

    pub async fn list_by_moderator(
        pool: &PgPool,
        moderator_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ModerationRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM moderation_records \
             WHERE moderator_id = $1 ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, ModerationRecord>(&query)
            .bind(moderator_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn list_by_action(
        pool: &PgPool,
        action: ModerationAction,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ModerationRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM moderation_records \
             WHERE action = $1 ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, ModerationRecord>(&query)
            .bind(action.id())
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
