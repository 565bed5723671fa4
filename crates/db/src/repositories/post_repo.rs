//! Repository for the `posts` table and its targeting links.

use sqlx::{PgConnection, PgPool};
use eventcast_core::lifecycle::PostState;
use eventcast_core::types::{DbId, Timestamp};

use crate::models::post::{CreatePost, Post, PostCard, RemovedPost};
use crate::models::status::PostStatus;

/// Column list for `posts` queries.
const COLUMNS: &str = "id, author_id, title, body, image_id, link, address, event_at, \
    status_id, is_approved, is_published, published_at, submitted_at, created_at, updated_at";

/// `posts` columns qualified with the `p` alias, plus the rendered
/// targeting and like count that make up a [`PostCard`].
pub(crate) const CARD_SELECT: &str = "SELECT p.id, p.author_id, p.title, p.body, p.image_id, p.link, \
        p.address, p.event_at, p.status_id, p.is_approved, p.is_published, p.published_at, \
        p.submitted_at, p.created_at, p.updated_at, \
        ARRAY(SELECT COALESCE(c.display_name, c.name) FROM post_categories pc \
              JOIN categories c ON c.id = pc.category_id \
              WHERE pc.post_id = p.id ORDER BY c.id) AS category_labels, \
        ARRAY(SELECT ci.name FROM post_cities pci \
              JOIN cities ci ON ci.id = pci.city_id \
              WHERE pci.post_id = p.id ORDER BY ci.id) AS city_names, \
        (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS likes_count \
    FROM posts p";

/// Visibility filter shared by the feed queries: published, not yet past,
/// and intersecting the viewer's cities and categories.
/// Binds: `$1` viewer id, `$2` published status id, `$3` now.
const FEED_FILTER: &str = "WHERE p.status_id = $2 \
      AND (p.event_at IS NULL OR p.event_at > $3) \
      AND EXISTS (SELECT 1 FROM post_cities pc \
                  JOIN user_cities uc ON uc.city_id = pc.city_id \
                  WHERE pc.post_id = p.id AND uc.user_id = $1) \
      AND EXISTS (SELECT 1 FROM post_categories pcat \
                  JOIN user_categories ucat ON ucat.category_id = pcat.category_id \
                  WHERE pcat.post_id = p.id AND ucat.user_id = $1)";

/// Provides persistence for posts.
pub struct PostRepo;

impl PostRepo {
    // -----------------------------------------------------------------------
    // Writes (transaction-composable)
    // -----------------------------------------------------------------------

    /// Insert a draft and its category/city links.
    pub async fn create_draft(
        conn: &mut PgConnection,
        input: &CreatePost,
    ) -> Result<Post, sqlx::Error> {
        let query = format!(
            "INSERT INTO posts \
                (author_id, title, body, image_id, link, address, event_at, status_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        let post = sqlx::query_as::<_, Post>(&query)
            .bind(input.author_id)
            .bind(&input.title)
            .bind(&input.body)
            .bind(&input.image_id)
            .bind(&input.link)
            .bind(&input.address)
            .bind(input.event_at)
            .bind(PostStatus::Draft.id())
            .fetch_one(&mut *conn)
            .await?;

        sqlx::query(
            "INSERT INTO post_categories (post_id, category_id) \
             SELECT $1, UNNEST($2::bigint[]) ON CONFLICT DO NOTHING",
        )
        .bind(post.id)
        .bind(&input.category_ids)
        .execute(&mut *conn)
        .await?;

        sqlx::query(
            "INSERT INTO post_cities (post_id, city_id) \
             SELECT $1, UNNEST($2::bigint[]) ON CONFLICT DO NOTHING",
        )
        .bind(post.id)
        .bind(&input.city_ids)
        .execute(&mut *conn)
        .await?;

        Ok(post)
    }

    /// Load a post and hold its row lock until the surrounding transaction
    /// ends. Concurrent decisions on the same post serialize here.
    pub async fn lock_for_update(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<Post>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM posts WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Persist a lifecycle state together with its derived flags.
    ///
    /// `submitted_at` is stamped on entering the queue and `published_at`
    /// on first publication.
    pub async fn set_state(
        conn: &mut PgConnection,
        id: DbId,
        state: PostState,
    ) -> Result<Post, sqlx::Error> {
        let (is_approved, is_published) = state.flags();
        let query = format!(
            "UPDATE posts SET \
                status_id = $2, \
                is_approved = $3, \
                is_published = $4, \
                submitted_at = CASE WHEN $2 = $5 THEN NOW() ELSE submitted_at END, \
                published_at = CASE WHEN $4 THEN COALESCE(published_at, NOW()) ELSE published_at END, \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .bind(PostStatus::from(state).id())
            .bind(is_approved)
            .bind(is_published)
            .bind(PostStatus::PendingModeration.id())
            .fetch_one(conn)
            .await
    }

    /// Hard-delete a post; likes, moderation records and links cascade.
    pub async fn delete(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<RemovedPost>, sqlx::Error> {
        sqlx::query_as::<_, RemovedPost>("DELETE FROM posts WHERE id = $1 RETURNING id, image_id")
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Lock up to `limit` dated posts whose event time is at or before
    /// `cutoff`. Rows locked by a concurrent sweep are skipped.
    pub async fn lock_expired_batch(
        conn: &mut PgConnection,
        cutoff: Timestamp,
        limit: i64,
    ) -> Result<Vec<RemovedPost>, sqlx::Error> {
        sqlx::query_as::<_, RemovedPost>(
            "SELECT id, image_id FROM posts \
             WHERE event_at IS NOT NULL AND event_at <= $1 \
             ORDER BY event_at, id \
             LIMIT $2 \
             FOR UPDATE SKIP LOCKED",
        )
        .bind(cutoff)
        .bind(limit)
        .fetch_all(conn)
        .await
    }

    /// Delete posts by id; dependents cascade. Returns the number removed.
    pub async fn delete_many(conn: &mut PgConnection, ids: &[DbId]) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ANY($1)")
            .bind(ids)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn category_ids(conn: &mut PgConnection, post_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT category_id FROM post_categories WHERE post_id = $1 ORDER BY category_id",
        )
        .bind(post_id)
        .fetch_all(conn)
        .await
    }

    pub async fn city_ids(conn: &mut PgConnection, post_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar("SELECT city_id FROM post_cities WHERE post_id = $1 ORDER BY city_id")
            .bind(post_id)
            .fetch_all(conn)
            .await
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Post>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM posts WHERE id = $1");
        sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_card(pool: &PgPool, id: DbId) -> Result<Option<PostCard>, sqlx::Error> {
        let query = format!("{CARD_SELECT} WHERE p.id = $1");
        sqlx::query_as::<_, PostCard>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Every post awaiting moderation, oldest submission first.
    pub async fn list_pending(pool: &PgPool) -> Result<Vec<PostCard>, sqlx::Error> {
        Self::pending_page(pool, i64::MAX, 0).await
    }

    pub async fn pending_page(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PostCard>, sqlx::Error> {
        let query = format!(
            "{CARD_SELECT} WHERE p.status_id = $1 \
             ORDER BY p.submitted_at ASC, p.id ASC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, PostCard>(&query)
            .bind(PostStatus::PendingModeration.id())
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count_pending(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE status_id = $1")
            .bind(PostStatus::PendingModeration.id())
            .fetch_one(pool)
            .await
    }

    /// One page of the viewer's feed, soonest event first, undated last.
    pub async fn feed_page(
        pool: &PgPool,
        viewer_id: DbId,
        now: Timestamp,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PostCard>, sqlx::Error> {
        let query = format!(
            "{CARD_SELECT} {FEED_FILTER} \
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

    pub async fn feed_count(
        pool: &PgPool,
        viewer_id: DbId,
        now: Timestamp,
    ) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*) FROM posts p {FEED_FILTER}");
        sqlx::query_scalar(&query)
            .bind(viewer_id)
            .bind(PostStatus::Published.id())
            .bind(now)
            .fetch_one(pool)
            .await
    }

    /// Posts authored by a user, newest first.
    pub async fn list_by_author(
        pool: &PgPool,
        author_id: DbId,
    ) -> Result<Vec<PostCard>, sqlx::Error> {
        let query = format!("{CARD_SELECT} WHERE p.author_id = $1 ORDER BY p.created_at DESC, p.id DESC");
        sqlx::query_as::<_, PostCard>(&query)
            .bind(author_id)
            .fetch_all(pool)
            .await
    }
}
