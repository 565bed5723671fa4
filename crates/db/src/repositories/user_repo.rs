//! Repository for the `users` table.

use sqlx::PgPool;
use eventcast_core::types::DbId;

use crate::models::user::{UpsertUser, User};

/// Column list for `users` queries.
const COLUMNS: &str = "id, username, first_name, last_name, is_active, created_at, updated_at";

/// Provides persistence for platform users.
pub struct UserRepo;

impl UserRepo {
    /// Return the user, creating it on first interaction.
    ///
    /// Profile fields are refreshed from the platform on every call; the
    /// activity flag is left untouched for existing users.
    pub async fn get_or_create(pool: &PgPool, input: &UpsertUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (id, username, first_name, last_name) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO UPDATE SET \
                username = EXCLUDED.username, \
                first_name = EXCLUDED.first_name, \
                last_name = EXCLUDED.last_name, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(input.id)
            .bind(&input.username)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// IDs of every active user, ordered by id. Bounded by `limit` when given.
    pub async fn list_active_ids(
        pool: &PgPool,
        limit: Option<i64>,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT id FROM users WHERE is_active = true ORDER BY id LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Flip the activity flag. Returns `true` if the user exists.
    pub async fn set_active(pool: &PgPool, id: DbId, is_active: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET is_active = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(is_active)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Self-service erasure. Cascades to the user's posts, likes and
    /// subscription links. Returns the media ids of the removed posts.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<Option<Vec<String>>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let images: Vec<Option<String>> =
            sqlx::query_scalar("SELECT image_id FROM posts WHERE author_id = $1")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(images.into_iter().flatten().collect()))
    }
}
