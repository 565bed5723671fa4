//! Repository for user subscriptions (`user_cities`, `user_categories`) and
//! subscriber matching.

use sqlx::{PgConnection, PgPool};
use eventcast_core::types::DbId;

use crate::models::subscription::MatchedSubscriber;

pub struct SubscriptionRepo;

impl SubscriptionRepo {
    /// Replace the user's subscribed cities. An empty set clears them.
    pub async fn set_cities(
        pool: &PgPool,
        user_id: DbId,
        city_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM user_cities WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO user_cities (user_id, city_id) \
             SELECT $1, UNNEST($2::bigint[]) \
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(city_ids)
        .execute(&mut *tx)
        .await?;
        tx.commit().await
    }

    /// Replace the user's subscribed categories. An empty set clears them.
    pub async fn set_categories(
        pool: &PgPool,
        user_id: DbId,
        category_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM user_categories WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO user_categories (user_id, category_id) \
             SELECT $1, UNNEST($2::bigint[]) \
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(category_ids)
        .execute(&mut *tx)
        .await?;
        tx.commit().await
    }

    pub async fn city_ids(pool: &PgPool, user_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar("SELECT city_id FROM user_cities WHERE user_id = $1 ORDER BY city_id")
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    pub async fn category_ids(pool: &PgPool, user_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT category_id FROM user_categories WHERE user_id = $1 ORDER BY category_id",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Users whose subscribed cities and subscribed categories both intersect
    /// the post's targeting, with each user's own like state.
    ///
    /// Computed as a single set-intersection join. A user with no cities or
    /// no categories can never satisfy both `EXISTS` clauses.
    pub async fn match_post(
        conn: &mut PgConnection,
        post_id: DbId,
    ) -> Result<Vec<MatchedSubscriber>, sqlx::Error> {
        sqlx::query_as::<_, MatchedSubscriber>(
            "SELECT u.id AS user_id, \
                    EXISTS (SELECT 1 FROM likes l WHERE l.user_id = u.id AND l.post_id = $1) \
                        AS has_liked \
             FROM users u \
             WHERE EXISTS ( \
                     SELECT 1 FROM user_cities uc \
                     JOIN post_cities pc ON pc.city_id = uc.city_id \
                     WHERE uc.user_id = u.id AND pc.post_id = $1) \
               AND EXISTS ( \
                     SELECT 1 FROM user_categories ucat \
                     JOIN post_categories pcat ON pcat.category_id = ucat.category_id \
                     WHERE ucat.user_id = u.id AND pcat.post_id = $1) \
             ORDER BY u.id",
        )
        .bind(post_id)
        .fetch_all(conn)
        .await
    }
}
