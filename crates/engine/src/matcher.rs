//! Audience computation for a published post.

use eventcast_core::types::DbId;
use eventcast_db::repositories::SubscriptionRepo;
use eventcast_db::DbPool;
use eventcast_events::Recipient;

/// Computes the users whose subscribed cities and categories both
/// intersect a post's targeting.
pub struct SubscriberMatcher;

impl SubscriberMatcher {
    /// The matched audience with each recipient's own like state.
    ///
    /// The connection is returned to the pool before this resolves, so the
    /// dispatcher never holds a session across a broadcast.
    pub async fn match_post(pool: &DbPool, post_id: DbId) -> Result<Vec<Recipient>, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        let matched = SubscriptionRepo::match_post(&mut *conn, post_id).await?;
        drop(conn);

        tracing::debug!(post_id, matched = matched.len(), "Matched subscribers");
        Ok(matched
            .into_iter()
            .map(|m| Recipient {
                user_id: m.user_id,
                has_liked: m.has_liked,
            })
            .collect())
    }
}
