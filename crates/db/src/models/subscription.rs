//! Subscriber matching rows.

use serde::Serialize;
use sqlx::FromRow;
use eventcast_core::types::DbId;

/// A user whose subscriptions intersect a post's targeting, with that
/// user's own like state for the post.
#[derive(Debug, Clone, Copy, FromRow, Serialize, PartialEq, Eq, Hash)]
pub struct MatchedSubscriber {
    pub user_id: DbId,
    pub has_liked: bool,
}
