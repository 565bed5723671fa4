//! Like models.

use serde::Serialize;
use sqlx::FromRow;
use eventcast_core::types::{DbId, Timestamp};

/// A row from the `likes` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Like {
    pub id: DbId,
    pub user_id: DbId,
    pub post_id: DbId,
    pub created_at: Timestamp,
}

/// Result of toggling a like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LikeToggle {
    Added,
    Removed,
}

impl LikeToggle {
    pub fn is_liked(self) -> bool {
        matches!(self, LikeToggle::Added)
    }
}
