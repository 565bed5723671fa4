//! Moderation log models.

use serde::Serialize;
use sqlx::FromRow;
use eventcast_core::error::CoreError;
use eventcast_core::moderation::ModerationAction;
use eventcast_core::types::{DbId, Timestamp};

/// A row from the append-only `moderation_records` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ModerationRecord {
    pub id: DbId,
    pub post_id: DbId,
    pub moderator_id: DbId,
    pub action: i16,
    pub comment: Option<String>,
    pub created_at: Timestamp,
}

impl ModerationRecord {
    pub fn action(&self) -> Result<ModerationAction, CoreError> {
        ModerationAction::from_id(self.action)
    }
}
