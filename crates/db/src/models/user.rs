//! User entity models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use eventcast_core::types::{DbId, Timestamp};

/// A row from the `users` table. `id` is the chat platform's user id.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    /// Name shown to other users: first name, then username, then a fallback.
    pub fn display_name(&self) -> &str {
        self.first_name
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or("Аноним")
    }
}

/// Profile fields captured on every interaction.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertUser {
    pub id: DbId,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}
