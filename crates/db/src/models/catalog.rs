//! City and category reference data.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use eventcast_core::types::{DbId, Timestamp};

/// A row from the `cities` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct City {
    pub id: DbId,
    pub name: String,
    pub is_active: bool,
    pub created_at: Timestamp,
}

/// A row from the `categories` table.
///
/// `name` is canonical and is what matching and search use; `display_name`
/// is a decorated variant used only for rendering.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Category {
    pub id: DbId,
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
}

impl Category {
    /// Rendered label: the decorated variant if present, else the canonical name.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategory {
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn category(display_name: Option<&str>) -> Category {
        Category {
            id: 1,
            name: "Music".to_string(),
            display_name: display_name.map(str::to_string),
            description: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn label_prefers_decorated_variant() {
        assert_eq!(category(Some("🎵 Music")).label(), "🎵 Music");
        assert_eq!(category(None).label(), "Music");
        assert_eq!(category(Some("🎵 Music")).name, "Music");
    }
}
