//! Post entity models and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use eventcast_core::error::CoreError;
use eventcast_core::lifecycle::PostState;
use eventcast_core::submission::Draft;
use eventcast_core::types::{DbId, Timestamp};

use crate::models::status::{post_state, StatusId};

/// A row from the `posts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Post {
    pub id: DbId,
    pub author_id: DbId,
    pub title: String,
    pub body: String,
    pub image_id: Option<String>,
    pub link: Option<String>,
    pub address: Option<String>,
    pub event_at: Option<Timestamp>,
    pub status_id: StatusId,
    pub is_approved: bool,
    pub is_published: bool,
    pub published_at: Option<Timestamp>,
    pub submitted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Post {
    pub fn state(&self) -> Result<PostState, CoreError> {
        post_state(self.status_id)
    }
}

/// A post joined with its rendered targeting and like count.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PostCard {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub post: Post,
    /// Category labels (decorated variant where present), ordered by id.
    pub category_labels: Vec<String>,
    pub city_names: Vec<String>,
    pub likes_count: i64,
}

/// DTO for inserting a validated draft.
#[derive(Debug, Clone)]
pub struct CreatePost {
    pub author_id: DbId,
    pub title: String,
    pub body: String,
    pub image_id: Option<String>,
    pub link: Option<String>,
    pub address: Option<String>,
    pub event_at: Option<Timestamp>,
    pub category_ids: Vec<DbId>,
    pub city_ids: Vec<DbId>,
}

impl From<Draft> for CreatePost {
    fn from(draft: Draft) -> Self {
        Self {
            author_id: draft.author_id,
            title: draft.title,
            body: draft.body,
            image_id: draft.image_id,
            link: draft.link,
            address: draft.address,
            event_at: draft.event_at,
            category_ids: draft.category_ids,
            city_ids: draft.city_ids,
        }
    }
}

/// `(id, image_id)` pair returned when posts are removed so their media
/// can be released.
#[derive(Debug, Clone, FromRow, PartialEq, Eq)]
pub struct RemovedPost {
    pub id: DbId,
    pub image_id: Option<String>,
}
