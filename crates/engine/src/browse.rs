//! Feed, favorites and moderation browsing driven by navigation tokens.
//!
//! Every request is answered from the token plus the store. A token that
//! names a vanished or no-longer-visible post renders the not-found empty
//! state instead of failing.

use std::sync::Arc;

use eventcast_core::controls::{
    detail_controls, list_controls, main_menu_controls, moderation_controls,
    notification_controls, Button, Controls, LABEL_BACK_TO_LIST,
};
use eventcast_core::error::CoreError;
use eventcast_core::lifecycle::PostState;
use eventcast_core::pagination::{clamp_page, total_pages, NavToken, Section};
use eventcast_core::types::{DbId, Timestamp};
use eventcast_db::models::post::PostCard;
use eventcast_db::repositories::{LikeRepo, PostRepo, UserRepo};
use eventcast_db::DbPool;

use crate::cards::{
    empty_list_text, list_text, moderation_card_text, post_card_text, NOT_FOUND_TEXT,
};
use crate::config::EngineConfig;
use crate::error::EngineResult;

/// A rendered browse screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseView {
    pub text: String,
    pub controls: Controls,
    /// Image attached to a post detail.
    pub image_id: Option<String>,
}

impl BrowseView {
    fn not_found() -> Self {
        Self {
            text: NOT_FOUND_TEXT.to_string(),
            controls: main_menu_controls(),
            image_id: None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.text == NOT_FOUND_TEXT
    }
}

/// What the caller should do with the message the token came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseReply {
    /// Replace text and controls.
    View(BrowseView),
    /// Keep the text, replace only the controls (subscriber notifications).
    Controls(Controls),
}

pub struct BrowseService {
    pool: DbPool,
    config: Arc<EngineConfig>,
}

impl BrowseService {
    pub fn new(pool: DbPool, config: Arc<EngineConfig>) -> Self {
        Self { pool, config }
    }

    /// Decode a navigation token and render the resulting screen.
    pub async fn handle(&self, viewer_id: DbId, token: &str, now: Timestamp) -> EngineResult<BrowseReply> {
        let nav = NavToken::decode(token)?;
        if nav.section() == Some(Section::Moderation) {
            self.ensure_moderator(viewer_id)?;
        }

        let view = match nav {
            NavToken::Open {
                section,
                post_id,
                page,
                total_pages,
            } => self.open(viewer_id, section, post_id, page, total_pages, now).await?,
            NavToken::Next { section, .. }
            | NavToken::Prev { section, .. }
            | NavToken::Back { section, .. } => {
                self.list(viewer_id, section, nav.target_page(), now).await?
            }
            NavToken::ToggleLike {
                section,
                post_id,
                page,
                total_pages,
            } => {
                if !self.toggle_like(viewer_id, post_id, now).await? {
                    return Ok(BrowseReply::View(BrowseView::not_found()));
                }
                self.open(viewer_id, section, post_id, page, total_pages, now).await?
            }
            NavToken::NotifyLike { post_id } => {
                return self.toggle_from_notification(viewer_id, post_id, now).await;
            }
        };
        Ok(BrowseReply::View(view))
    }

    /// Render list page `page` of `section`, clamped to the last page.
    pub async fn list(
        &self,
        viewer_id: DbId,
        section: Section,
        page: u32,
        now: Timestamp,
    ) -> EngineResult<BrowseView> {
        let per_page = self.config.posts_per_page;
        let total = match section {
            Section::Feed => PostRepo::feed_count(&self.pool, viewer_id, now).await?,
            Section::Favorites => LikeRepo::favorites_count(&self.pool, viewer_id, now).await?,
            Section::Moderation => PostRepo::count_pending(&self.pool).await?,
        };
        let pages = total_pages(total, per_page);
        if pages == 0 {
            return Ok(BrowseView {
                text: empty_list_text(section).to_string(),
                controls: main_menu_controls(),
                image_id: None,
            });
        }

        let page = clamp_page(page, pages);
        let limit = i64::from(per_page);
        let offset = i64::from(page) * limit;
        let cards = match section {
            Section::Feed => PostRepo::feed_page(&self.pool, viewer_id, now, limit, offset).await?,
            Section::Favorites => {
                LikeRepo::favorites_page(&self.pool, viewer_id, now, limit, offset).await?
            }
            Section::Moderation => PostRepo::pending_page(&self.pool, limit, offset).await?,
        };

        let start_index = offset as usize + 1;
        let ids: Vec<DbId> = cards.iter().map(|c| c.post.id).collect();
        tracing::debug!(viewer_id, section = section.prefix(), page, pages, "Rendering list page");

        Ok(BrowseView {
            text: list_text(section, &cards, start_index, self.config.local_offset),
            controls: list_controls(section, &ids, page, pages, start_index),
            image_id: None,
        })
    }

    /// Render one post opened from page `page` of `section`.
    pub async fn open(
        &self,
        viewer_id: DbId,
        section: Section,
        post_id: DbId,
        page: u32,
        total_pages: u32,
        now: Timestamp,
    ) -> EngineResult<BrowseView> {
        let Some(card) = PostRepo::find_card(&self.pool, post_id).await? else {
            return Ok(BrowseView::not_found());
        };
        if !is_visible(&card, section, now)? {
            return Ok(BrowseView::not_found());
        }

        let page = clamp_page(page, total_pages);
        let image_id = card.post.image_id.clone();

        if section == Section::Moderation {
            let author = UserRepo::find_by_id(&self.pool, card.post.author_id).await?;
            let author_name = author.as_ref().map_or("Аноним", |u| u.display_name());
            let back = Button::callback(
                LABEL_BACK_TO_LIST,
                NavToken::Back {
                    section,
                    page,
                    total_pages,
                },
            );
            return Ok(BrowseView {
                text: moderation_card_text(&card, author_name, self.config.local_offset),
                controls: moderation_controls(post_id).row(vec![back]),
                image_id,
            });
        }

        let is_liked = LikeRepo::is_liked(&self.pool, viewer_id, post_id).await?;
        Ok(BrowseView {
            text: post_card_text(&card, self.config.local_offset),
            controls: detail_controls(
                section,
                post_id,
                page,
                total_pages,
                is_liked,
                card.likes_count,
                card.post.link.as_deref(),
            ),
            image_id,
        })
    }

    /// Toggle the viewer's like on a post shown in a subscriber
    /// notification and return the notification's refreshed controls.
    pub async fn toggle_from_notification(
        &self,
        viewer_id: DbId,
        post_id: DbId,
        now: Timestamp,
    ) -> EngineResult<BrowseReply> {
        if !self.toggle_like(viewer_id, post_id, now).await? {
            return Ok(BrowseReply::View(BrowseView::not_found()));
        }
        let is_liked = LikeRepo::is_liked(&self.pool, viewer_id, post_id).await?;
        let link = PostRepo::find_by_id(&self.pool, post_id)
            .await?
            .and_then(|p| p.link);
        Ok(BrowseReply::Controls(notification_controls(
            post_id,
            is_liked,
            link.as_deref(),
        )))
    }

    /// Toggle a like on a published, not-yet-past post. Returns `false`
    /// when the post is gone or no longer visible.
    async fn toggle_like(&self, viewer_id: DbId, post_id: DbId, now: Timestamp) -> EngineResult<bool> {
        let Some(post) = PostRepo::find_by_id(&self.pool, post_id).await? else {
            return Ok(false);
        };
        if post.state()? != PostState::Published || post.event_at.is_some_and(|at| at <= now) {
            return Ok(false);
        }
        let outcome = LikeRepo::toggle(&self.pool, viewer_id, post_id).await?;
        tracing::debug!(viewer_id, post_id, liked = outcome.is_liked(), "Like toggled");
        Ok(true)
    }

    fn ensure_moderator(&self, user_id: DbId) -> Result<(), CoreError> {
        if self.config.is_moderator(user_id) {
            Ok(())
        } else {
            Err(CoreError::Forbidden(format!("User {user_id} is not a moderator")))
        }
    }
}

/// Whether `card` may still be shown in `section`.
fn is_visible(card: &PostCard, section: Section, now: Timestamp) -> Result<bool, CoreError> {
    let state = card.post.state()?;
    Ok(match section {
        Section::Moderation => state == PostState::PendingModeration,
        Section::Feed | Section::Favorites => {
            state == PostState::Published && card.post.event_at.map_or(true, |at| at > now)
        }
    })
}
