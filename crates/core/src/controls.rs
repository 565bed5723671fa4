//! Platform-neutral inline control model and the renderers for every view.
//!
//! Adapters translate [`Controls`] into their native keyboard markup.

use serde::Serialize;

use crate::moderation::{DecisionToken, ModerationAction};
use crate::pagination::{NavToken, Section, MAIN_MENU_TOKEN};
use crate::types::DbId;

pub const LABEL_MAIN_MENU: &str = "💌 Главное меню";
pub const LABEL_PREV: &str = "< Назад";
pub const LABEL_NEXT: &str = "Вперед >";
pub const LABEL_BACK_TO_LIST: &str = "↩️ К списку";
pub const LABEL_LINK: &str = "🔗 Подробнее";
pub const LABEL_FAVORITED: &str = "❤️ В избранном";
pub const LABEL_FAVORITE: &str = "🤍 В избранное";

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonAction {
    /// Opaque token echoed back on press.
    Callback(String),
    /// External link opened by the client.
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    pub text: String,
    pub action: ButtonAction,
}

impl Button {
    pub fn callback(text: impl Into<String>, token: impl ToString) -> Self {
        Self {
            text: text.into(),
            action: ButtonAction::Callback(token.to_string()),
        }
    }

    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: ButtonAction::Url(url.into()),
        }
    }

    /// Callback token, if this is a callback button.
    pub fn token(&self) -> Option<&str> {
        match &self.action {
            ButtonAction::Callback(t) => Some(t),
            ButtonAction::Url(_) => None,
        }
    }
}

/// Rows of buttons, top to bottom.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Controls {
    pub rows: Vec<Vec<Button>>,
}

impl Controls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row; empty rows are dropped.
    pub fn row(mut self, row: Vec<Button>) -> Self {
        if !row.is_empty() {
            self.rows.push(row);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All callback tokens in render order.
    pub fn tokens(&self) -> Vec<&str> {
        self.rows.iter().flatten().filter_map(Button::token).collect()
    }
}

fn main_menu() -> Button {
    Button::callback(LABEL_MAIN_MENU, MAIN_MENU_TOKEN)
}

fn paging_row(section: Section, page: u32, total_pages: u32) -> Vec<Button> {
    let mut row = Vec::with_capacity(2);
    if page > 0 {
        row.push(Button::callback(
            LABEL_PREV,
            NavToken::Prev {
                section,
                page,
                total_pages,
            },
        ));
    }
    if page + 1 < total_pages {
        row.push(Button::callback(
            LABEL_NEXT,
            NavToken::Next {
                section,
                page,
                total_pages,
            },
        ));
    }
    row
}

fn heart_text(is_liked: bool, likes_count: i64) -> String {
    let heart = if is_liked { "❤️" } else { "🤍" };
    if likes_count > 0 {
        format!("{heart} {likes_count}")
    } else {
        heart.to_string()
    }
}

// ---------------------------------------------------------------------------
// Renderers
// ---------------------------------------------------------------------------

/// List page: one numbered open button per post on a single row, then the
/// prev/next row when applicable, then main menu.
///
/// `start_index` is the 1-based ordinal of the first post on the page.
pub fn list_controls(
    section: Section,
    post_ids: &[DbId],
    page: u32,
    total_pages: u32,
    start_index: usize,
) -> Controls {
    let numbered = post_ids
        .iter()
        .enumerate()
        .map(|(i, &post_id)| {
            Button::callback(
                (start_index + i).to_string(),
                NavToken::Open {
                    section,
                    post_id,
                    page,
                    total_pages,
                },
            )
        })
        .collect();

    Controls::new()
        .row(numbered)
        .row(paging_row(section, page, total_pages))
        .row(vec![main_menu()])
}

/// Post detail opened from a list page.
pub fn detail_controls(
    section: Section,
    post_id: DbId,
    page: u32,
    total_pages: u32,
    is_liked: bool,
    likes_count: i64,
    link: Option<&str>,
) -> Controls {
    let top = vec![
        Button::callback(
            heart_text(is_liked, likes_count),
            NavToken::ToggleLike {
                section,
                post_id,
                page,
                total_pages,
            },
        ),
        Button::callback(
            LABEL_BACK_TO_LIST,
            NavToken::Back {
                section,
                page,
                total_pages,
            },
        ),
    ];

    Controls::new()
        .row(top)
        .row(paging_row(section, page, total_pages))
        .row(link.map(|url| vec![Button::url(LABEL_LINK, url)]).unwrap_or_default())
        .row(vec![main_menu()])
}

/// Controls attached to a subscriber notification, reflecting that
/// recipient's own like state.
pub fn notification_controls(post_id: DbId, is_liked: bool, link: Option<&str>) -> Controls {
    let label = if is_liked { LABEL_FAVORITED } else { LABEL_FAVORITE };
    let mut top = vec![Button::callback(label, NavToken::NotifyLike { post_id })];
    if let Some(url) = link {
        top.push(Button::url(LABEL_LINK, url));
    }
    Controls::new().row(top).row(vec![main_menu()])
}

/// The three decision buttons shown under a pending post.
pub fn moderation_controls(post_id: DbId) -> Controls {
    let mut controls = Controls::new();
    for action in ModerationAction::ALL {
        controls = controls.row(vec![Button::callback(
            action.button_label(),
            DecisionToken { action, post_id },
        )]);
    }
    controls
}

pub fn main_menu_controls() -> Controls {
    Controls::new().row(vec![main_menu()])
}
