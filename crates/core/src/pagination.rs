//! Stateless browse-position codec.
//!
//! A [`NavToken`] is carried round-trip through client interactions as an
//! underscore-delimited string (`<section>_<action>[_<int>]*`). All state
//! needed to resume a browsing session lives in the token; the server keeps
//! no session.
//!
//! Tokens carry the *current* page. [`NavToken::target_page`] applies the
//! action (next/prev clamped at the boundaries, no wraparound).

use std::fmt;

use crate::error::CoreError;
use crate::types::DbId;

/// Token emitted by the "main menu" button on every browse view.
pub const MAIN_MENU_TOKEN: &str = "main_menu";

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Browsable result sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Feed,
    Favorites,
    Moderation,
}

impl Section {
    /// Wire prefix for the section.
    pub fn prefix(self) -> &'static str {
        match self {
            Section::Feed => "feed",
            Section::Favorites => "liked",
            Section::Moderation => "moderation",
        }
    }

    fn from_prefix(s: &str) -> Option<Self> {
        match s {
            "feed" => Some(Section::Feed),
            "liked" => Some(Section::Favorites),
            "moderation" => Some(Section::Moderation),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Decode errors
// ---------------------------------------------------------------------------

/// Reasons a token fails to decode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("empty navigation token")]
    Empty,

    #[error("unknown navigation section '{0}'")]
    UnknownSection(String),

    #[error("unknown navigation action '{0}'")]
    UnknownAction(String),

    #[error("navigation token expects {expected} integer arguments, got {got}")]
    Arity { expected: usize, got: usize },

    #[error("navigation token argument '{0}' is not an integer")]
    NotAnInteger(String),
}

impl From<TokenError> for CoreError {
    fn from(err: TokenError) -> Self {
        CoreError::Validation(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// A decoded browse interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavToken {
    /// Open a post from a list page.
    Open {
        section: Section,
        post_id: DbId,
        page: u32,
        total_pages: u32,
    },
    Next {
        section: Section,
        page: u32,
        total_pages: u32,
    },
    Prev {
        section: Section,
        page: u32,
        total_pages: u32,
    },
    /// Return from a post detail to its list page.
    Back {
        section: Section,
        page: u32,
        total_pages: u32,
    },
    /// Toggle the viewer's like on a post shown in a browse view.
    ToggleLike {
        section: Section,
        post_id: DbId,
        page: u32,
        total_pages: u32,
    },
    /// Toggle the viewer's like on a post shown in a subscriber notification.
    NotifyLike { post_id: DbId },
}

impl NavToken {
    /// Section the token belongs to, `None` for notification tokens.
    pub fn section(&self) -> Option<Section> {
        match *self {
            NavToken::Open { section, .. }
            | NavToken::Next { section, .. }
            | NavToken::Prev { section, .. }
            | NavToken::Back { section, .. }
            | NavToken::ToggleLike { section, .. } => Some(section),
            NavToken::NotifyLike { .. } => None,
        }
    }

    pub fn post_id(&self) -> Option<DbId> {
        match *self {
            NavToken::Open { post_id, .. }
            | NavToken::ToggleLike { post_id, .. }
            | NavToken::NotifyLike { post_id } => Some(post_id),
            _ => None,
        }
    }

    /// Page the action navigates to, clamped to `[0, total_pages)`.
    pub fn target_page(&self) -> u32 {
        match *self {
            NavToken::Next {
                page, total_pages, ..
            } => clamp_page(page.saturating_add(1), total_pages),
            NavToken::Prev {
                page, total_pages, ..
            } => clamp_page(page.saturating_sub(1), total_pages),
            NavToken::Open {
                page, total_pages, ..
            }
            | NavToken::Back {
                page, total_pages, ..
            }
            | NavToken::ToggleLike {
                page, total_pages, ..
            } => clamp_page(page, total_pages),
            NavToken::NotifyLike { .. } => 0,
        }
    }

    /// Decode a token string.
    ///
    /// Out-of-range pages are clamped rather than rejected. Entity existence
    /// is not checked here: a token naming a vanished post decodes fine and
    /// the subsequent fetch reports not-found.
    pub fn decode(token: &str) -> Result<Self, TokenError> {
        let mut parts = token.split('_');
        let head = parts.next().filter(|s| !s.is_empty()).ok_or(TokenError::Empty)?;
        let action = parts.next().ok_or(TokenError::Empty)?;
        let args = parts.map(parse_arg).collect::<Result<Vec<_>, _>>()?;

        if head == "notify" {
            if action != "heart" {
                return Err(TokenError::UnknownAction(action.to_string()));
            }
            let [post_id] = expect_args::<1>(&args)?;
            return Ok(NavToken::NotifyLike { post_id });
        }

        let section =
            Section::from_prefix(head).ok_or_else(|| TokenError::UnknownSection(head.to_string()))?;

        let token = match action {
            "open" | "heart" => {
                let [post_id, page, total] = expect_args::<3>(&args)?;
                let (page, total_pages) = normalize(page, total);
                if action == "open" {
                    NavToken::Open {
                        section,
                        post_id,
                        page,
                        total_pages,
                    }
                } else {
                    NavToken::ToggleLike {
                        section,
                        post_id,
                        page,
                        total_pages,
                    }
                }
            }
            "next" | "prev" | "back" => {
                let [page, total] = expect_args::<2>(&args)?;
                let (page, total_pages) = normalize(page, total);
                match action {
                    "next" => NavToken::Next {
                        section,
                        page,
                        total_pages,
                    },
                    "prev" => NavToken::Prev {
                        section,
                        page,
                        total_pages,
                    },
                    _ => NavToken::Back {
                        section,
                        page,
                        total_pages,
                    },
                }
            }
            other => return Err(TokenError::UnknownAction(other.to_string())),
        };
        Ok(token)
    }
}

impl fmt::Display for NavToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            NavToken::Open {
                section,
                post_id,
                page,
                total_pages,
            } => write!(f, "{}_open_{post_id}_{page}_{total_pages}", section.prefix()),
            NavToken::Next {
                section,
                page,
                total_pages,
            } => write!(f, "{}_next_{page}_{total_pages}", section.prefix()),
            NavToken::Prev {
                section,
                page,
                total_pages,
            } => write!(f, "{}_prev_{page}_{total_pages}", section.prefix()),
            NavToken::Back {
                section,
                page,
                total_pages,
            } => write!(f, "{}_back_{page}_{total_pages}", section.prefix()),
            NavToken::ToggleLike {
                section,
                post_id,
                page,
                total_pages,
            } => write!(f, "{}_heart_{post_id}_{page}_{total_pages}", section.prefix()),
            NavToken::NotifyLike { post_id } => write!(f, "notify_heart_{post_id}"),
        }
    }
}

impl std::str::FromStr for NavToken {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NavToken::decode(s)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Number of pages needed for `total` items, `ceil(total / per_page)`.
pub fn total_pages(total: i64, per_page: u32) -> u32 {
    if total <= 0 || per_page == 0 {
        return 0;
    }
    let per_page = i64::from(per_page);
    u32::try_from((total + per_page - 1) / per_page).unwrap_or(u32::MAX)
}

/// Clamp `page` into `[0, total_pages)`; page 0 when there are no pages.
pub fn clamp_page(page: u32, total_pages: u32) -> u32 {
    if total_pages == 0 {
        0
    } else {
        page.min(total_pages - 1)
    }
}

fn parse_arg(raw: &str) -> Result<i64, TokenError> {
    raw.parse::<i64>()
        .map_err(|_| TokenError::NotAnInteger(raw.to_string()))
}

fn expect_args<const N: usize>(args: &[i64]) -> Result<[i64; N], TokenError> {
    <[i64; N]>::try_from(args).map_err(|_| TokenError::Arity {
        expected: N,
        got: args.len(),
    })
}

fn normalize(page: i64, total: i64) -> (u32, u32) {
    let total_pages = u32::try_from(total.max(0)).unwrap_or(u32::MAX);
    let page = u32::try_from(page.max(0)).unwrap_or(u32::MAX);
    (clamp_page(page, total_pages), total_pages)
}
