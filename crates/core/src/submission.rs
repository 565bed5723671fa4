//! Submission limits and the validated draft handed to the lifecycle.
//!
//! Every check returns [`CoreError::Validation`] so the caller can re-prompt
//! the same input step instead of failing the interaction.

use std::sync::LazyLock;

use chrono::{Duration, FixedOffset, NaiveDateTime, TimeZone, Utc};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum title length in characters.
pub const MAX_TITLE_LENGTH: usize = 100;

/// Maximum body length in characters.
pub const MAX_BODY_LENGTH: usize = 2_000;

/// Maximum address length in characters.
pub const MAX_ADDRESS_LENGTH: usize = 500;

/// Maximum external link length in characters.
pub const MAX_LINK_LENGTH: usize = 500;

/// Minimum lead time between submission and the event itself.
pub const MIN_EVENT_LEAD_MINUTES: i64 = 30;

/// Input format for event times, interpreted in the poster's reference zone.
pub const EVENT_TIME_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Markup tags allowed in the body (bold, italic, underline, strikethrough).
pub const ALLOWED_BODY_TAGS: &[&str] = &["b", "i", "u", "s"];

/// Regex matching any opening or closing markup tag.
static TAG_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"</?\s*([A-Za-z][A-Za-z0-9-]*)([^>]*)>").expect("valid regex"));

// ---------------------------------------------------------------------------
// Draft
// ---------------------------------------------------------------------------

/// A fully collected submission that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
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

impl Draft {
    /// Run every submission precondition against the reference time `now`.
    pub fn validate(&self, now: Timestamp) -> Result<(), CoreError> {
        validate_title(&self.title)?;
        validate_body(&self.body)?;
        if let Some(link) = &self.link {
            validate_link(link)?;
        }
        if let Some(address) = &self.address {
            validate_address(address)?;
        }
        if let Some(event_at) = self.event_at {
            validate_event_time(event_at, now)?;
        }
        validate_targets(&self.category_ids, &self.city_ids)
    }
}

// ---------------------------------------------------------------------------
// Validation functions
// ---------------------------------------------------------------------------

/// Validate a title: non-empty and at most [`MAX_TITLE_LENGTH`] characters.
pub fn validate_title(title: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::Validation("Title must not be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(CoreError::Validation(format!(
            "Title must not exceed {MAX_TITLE_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Validate a body: non-empty, length-limited, and restricted to the safe
/// markup subset in [`ALLOWED_BODY_TAGS`] without attributes.
pub fn validate_body(body: &str) -> Result<(), CoreError> {
    if body.trim().is_empty() {
        return Err(CoreError::Validation("Body must not be empty".to_string()));
    }
    if body.chars().count() > MAX_BODY_LENGTH {
        return Err(CoreError::Validation(format!(
            "Body must not exceed {MAX_BODY_LENGTH} characters"
        )));
    }
    for caps in TAG_RE.captures_iter(body) {
        let tag = caps[1].to_ascii_lowercase();
        if !ALLOWED_BODY_TAGS.contains(&tag.as_str()) {
            return Err(CoreError::Validation(format!(
                "Unsupported markup tag <{tag}>. Allowed: {}",
                ALLOWED_BODY_TAGS.join(", ")
            )));
        }
        if !caps[2].trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "Markup tag <{tag}> must not carry attributes"
            )));
        }
    }
    Ok(())
}

/// Validate an external link: http(s) scheme and bounded length.
pub fn validate_link(link: &str) -> Result<(), CoreError> {
    if !(link.starts_with("http://") || link.starts_with("https://")) {
        return Err(CoreError::Validation(
            "Link must start with http:// or https://".to_string(),
        ));
    }
    if link.chars().count() > MAX_LINK_LENGTH {
        return Err(CoreError::Validation(format!(
            "Link must not exceed {MAX_LINK_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Validate a free-text address.
pub fn validate_address(address: &str) -> Result<(), CoreError> {
    if address.chars().count() > MAX_ADDRESS_LENGTH {
        return Err(CoreError::Validation(format!(
            "Address must not exceed {MAX_ADDRESS_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Validate that an event is at least [`MIN_EVENT_LEAD_MINUTES`] ahead of `now`.
pub fn validate_event_time(event_at: Timestamp, now: Timestamp) -> Result<(), CoreError> {
    if event_at < now + Duration::minutes(MIN_EVENT_LEAD_MINUTES) {
        return Err(CoreError::Validation(format!(
            "Event time must be at least {MIN_EVENT_LEAD_MINUTES} minutes in the future"
        )));
    }
    Ok(())
}

/// Validate that a post targets at least one category and one city.
pub fn validate_targets(category_ids: &[DbId], city_ids: &[DbId]) -> Result<(), CoreError> {
    if category_ids.is_empty() {
        return Err(CoreError::Validation(
            "At least one category is required".to_string(),
        ));
    }
    if city_ids.is_empty() {
        return Err(CoreError::Validation("At least one city is required".to_string()));
    }
    Ok(())
}

/// Parse a `DD.MM.YYYY HH:MM` event time typed in the poster's zone.
pub fn parse_local_event_time(input: &str, offset: FixedOffset) -> Result<Timestamp, CoreError> {
    let naive = NaiveDateTime::parse_from_str(input.trim(), EVENT_TIME_FORMAT).map_err(|_| {
        CoreError::Validation("Invalid date format. Use DD.MM.YYYY HH:MM".to_string())
    })?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| CoreError::Validation("Ambiguous local time".to_string()))
}

/// Render a UTC timestamp in the poster's reference zone for display.
pub fn format_local_event_time(at: Timestamp, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format(EVENT_TIME_FORMAT).to_string()
}
