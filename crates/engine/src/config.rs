use std::collections::HashSet;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use eventcast_core::types::DbId;

/// Default page size for feed, favorites and the moderation view.
const DEFAULT_POSTS_PER_PAGE: u32 = 5;

/// Default delay after an event's time before its post is swept.
const DEFAULT_EXPIRY_GRACE_HOURS: i64 = 2;

const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;

const DEFAULT_SWEEP_BATCH_SIZE: i64 = 100;

/// Moscow time, the poster reference zone.
const DEFAULT_LOCAL_UTC_OFFSET_MINUTES: i32 = 180;

/// Engine configuration loaded once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Platform ids allowed to take moderation decisions.
    pub moderator_ids: HashSet<DbId>,
    /// Platform ids allowed to run administrative broadcasts.
    pub admin_ids: HashSet<DbId>,
    pub posts_per_page: u32,
    pub expiry_grace: chrono::Duration,
    pub sweep_interval: Duration,
    pub sweep_batch_size: i64,
    /// Zone in which posters type event times and in which they are shown.
    pub local_offset: FixedOffset,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            moderator_ids: HashSet::new(),
            admin_ids: HashSet::new(),
            posts_per_page: DEFAULT_POSTS_PER_PAGE,
            expiry_grace: chrono::Duration::hours(DEFAULT_EXPIRY_GRACE_HOURS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            sweep_batch_size: DEFAULT_SWEEP_BATCH_SIZE,
            local_offset: offset_from_minutes(DEFAULT_LOCAL_UTC_OFFSET_MINUTES),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default |
    /// |----------------------------|---------|
    /// | `MODERATOR_IDS`            | empty   |
    /// | `ADMIN_IDS`                | empty   |
    /// | `POSTS_PER_PAGE`           | `5`     |
    /// | `EXPIRY_GRACE_HOURS`       | `2`     |
    /// | `SWEEP_INTERVAL_SECS`      | `3600`  |
    /// | `SWEEP_BATCH_SIZE`         | `100`   |
    /// | `LOCAL_UTC_OFFSET_MINUTES` | `180`   |
    ///
    /// Panics on malformed values so misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let posts_per_page: u32 = std::env::var("POSTS_PER_PAGE")
            .unwrap_or_else(|_| DEFAULT_POSTS_PER_PAGE.to_string())
            .parse()
            .expect("POSTS_PER_PAGE must be a valid u32");

        let grace_hours: i64 = std::env::var("EXPIRY_GRACE_HOURS")
            .unwrap_or_else(|_| DEFAULT_EXPIRY_GRACE_HOURS.to_string())
            .parse()
            .expect("EXPIRY_GRACE_HOURS must be a valid i64");

        let sweep_interval_secs: u64 = std::env::var("SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| DEFAULT_SWEEP_INTERVAL_SECS.to_string())
            .parse()
            .expect("SWEEP_INTERVAL_SECS must be a valid u64");

        let sweep_batch_size: i64 = std::env::var("SWEEP_BATCH_SIZE")
            .unwrap_or_else(|_| DEFAULT_SWEEP_BATCH_SIZE.to_string())
            .parse()
            .expect("SWEEP_BATCH_SIZE must be a valid i64");

        let offset_minutes: i32 = std::env::var("LOCAL_UTC_OFFSET_MINUTES")
            .unwrap_or_else(|_| DEFAULT_LOCAL_UTC_OFFSET_MINUTES.to_string())
            .parse()
            .expect("LOCAL_UTC_OFFSET_MINUTES must be a valid i32");

        Self {
            moderator_ids: parse_ids(&std::env::var("MODERATOR_IDS").unwrap_or_default()),
            admin_ids: parse_ids(&std::env::var("ADMIN_IDS").unwrap_or_default()),
            posts_per_page: posts_per_page.max(1),
            expiry_grace: chrono::Duration::hours(grace_hours),
            sweep_interval: Duration::from_secs(sweep_interval_secs),
            sweep_batch_size: sweep_batch_size.max(1),
            local_offset: offset_from_minutes(offset_minutes),
        }
    }

    /// Admins may moderate as well.
    pub fn is_moderator(&self, user_id: DbId) -> bool {
        self.moderator_ids.contains(&user_id) || self.admin_ids.contains(&user_id)
    }

    pub fn is_admin(&self, user_id: DbId) -> bool {
        self.admin_ids.contains(&user_id)
    }

    /// Moderators notified about new submissions, in a stable order.
    pub fn moderator_list(&self) -> Vec<DbId> {
        let mut ids: Vec<DbId> = self.moderator_ids.iter().copied().collect();
        ids.sort_unstable();
        ids
    }
}

/// Comma-separated platform ids; unparsable entries are skipped with a warning.
fn parse_ids(raw: &str) -> HashSet<DbId> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse() {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::warn!(value = s, "Ignoring malformed user id in configuration");
                None
            }
        })
        .collect()
}

fn offset_from_minutes(minutes: i32) -> FixedOffset {
    FixedOffset::east_opt(minutes.saturating_mul(60)).unwrap_or_else(|| {
        tracing::warn!(minutes, "UTC offset out of range, falling back to UTC");
        Utc.fix()
    })
}
