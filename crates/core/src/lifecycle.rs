//! Post lifecycle state machine.
//!
//! This module lives in `core` (zero internal deps) so the transition rules
//! are shared by the repository layer, the engine, and tests. Persistence
//! mirrors these states through the `post_statuses` lookup table.

use std::fmt;

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Lifecycle event names (published on the event bus)
// ---------------------------------------------------------------------------

/// A post entered the moderation queue.
pub const EVENT_POST_SUBMITTED: &str = "post.submitted";

/// A moderator approved (and thereby published) a post.
pub const EVENT_POST_APPROVED: &str = "post.approved";

/// A moderator rejected a post.
pub const EVENT_POST_REJECTED: &str = "post.rejected";

/// A moderator asked the author to resubmit with changes.
pub const EVENT_POST_CHANGES_REQUESTED: &str = "post.changes_requested";

/// A post was deleted by its author or a moderator.
pub const EVENT_POST_DELETED: &str = "post.deleted";

/// The expiry sweeper removed a batch of posts.
pub const EVENT_POSTS_EXPIRED: &str = "post.expired";

// ---------------------------------------------------------------------------
// States
// ---------------------------------------------------------------------------

/// Every state a post can be in.
///
/// `Approved` and `Expired` are transient: approval publishes in the same
/// transition, and expiry deletes in the same sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostState {
    Draft,
    PendingModeration,
    Approved,
    Rejected,
    ChangesRequested,
    Published,
    Expired,
    Deleted,
}

impl PostState {
    /// Stable lowercase name used in logs and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            PostState::Draft => "draft",
            PostState::PendingModeration => "pending_moderation",
            PostState::Approved => "approved",
            PostState::Rejected => "rejected",
            PostState::ChangesRequested => "changes_requested",
            PostState::Published => "published",
            PostState::Expired => "expired",
            PostState::Deleted => "deleted",
        }
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, PostState::Deleted)
    }

    /// `(is_approved, is_published)` flags persisted alongside the state.
    ///
    /// Guarantees `is_published => is_approved`.
    pub fn flags(self) -> (bool, bool) {
        match self {
            PostState::Approved => (true, false),
            PostState::Published | PostState::Expired => (true, true),
            _ => (false, false),
        }
    }
}

impl fmt::Display for PostState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// Inputs that drive the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Submit,
    Approve,
    Reject,
    RequestChanges,
    Expire,
    Delete,
}

impl Transition {
    fn as_str(self) -> &'static str {
        match self {
            Transition::Submit => "submit",
            Transition::Approve => "approve",
            Transition::Reject => "reject",
            Transition::RequestChanges => "request_changes",
            Transition::Expire => "expire",
            Transition::Delete => "delete",
        }
    }

    /// Moderation decisions are the transitions guarded by `StaleDecision`.
    pub fn is_decision(self) -> bool {
        matches!(
            self,
            Transition::Approve | Transition::Reject | Transition::RequestChanges
        )
    }
}

/// Compute the state reached by applying `transition` to `from`.
///
/// Approval lands directly on `Published`: callers never observe a post that
/// is approved but unpublished. A decision attempted on a post that has
/// already left `PendingModeration` yields [`CoreError::StaleDecision`];
/// any other illegal move is a [`CoreError::Conflict`].
pub fn apply(post_id: DbId, from: PostState, transition: Transition) -> Result<PostState, CoreError> {
    use PostState::*;

    let next = match (from, transition) {
        (Draft, Transition::Submit) => Some(PendingModeration),
        (PendingModeration, Transition::Approve) => Some(Published),
        (PendingModeration, Transition::Reject) => Some(Rejected),
        (PendingModeration, Transition::RequestChanges) => Some(ChangesRequested),
        (Published, Transition::Expire) => Some(Expired),
        (Expired, Transition::Delete) => Some(Deleted),
        (state, Transition::Delete) if !state.is_terminal() => Some(Deleted),
        _ => None,
    };

    match next {
        Some(state) => Ok(state),
        None if transition.is_decision() => Err(CoreError::StaleDecision {
            post_id,
            current: from.to_string(),
        }),
        None => Err(CoreError::Conflict(format!(
            "Invalid transition for post {post_id}: {} from {from}",
            transition.as_str()
        ))),
    }
}
