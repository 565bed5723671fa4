//! Moderation decision surface: actions, decision tokens and the
//! pending-comment gate for reject / request-changes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::lifecycle::Transition;
use crate::pagination::TokenError;
use crate::types::DbId;

const DECISION_PREFIX: &str = "moderate";

/// Maximum moderator comment length in characters.
pub const MAX_COMMENT_LENGTH: usize = 1_000;

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// A moderator's decision. Persisted as its integer id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationAction {
    Approve,
    Reject,
    RequestChanges,
}

impl ModerationAction {
    pub const ALL: [ModerationAction; 3] = [
        ModerationAction::Approve,
        ModerationAction::Reject,
        ModerationAction::RequestChanges,
    ];

    pub fn id(self) -> i16 {
        match self {
            ModerationAction::Approve => 1,
            ModerationAction::Reject => 2,
            ModerationAction::RequestChanges => 3,
        }
    }

    pub fn from_id(id: i16) -> Result<Self, CoreError> {
        match id {
            1 => Ok(ModerationAction::Approve),
            2 => Ok(ModerationAction::Reject),
            3 => Ok(ModerationAction::RequestChanges),
            other => Err(CoreError::ConsistencyViolation(format!(
                "Unknown moderation action id {other}"
            ))),
        }
    }

    /// Whether the moderator must supply a comment before the decision fires.
    pub fn requires_comment(self) -> bool {
        !matches!(self, ModerationAction::Approve)
    }

    pub fn transition(self) -> Transition {
        match self {
            ModerationAction::Approve => Transition::Approve,
            ModerationAction::Reject => Transition::Reject,
            ModerationAction::RequestChanges => Transition::RequestChanges,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ModerationAction::Approve => "Одобрено",
            ModerationAction::Reject => "Отклонено",
            ModerationAction::RequestChanges => "Требуются изменения",
        }
    }

    pub fn button_label(self) -> &'static str {
        match self {
            ModerationAction::Approve => "✅ Одобрить",
            ModerationAction::Reject => "❌ Отклонить",
            ModerationAction::RequestChanges => "✏️ Запросить изменения",
        }
    }

    fn token_name(self) -> &'static str {
        match self {
            ModerationAction::Approve => "approve",
            ModerationAction::Reject => "reject",
            ModerationAction::RequestChanges => "changes",
        }
    }
}

impl fmt::Display for ModerationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token_name())
    }
}

// ---------------------------------------------------------------------------
// Decision tokens
// ---------------------------------------------------------------------------

/// `moderate_<action>_<post_id>` pressed under a pending post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionToken {
    pub action: ModerationAction,
    pub post_id: DbId,
}

impl DecisionToken {
    /// Decode a decision token. The older `moderate_request_changes_<id>`
    /// spelling is still accepted.
    pub fn decode(token: &str) -> Result<Self, TokenError> {
        let rest = token
            .strip_prefix(DECISION_PREFIX)
            .and_then(|r| r.strip_prefix('_'))
            .ok_or_else(|| TokenError::UnknownSection(token.to_string()))?;
        let (action, id) = rest.rsplit_once('_').ok_or(TokenError::Arity {
            expected: 1,
            got: 0,
        })?;
        let action = match action {
            "approve" => ModerationAction::Approve,
            "reject" => ModerationAction::Reject,
            "changes" | "request_changes" => ModerationAction::RequestChanges,
            other => return Err(TokenError::UnknownAction(other.to_string())),
        };
        let post_id = id
            .parse::<DbId>()
            .map_err(|_| TokenError::NotAnInteger(id.to_string()))?;
        Ok(Self { action, post_id })
    }
}

impl fmt::Display for DecisionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{DECISION_PREFIX}_{}_{}", self.action, self.post_id)
    }
}

// ---------------------------------------------------------------------------
// Comment gate
// ---------------------------------------------------------------------------

/// A fully specified decision ready to be applied to a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub post_id: DbId,
    pub moderator_id: DbId,
    pub action: ModerationAction,
    pub comment: Option<String>,
}

/// Outcome of a moderator pressing a decision button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionStep {
    /// The decision can be applied immediately.
    Ready(Decision),
    /// The moderator must send a comment first.
    AwaitingComment(CommentGate),
}

/// Pending reject / request-changes awaiting the moderator's free-text
/// comment. Not a lifecycle state: the post stays in moderation until
/// [`CommentGate::complete`] produces a [`Decision`] and it is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentGate {
    pub post_id: DbId,
    pub moderator_id: DbId,
    pub action: ModerationAction,
}

impl CommentGate {
    /// Start the two-step interaction for a pressed decision token.
    pub fn begin(token: DecisionToken, moderator_id: DbId) -> DecisionStep {
        if token.action.requires_comment() {
            DecisionStep::AwaitingComment(CommentGate {
                post_id: token.post_id,
                moderator_id,
                action: token.action,
            })
        } else {
            DecisionStep::Ready(Decision {
                post_id: token.post_id,
                moderator_id,
                action: token.action,
                comment: None,
            })
        }
    }

    /// Close the gate with the moderator's comment.
    pub fn complete(self, comment: &str) -> Result<Decision, CoreError> {
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(CoreError::Validation("Comment must not be empty".to_string()));
        }
        if comment.chars().count() > MAX_COMMENT_LENGTH {
            return Err(CoreError::Validation(format!(
                "Comment must not exceed {MAX_COMMENT_LENGTH} characters"
            )));
        }
        Ok(Decision {
            post_id: self.post_id,
            moderator_id: self.moderator_id,
            action: self.action,
            comment: Some(comment.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn action_ids_are_stable() {
        for action in ModerationAction::ALL {
            assert_eq!(ModerationAction::from_id(action.id()).unwrap(), action);
        }
        assert_eq!(ModerationAction::Approve.id(), 1);
        assert_eq!(ModerationAction::RequestChanges.id(), 3);
        assert_matches!(
            ModerationAction::from_id(9),
            Err(CoreError::ConsistencyViolation(_))
        );
    }

    #[test]
    fn decision_tokens_round_trip() {
        for action in ModerationAction::ALL {
            let token = DecisionToken { action, post_id: 42 };
            assert_eq!(DecisionToken::decode(&token.to_string()).unwrap(), token);
        }
    }

    #[test]
    fn legacy_request_changes_spelling_decodes() {
        assert_eq!(
            DecisionToken::decode("moderate_request_changes_5").unwrap(),
            DecisionToken {
                action: ModerationAction::RequestChanges,
                post_id: 5
            }
        );
    }

    #[test]
    fn malformed_decision_tokens() {
        assert_matches!(DecisionToken::decode("feed_open_1_0_1"), Err(TokenError::UnknownSection(_)));
        assert_matches!(DecisionToken::decode("moderate_ban_1"), Err(TokenError::UnknownAction(_)));
        assert_matches!(DecisionToken::decode("moderate_approve_x"), Err(TokenError::NotAnInteger(_)));
        assert_matches!(DecisionToken::decode("moderate_approve"), Err(_));
    }

    #[test]
    fn approve_needs_no_comment() {
        let token = DecisionToken {
            action: ModerationAction::Approve,
            post_id: 1,
        };
        assert_matches!(
            CommentGate::begin(token, 77),
            DecisionStep::Ready(Decision { comment: None, moderator_id: 77, .. })
        );
    }

    #[test]
    fn reject_goes_through_the_gate() {
        let token = DecisionToken {
            action: ModerationAction::Reject,
            post_id: 1,
        };
        let DecisionStep::AwaitingComment(gate) = CommentGate::begin(token, 77) else {
            panic!("reject must wait for a comment");
        };
        assert_matches!(gate.clone().complete("   "), Err(CoreError::Validation(_)));
        let decision = gate.complete("  please add a date ").unwrap();
        assert_eq!(decision.comment.as_deref(), Some("please add a date"));
        assert_eq!(decision.action, ModerationAction::Reject);
    }
}
