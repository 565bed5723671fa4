use crate::types::DbId;

/// Domain error taxonomy shared by every layer.
///
/// Each variant is scoped to the single interaction that raised it; none of
/// them is fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A referenced entity does not exist (or is no longer visible).
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    /// Length, format or timing violation on user input.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A moderation action raced with another decision on the same post.
    #[error("Post {post_id} was already decided (current state: {current})")]
    StaleDecision { post_id: DbId, current: String },

    /// Persisted state breaks an invariant that submission validation should
    /// have made unreachable.
    #[error("Consistency violation: {0}")]
    ConsistencyViolation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether the error should be shown to the user as a recoverable prompt
    /// rather than logged as a failure.
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            CoreError::Validation(_) | CoreError::NotFound { .. } | CoreError::StaleDecision { .. }
        )
    }
}
