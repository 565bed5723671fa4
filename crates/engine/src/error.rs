use eventcast_core::error::CoreError;
use eventcast_core::pagination::TokenError;
use eventcast_events::media::MediaError;

/// Error type returned by engine services.
///
/// Wraps [`CoreError`] for domain errors and adds the store and media
/// failures the orchestration layer can hit.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Media(#[from] MediaError),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl From<TokenError> for EngineError {
    fn from(err: TokenError) -> Self {
        EngineError::Core(err.into())
    }
}

impl EngineError {
    /// Whether the caller should re-prompt or render an empty state instead
    /// of reporting a failure.
    pub fn is_user_recoverable(&self) -> bool {
        match self {
            EngineError::Core(core) => core.is_user_recoverable(),
            _ => false,
        }
    }

    /// The domain error, if this is one.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            EngineError::Core(core) => Some(core),
            _ => None,
        }
    }
}
