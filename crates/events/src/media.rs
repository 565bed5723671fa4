//! Media-storage port.

use async_trait::async_trait;

/// Platform-deliverable reference to stored media.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaHandle(pub String);

impl MediaHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Media {0} not found")]
    NotFound(String),

    #[error("Media storage error: {0}")]
    Storage(String),
}

/// Resolves stored media ids to deliverable handles and reclaims media of
/// removed posts.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn resolve(&self, media_id: &str) -> Result<MediaHandle, MediaError>;

    async fn release(&self, media_ids: &[String]) -> Result<(), MediaError>;
}

/// For platforms that host uploaded media themselves: ids are already
/// handles and there is nothing to reclaim.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThroughMediaStore;

#[async_trait]
impl MediaStore for PassThroughMediaStore {
    async fn resolve(&self, media_id: &str) -> Result<MediaHandle, MediaError> {
        if media_id.is_empty() {
            return Err(MediaError::NotFound(media_id.to_string()));
        }
        Ok(MediaHandle(media_id.to_string()))
    }

    async fn release(&self, media_ids: &[String]) -> Result<(), MediaError> {
        tracing::debug!(count = media_ids.len(), "Platform-hosted media needs no release");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn pass_through_resolves_ids_verbatim() {
        let store = PassThroughMediaStore;
        assert_eq!(store.resolve("AgAC-1").await.unwrap().as_str(), "AgAC-1");
        assert_matches!(store.resolve("").await, Err(MediaError::NotFound(_)));
        assert!(store.release(&["AgAC-1".to_string()]).await.is_ok());
    }
}
