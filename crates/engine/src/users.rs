//! User registration, subscriptions and self-service erasure.

use std::sync::Arc;

use eventcast_core::error::CoreError;
use eventcast_core::types::DbId;
use eventcast_db::models::catalog::{Category, City};
use eventcast_db::models::post::PostCard;
use eventcast_db::models::user::{UpsertUser, User};
use eventcast_db::repositories::{CatalogRepo, PostRepo, SubscriptionRepo, UserRepo};
use eventcast_db::DbPool;
use eventcast_events::MediaStore;

use crate::error::EngineResult;

/// A user's current subscriptions.
#[derive(Debug, Clone)]
pub struct Subscriptions {
    pub cities: Vec<City>,
    pub categories: Vec<Category>,
}

pub struct UserService {
    pool: DbPool,
    media: Arc<dyn MediaStore>,
}

impl UserService {
    pub fn new(pool: DbPool, media: Arc<dyn MediaStore>) -> Self {
        Self { pool, media }
    }

    /// Register on first interaction; refreshes profile fields afterwards.
    pub async fn touch(&self, profile: &UpsertUser) -> EngineResult<User> {
        Ok(UserRepo::get_or_create(&self.pool, profile).await?)
    }

    pub async fn cities(&self) -> EngineResult<Vec<City>> {
        Ok(CatalogRepo::list_cities(&self.pool).await?)
    }

    pub async fn categories(&self) -> EngineResult<Vec<Category>> {
        Ok(CatalogRepo::list_categories(&self.pool).await?)
    }

    /// Replace the user's subscribed cities. Unknown ids are rejected.
    pub async fn set_cities(&self, user_id: DbId, city_ids: &[DbId]) -> EngineResult<()> {
        let ids = dedup(city_ids);
        let known = CatalogRepo::cities_by_ids(&self.pool, &ids).await?;
        if known.len() != ids.len() {
            return Err(CoreError::Validation("Unknown city selected".into()).into());
        }
        SubscriptionRepo::set_cities(&self.pool, user_id, &ids).await?;
        tracing::info!(user_id, cities = ids.len(), "City subscriptions updated");
        Ok(())
    }

    /// Replace the user's subscribed categories. Unknown ids are rejected.
    pub async fn set_categories(&self, user_id: DbId, category_ids: &[DbId]) -> EngineResult<()> {
        let ids = dedup(category_ids);
        let known = CatalogRepo::categories_by_ids(&self.pool, &ids).await?;
        if known.len() != ids.len() {
            return Err(CoreError::Validation("Unknown category selected".into()).into());
        }
        SubscriptionRepo::set_categories(&self.pool, user_id, &ids).await?;
        tracing::info!(user_id, categories = ids.len(), "Category subscriptions updated");
        Ok(())
    }

    pub async fn subscriptions(&self, user_id: DbId) -> EngineResult<Subscriptions> {
        let city_ids = SubscriptionRepo::city_ids(&self.pool, user_id).await?;
        let category_ids = SubscriptionRepo::category_ids(&self.pool, user_id).await?;
        Ok(Subscriptions {
            cities: CatalogRepo::cities_by_ids(&self.pool, &city_ids).await?,
            categories: CatalogRepo::categories_by_ids(&self.pool, &category_ids).await?,
        })
    }

    /// The user's own posts, newest first.
    pub async fn posts(&self, user_id: DbId) -> EngineResult<Vec<PostCard>> {
        Ok(PostRepo::list_by_author(&self.pool, user_id).await?)
    }

    /// Delete the user with their posts, likes and subscriptions.
    pub async fn erase(&self, user_id: DbId) -> EngineResult<()> {
        let media_ids = UserRepo::delete(&self.pool, user_id)
            .await?
            .ok_or(CoreError::NotFound { entity: "User", id: user_id })?;

        tracing::info!(user_id, media = media_ids.len(), "User erased");

        if !media_ids.is_empty() {
            if let Err(e) = self.media.release(&media_ids).await {
                tracing::warn!(user_id, error = %e, "Failed to release erased user's media");
            }
        }
        Ok(())
    }
}

pub(crate) fn dedup(ids: &[DbId]) -> Vec<DbId> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}
