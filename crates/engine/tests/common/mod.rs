//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use eventcast_core::lifecycle::PostState;
use eventcast_core::submission::Draft;
use eventcast_core::types::{DbId, Timestamp};
use eventcast_db::models::catalog::CreateCategory;
use eventcast_db::models::post::{CreatePost, Post};
use eventcast_db::models::user::UpsertUser;
use eventcast_db::repositories::{CatalogRepo, PostRepo, SubscriptionRepo, UserRepo};
use eventcast_engine::{
    AdminBroadcast, BrowseService, EngineConfig, ExpirySweeper, PostLifecycle, UserService,
};
use eventcast_events::{
    DispatchConfig, EventBus, MediaStore, NotificationDispatcher, PassThroughMediaStore,
    RecordingChatClient,
};
use sqlx::PgPool;

pub const MODERATOR: DbId = 900;
pub const ADMIN: DbId = 901;

/// Every engine service wired to one recording chat client.
pub struct Harness {
    pub pool: PgPool,
    pub client: Arc<RecordingChatClient>,
    pub bus: Arc<EventBus>,
    pub config: Arc<EngineConfig>,
    pub lifecycle: PostLifecycle,
    pub browse: BrowseService,
    pub sweeper: ExpirySweeper,
    pub broadcast: AdminBroadcast,
    pub users: UserService,
}

pub fn harness(pool: &PgPool) -> Harness {
    harness_with(pool, DispatchConfig::default())
}

pub fn harness_with(pool: &PgPool, dispatch: DispatchConfig) -> Harness {
    let client = Arc::new(RecordingChatClient::new());
    let bus = Arc::new(EventBus::default());
    let media: Arc<dyn MediaStore> = Arc::new(PassThroughMediaStore);
    let config = Arc::new(EngineConfig {
        moderator_ids: HashSet::from([MODERATOR]),
        admin_ids: HashSet::from([ADMIN]),
        posts_per_page: 2,
        sweep_batch_size: 2,
        ..EngineConfig::default()
    });
    let dispatcher = Arc::new(NotificationDispatcher::new(
        client.clone(),
        DispatchConfig {
            delay: Duration::ZERO,
            ..dispatch
        },
    ));

    Harness {
        pool: pool.clone(),
        client: client.clone(),
        bus: bus.clone(),
        config: config.clone(),
        lifecycle: PostLifecycle::new(
            pool.clone(),
            bus.clone(),
            dispatcher.clone(),
            media.clone(),
            config.clone(),
        ),
        browse: BrowseService::new(pool.clone(), config.clone()),
        sweeper: ExpirySweeper::new(pool.clone(), media.clone(), bus, config.clone()),
        broadcast: AdminBroadcast::new(pool.clone(), dispatcher, config),
        users: UserService::new(pool.clone(), media),
    }
}

pub async fn user(pool: &PgPool, id: DbId) -> DbId {
    UserRepo::get_or_create(
        pool,
        &UpsertUser {
            id,
            username: None,
            first_name: Some(format!("User {id}")),
            last_name: None,
        },
    )
    .await
    .unwrap()
    .id
}

pub async fn city(pool: &PgPool, name: &str) -> DbId {
    CatalogRepo::create_city(pool, name).await.unwrap().id
}

pub async fn category(pool: &PgPool, name: &str) -> DbId {
    CatalogRepo::create_category(
        pool,
        &CreateCategory {
            name: name.to_string(),
            display_name: Some(format!("✨ {name}")),
            description: None,
        },
    )
    .await
    .unwrap()
    .id
}

pub async fn subscribe(pool: &PgPool, user_id: DbId, cities: &[DbId], categories: &[DbId]) {
    SubscriptionRepo::set_cities(pool, user_id, cities).await.unwrap();
    SubscriptionRepo::set_categories(pool, user_id, categories)
        .await
        .unwrap();
}

/// A valid draft for an event one hour from now.
pub fn draft(author_id: DbId, cities: &[DbId], categories: &[DbId]) -> Draft {
    Draft {
        author_id,
        title: "Board games night".to_string(),
        body: "Bring <b>snacks</b>".to_string(),
        image_id: None,
        link: Some("https://games.example".to_string()),
        address: Some("Main st. 5".to_string()),
        event_at: Some(Utc::now() + chrono::Duration::hours(1)),
        category_ids: categories.to_vec(),
        city_ids: cities.to_vec(),
    }
}

/// Insert a published post directly, skipping submission checks so the
/// event may already be in the past.
pub async fn published_at(pool: &PgPool, draft: Draft, event_at: Option<Timestamp>) -> Post {
    let mut input = CreatePost::from(draft);
    input.event_at = event_at;
    input.image_id = Some("poster-1".to_string());

    let mut tx = pool.begin().await.unwrap();
    let post = PostRepo::create_draft(&mut *tx, &input).await.unwrap();
    let post = PostRepo::set_state(&mut *tx, post.id, PostState::Published)
        .await
        .unwrap();
    tx.commit().await.unwrap();
    post
}
