//! Shared fixtures for repository integration tests.

use chrono::{Duration, Utc};
use eventcast_core::lifecycle::PostState;
use eventcast_core::types::DbId;
use eventcast_db::models::catalog::CreateCategory;
use eventcast_db::models::post::{CreatePost, Post};
use eventcast_db::models::user::UpsertUser;
use eventcast_db::repositories::{CatalogRepo, PostRepo, SubscriptionRepo, UserRepo};
use sqlx::PgPool;

pub async fn user(pool: &PgPool, id: DbId) -> DbId {
    UserRepo::get_or_create(
        pool,
        &UpsertUser {
            id,
            username: Some(format!("user{id}")),
            first_name: None,
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
            display_name: None,
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

pub fn new_post(author_id: DbId, cities: &[DbId], categories: &[DbId]) -> CreatePost {
    CreatePost {
        author_id,
        title: "Board games night".to_string(),
        body: "Bring a friend".to_string(),
        image_id: Some("img-1".to_string()),
        link: None,
        address: None,
        event_at: Some(Utc::now() + Duration::hours(5)),
        category_ids: categories.to_vec(),
        city_ids: cities.to_vec(),
    }
}

/// Insert a post and move it straight to `state`.
pub async fn post_in_state(pool: &PgPool, input: &CreatePost, state: PostState) -> Post {
    let mut conn = pool.acquire().await.unwrap();
    let post = PostRepo::create_draft(&mut conn, input).await.unwrap();
    PostRepo::set_state(&mut conn, post.id, state).await.unwrap()
}
