//! Admin broadcast and user self-service.

mod common;

use assert_matches::assert_matches;
use chrono::Utc;
use common::{category, city, draft, harness, harness_with, published_at, user, ADMIN};
use eventcast_core::error::CoreError;
use eventcast_db::repositories::{LikeRepo, PostRepo, UserRepo};
use eventcast_events::DispatchConfig;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn broadcast_reaches_active_users_and_reports_progress(pool: PgPool) {
    let h = harness(&pool);
    for id in 1..=3 {
        user(&pool, id).await;
    }
    UserRepo::set_active(&pool, 3, false).await.unwrap();

    let report = h.broadcast.run(ADMIN, "  Festival weekend!  ").await.unwrap();

    assert_eq!((report.sent, report.failed, report.skipped), (2, 0, 0));
    assert_eq!(h.client.sent_to(1)[0].text, "Festival weekend!");
    assert!(h.client.sent_to(3).is_empty());

    let progress = h.client.sent_to(ADMIN);
    assert_eq!(progress.len(), 1);
    assert!(progress[0].text.starts_with("📣 Рассылка: 0/2"));
    let last_edit = h.client.edited().pop().expect("progress message edited");
    assert!(last_edit.text.starts_with("✅ Рассылка завершена"));
    assert!(last_edit.text.contains("Отправлено: 2"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn broadcast_honors_the_recipient_ceiling(pool: PgPool) {
    let h = harness_with(
        &pool,
        DispatchConfig {
            max_recipients: Some(2),
            ..DispatchConfig::default()
        },
    );
    for id in 1..=5 {
        user(&pool, id).await;
    }

    let report = h.broadcast.run(ADMIN, "Hello").await.unwrap();
    assert_eq!((report.sent, report.skipped), (2, 3));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn broadcast_is_admin_only_and_needs_text(pool: PgPool) {
    let h = harness(&pool);
    user(&pool, 1).await;

    let err = h.broadcast.run(1, "Hello").await.unwrap_err();
    assert_matches!(err.as_core(), Some(CoreError::Forbidden(_)));

    let err = h.broadcast.run(ADMIN, " \n ").await.unwrap_err();
    assert_matches!(err.as_core(), Some(CoreError::Validation(_)));
    assert!(h.client.sent().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn subscriptions_reject_unknown_ids(pool: PgPool) {
    let h = harness(&pool);
    let viewer = user(&pool, 7).await;
    let msk = city(&pool, "Moscow").await;
    let games = category(&pool, "games").await;

    h.users.set_cities(viewer, &[msk, msk]).await.unwrap();
    h.users.set_categories(viewer, &[games]).await.unwrap();
    let err = h.users.set_cities(viewer, &[msk, msk + 100]).await.unwrap_err();
    assert_matches!(err.as_core(), Some(CoreError::Validation(_)));

    let subs = h.users.subscriptions(viewer).await.unwrap();
    assert_eq!(subs.cities.len(), 1);
    assert_eq!(subs.categories[0].id, games);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn erase_removes_the_user_and_their_posts(pool: PgPool) {
    let h = harness(&pool);
    let author = user(&pool, 1).await;
    let fan = user(&pool, 2).await;
    let msk = city(&pool, "Moscow").await;
    let games = category(&pool, "games").await;
    let at = Some(Utc::now() + chrono::Duration::hours(4));
    let post = published_at(&pool, draft(author, &[msk], &[games]), at).await;
    LikeRepo::toggle(&pool, fan, post.id).await.unwrap();

    h.users.erase(author).await.unwrap();

    assert!(UserRepo::find_by_id(&pool, author).await.unwrap().is_none());
    assert!(PostRepo::find_by_id(&pool, post.id).await.unwrap().is_none());
    assert_eq!(LikeRepo::count_for_post(&pool, post.id).await.unwrap(), 0);

    let err = h.users.erase(author).await.unwrap_err();
    assert_matches!(err.as_core(), Some(CoreError::NotFound { .. }));
}
