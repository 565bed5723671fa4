//! Submission, moderation and deletion against a real database.

mod common;

use assert_matches::assert_matches;
use chrono::Utc;
use common::{category, city, draft, harness, subscribe, user, MODERATOR};
use eventcast_core::controls::{LABEL_FAVORITE, LABEL_FAVORITED};
use eventcast_core::error::CoreError;
use eventcast_core::lifecycle::{PostState, EVENT_POST_APPROVED, EVENT_POST_REJECTED};
use eventcast_core::moderation::{DecisionStep, DecisionToken, ModerationAction};
use eventcast_db::models::post::CreatePost;
use eventcast_db::repositories::{LikeRepo, PostRepo};
use eventcast_engine::{AuthorNotifier, EngineError, ModerationQueue};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

fn core(err: &EngineError) -> &CoreError {
    err.as_core().expect("expected a domain error")
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn submitted_post_enters_the_moderation_queue(pool: PgPool) {
    let h = harness(&pool);
    let author = user(&pool, 1).await;
    let msk = city(&pool, "Moscow").await;
    let games = category(&pool, "games").await;

    let before = ModerationQueue::len(&pool).await.unwrap();
    let post = h
        .lifecycle
        .submit(draft(author, &[msk], &[games]), Utc::now())
        .await
        .unwrap();

    assert_eq!(post.state().unwrap(), PostState::PendingModeration);
    assert!(post.submitted_at.is_some());
    assert!(!post.is_approved && !post.is_published);
    assert_eq!(ModerationQueue::len(&pool).await.unwrap(), before + 1);

    let alerts = h.client.sent_to(MODERATOR);
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].text.starts_with("<b>Пост на модерацию</b>"));
    let approve = DecisionToken {
        action: ModerationAction::Approve,
        post_id: post.id,
    }
    .to_string();
    assert!(alerts[0].controls.tokens().contains(&approve.as_str()));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn invalid_draft_is_not_persisted(pool: PgPool) {
    let h = harness(&pool);
    let author = user(&pool, 1).await;
    let msk = city(&pool, "Moscow").await;
    let games = category(&pool, "games").await;

    let mut soon = draft(author, &[msk], &[games]);
    soon.event_at = Some(Utc::now() + chrono::Duration::minutes(5));
    let err = h.lifecycle.submit(soon, Utc::now()).await.unwrap_err();

    assert_matches!(core(&err), CoreError::Validation(_));
    assert_eq!(ModerationQueue::len(&pool).await.unwrap(), 0);
    assert!(h.client.sent().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_or_inactive_targets_are_a_validation_error(pool: PgPool) {
    let h = harness(&pool);
    let author = user(&pool, 1).await;
    let msk = city(&pool, "Moscow").await;
    let games = category(&pool, "games").await;
    let retired = category(&pool, "retired").await;
    sqlx::query("UPDATE categories SET is_active = false WHERE id = $1")
        .bind(retired)
        .execute(&pool)
        .await
        .unwrap();

    for (cities, categories) in [
        (vec![msk], vec![99_999]),
        (vec![msk, 88_888], vec![games]),
        (vec![msk], vec![games, retired]),
    ] {
        let err = h
            .lifecycle
            .submit(draft(author, &cities, &categories), Utc::now())
            .await
            .unwrap_err();
        assert_matches!(core(&err), CoreError::Validation(_));
        assert!(err.is_user_recoverable());
    }
    assert_eq!(ModerationQueue::len(&pool).await.unwrap(), 0);

    let repeated = draft(author, &[msk, msk], &[games, games]);
    h.lifecycle.submit(repeated, Utc::now()).await.unwrap();
    assert_eq!(ModerationQueue::len(&pool).await.unwrap(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn approving_a_post_without_targets_is_refused(pool: PgPool) {
    let h = harness(&pool);
    let author = user(&pool, 1).await;
    let input = CreatePost::from(draft(author, &[], &[]));

    let mut tx = pool.begin().await.unwrap();
    let post = PostRepo::create_draft(&mut *tx, &input).await.unwrap();
    PostRepo::set_state(&mut *tx, post.id, PostState::PendingModeration)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let err = h.lifecycle.approve(post.id, MODERATOR).await.unwrap_err();
    assert_matches!(core(&err), CoreError::ConsistencyViolation(_));

    let stored = PostRepo::find_by_id(&pool, post.id).await.unwrap().unwrap();
    assert_eq!(stored.state().unwrap(), PostState::PendingModeration);
    assert!(!stored.is_approved && !stored.is_published);
    assert!(ModerationQueue::history(&pool, post.id).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn author_hears_about_decisions_on_the_shared_bus(pool: PgPool) {
    let h = harness(&pool);
    let author = user(&pool, 1).await;
    let msk = city(&pool, "Moscow").await;
    let games = category(&pool, "games").await;

    let notifier = AuthorNotifier::new(h.client.clone());
    let events = h.bus.subscribe();
    let cancel = CancellationToken::new();

    let post = h
        .lifecycle
        .submit(draft(author, &[msk], &[games]), Utc::now())
        .await
        .unwrap();
    h.lifecycle
        .reject(post.id, MODERATOR, "Add the venue address")
        .await
        .unwrap();

    // The notifier drains what was published, then stops on cancellation.
    let stop = cancel.clone();
    let drain = async {
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        stop.cancel();
    };
    tokio::join!(notifier.run(events, cancel), drain);

    let texts: Vec<String> = h.client.sent_to(author).into_iter().map(|m| m.text).collect();
    assert_eq!(texts.len(), 2);
    assert!(texts[0].starts_with("✅ Мероприятие отправлено на модерацию!"));
    assert!(texts[1].contains("отклонено"));
    assert!(texts[1].ends_with("Add the venue address"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn approval_publishes_and_notifies_matching_subscribers(pool: PgPool) {
    let h = harness(&pool);
    let author = user(&pool, 1).await;
    let fan = user(&pool, 2).await;
    let other = user(&pool, 3).await;
    let msk = city(&pool, "Moscow").await;
    let games = category(&pool, "games").await;
    let music = category(&pool, "music").await;
    subscribe(&pool, fan, &[msk], &[games]).await;
    subscribe(&pool, other, &[msk], &[music]).await;

    let mut events = h.bus.subscribe();
    let post = h
        .lifecycle
        .submit(draft(author, &[msk], &[games]), Utc::now())
        .await
        .unwrap();
    let outcome = h.lifecycle.approve(post.id, MODERATOR).await.unwrap();

    assert_eq!(outcome.state, PostState::Published);
    assert!(outcome.post.is_approved && outcome.post.is_published);
    assert!(outcome.post.published_at.is_some());

    let report = outcome.report.unwrap();
    assert_eq!((report.sent, report.failed, report.skipped), (1, 0, 0));
    let delivered = h.client.sent_to(fan);
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].text.contains("Board games night"));
    assert!(h.client.sent_to(other).is_empty());

    let history = ModerationQueue::history(&pool, post.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].action().unwrap(), ModerationAction::Approve);
    assert_eq!(history[0].moderator_id, MODERATOR);
    assert_eq!(ModerationQueue::len(&pool).await.unwrap(), 0);

    let mut approved = None;
    while let Ok(event) = events.try_recv() {
        if event.event_type == EVENT_POST_APPROVED {
            approved = Some(event);
        }
    }
    let approved = approved.expect("approval event published");
    assert_eq!(approved.author_id, Some(author));
    assert_eq!(approved.actor_id, Some(MODERATOR));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn notification_controls_reflect_each_recipients_like(pool: PgPool) {
    let h = harness(&pool);
    let author = user(&pool, 1).await;
    let fan = user(&pool, 2).await;
    let msk = city(&pool, "Moscow").await;
    let games = category(&pool, "games").await;
    subscribe(&pool, author, &[msk], &[games]).await;
    subscribe(&pool, fan, &[msk], &[games]).await;

    let post = h
        .lifecycle
        .submit(draft(author, &[msk], &[games]), Utc::now())
        .await
        .unwrap();
    h.lifecycle.approve(post.id, MODERATOR).await.unwrap();
    LikeRepo::toggle(&pool, fan, post.id).await.unwrap();

    let report = h.lifecycle.notify_subscribers(post.id).await.unwrap();
    assert_eq!(report.sent, 2);

    let label = |recipient| {
        h.client.sent_to(recipient).last().unwrap().controls.rows[0][0]
            .text
            .clone()
    };
    assert_eq!(label(fan), LABEL_FAVORITED);
    assert_eq!(label(author), LABEL_FAVORITE);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn rejection_requires_a_comment_and_forwards_it(pool: PgPool) {
    let h = harness(&pool);
    let author = user(&pool, 1).await;
    let msk = city(&pool, "Moscow").await;
    let games = category(&pool, "games").await;
    let post = h
        .lifecycle
        .submit(draft(author, &[msk], &[games]), Utc::now())
        .await
        .unwrap();

    let err = h.lifecycle.reject(post.id, MODERATOR, "   ").await.unwrap_err();
    assert_matches!(core(&err), CoreError::Validation(_));
    assert_eq!(
        PostRepo::find_by_id(&pool, post.id).await.unwrap().unwrap().state().unwrap(),
        PostState::PendingModeration
    );

    let mut events = h.bus.subscribe();
    let outcome = h
        .lifecycle
        .reject(post.id, MODERATOR, "Add the venue address")
        .await
        .unwrap();
    assert_eq!(outcome.state, PostState::Rejected);
    assert!(outcome.report.is_none());

    let event = events.try_recv().unwrap();
    assert_eq!(event.event_type, EVENT_POST_REJECTED);
    assert_eq!(event.comment.as_deref(), Some("Add the venue address"));

    let history = ModerationQueue::history(&pool, post.id).await.unwrap();
    assert_eq!(history[0].comment.as_deref(), Some("Add the venue address"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn comment_gate_rechecks_the_post_on_completion(pool: PgPool) {
    let h = harness(&pool);
    let author = user(&pool, 1).await;
    let msk = city(&pool, "Moscow").await;
    let games = category(&pool, "games").await;
    let post = h
        .lifecycle
        .submit(draft(author, &[msk], &[games]), Utc::now())
        .await
        .unwrap();

    let token = DecisionToken {
        action: ModerationAction::RequestChanges,
        post_id: post.id,
    };
    let step = h.lifecycle.select_decision(token, MODERATOR).await.unwrap();
    let DecisionStep::AwaitingComment(gate) = step else {
        panic!("request-changes must wait for a comment");
    };

    // Another moderator approves while the first one is typing.
    h.lifecycle.approve(post.id, MODERATOR).await.unwrap();

    let err = h
        .lifecycle
        .complete_decision(gate, "Please add a photo")
        .await
        .unwrap_err();
    assert_matches!(core(&err), CoreError::StaleDecision { .. });
    assert_eq!(ModerationQueue::history(&pool, post.id).await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn concurrent_decisions_apply_at_most_once(pool: PgPool) {
    let h = harness(&pool);
    let author = user(&pool, 1).await;
    let msk = city(&pool, "Moscow").await;
    let games = category(&pool, "games").await;
    let post = h
        .lifecycle
        .submit(draft(author, &[msk], &[games]), Utc::now())
        .await
        .unwrap();

    let (approved, rejected) = tokio::join!(
        h.lifecycle.approve(post.id, MODERATOR),
        h.lifecycle.reject(post.id, MODERATOR, "Duplicate of another event"),
    );

    let outcomes = [approved, rejected];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    let loser = outcomes.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert_matches!(core(loser), CoreError::StaleDecision { .. });
    assert_eq!(ModerationQueue::history(&pool, post.id).await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn only_moderators_decide(pool: PgPool) {
    let h = harness(&pool);
    let author = user(&pool, 1).await;
    let msk = city(&pool, "Moscow").await;
    let games = category(&pool, "games").await;
    let post = h
        .lifecycle
        .submit(draft(author, &[msk], &[games]), Utc::now())
        .await
        .unwrap();

    let err = h.lifecycle.approve(post.id, author).await.unwrap_err();
    assert_matches!(core(&err), CoreError::Forbidden(_));

    let err = h.lifecycle.approve(post.id + 1_000, MODERATOR).await.unwrap_err();
    assert_matches!(core(&err), CoreError::NotFound { .. });
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deletion_is_limited_to_author_or_moderator(pool: PgPool) {
    let h = harness(&pool);
    let author = user(&pool, 1).await;
    let stranger = user(&pool, 2).await;
    let msk = city(&pool, "Moscow").await;
    let games = category(&pool, "games").await;
    let post = h
        .lifecycle
        .submit(draft(author, &[msk], &[games]), Utc::now())
        .await
        .unwrap();
    h.lifecycle.approve(post.id, MODERATOR).await.unwrap();
    LikeRepo::toggle(&pool, stranger, post.id).await.unwrap();

    let err = h.lifecycle.delete(post.id, stranger).await.unwrap_err();
    assert_matches!(core(&err), CoreError::Forbidden(_));

    h.lifecycle.delete(post.id, author).await.unwrap();
    assert!(PostRepo::find_by_id(&pool, post.id).await.unwrap().is_none());
    assert_eq!(LikeRepo::count_for_post(&pool, post.id).await.unwrap(), 0);
    assert!(ModerationQueue::history(&pool, post.id).await.unwrap().is_empty());

    let err = h.lifecycle.delete(post.id, author).await.unwrap_err();
    assert_matches!(core(&err), CoreError::NotFound { .. });
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn queue_pages_in_submission_order_and_history_is_filterable(pool: PgPool) {
    let h = harness(&pool);
    let author = user(&pool, 1).await;
    let msk = city(&pool, "Moscow").await;
    let games = category(&pool, "games").await;
    let mut ids = Vec::new();
    for _ in 0..3 {
        let post = h
            .lifecycle
            .submit(draft(author, &[msk], &[games]), Utc::now())
            .await
            .unwrap();
        ids.push(post.id);
    }

    let last = ModerationQueue::page(&pool, 9, 2).await.unwrap();
    assert_eq!((last.page, last.total_pages, last.total), (1, 2, 3));
    assert_eq!(last.posts[0].post.id, ids[2]);

    h.lifecycle.approve(ids[0], MODERATOR).await.unwrap();
    h.lifecycle.reject(ids[1], MODERATOR, "Wrong city").await.unwrap();

    let queue = ModerationQueue::queue(&pool).await.unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].post.id, ids[2]);

    let by_moderator = ModerationQueue::by_moderator(&pool, MODERATOR, 10, 0).await.unwrap();
    assert_eq!(by_moderator.len(), 2);
    let rejected = ModerationQueue::by_action(&pool, ModerationAction::Reject, 10, 0)
        .await
        .unwrap();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].post_id, ids[1]);
}
