//! Integration tests for appeal filing and resolution.
mod common;

use common::{database::*, fixtures::*};
use gatehouse::appeals;
use gatehouse::error::ModerationError;
use gatehouse::moderation::{self, ContentKind};
use gatehouse::orm::{appeals as appeals_orm, posts};
use gatehouse::trust;
use sea_orm::entity::*;

#[actix_rt::test]
async fn test_rejection_appeal_approved_restores_content() {
    let db = setup_test_database().await.expect("db setup");
    let author = create_member(&db, "ap_restore_author").await.unwrap();
    let moderator = create_moderator(&db, "ap_restore_mod").await.unwrap();

    // A moderator rejects the post, which makes it appealable.
    let post = create_test_post(&db, author.id, "Not spam, honestly.", "pending")
        .await
        .unwrap();
    moderation::reject_content(&db, ContentKind::Post, post.id, moderator.id, "spam", None, false)
        .await
        .unwrap();

    let author_after_rejection = reload_user(&db, author.id).await.unwrap();
    assert_eq!(author_after_rejection.violations, 1);

    let appeal = appeals::file_appeal(
        &db,
        author.id,
        "post",
        post.id,
        "This was flagged as spam but it is a genuine question.",
    )
    .await
    .expect("appeal should file");
    assert_eq!(appeal.status, "open");

    appeals::resolve_appeal(&db, appeal.id, moderator.id, "approve", Some("agreed"))
        .await
        .expect("resolution should succeed");

    // Content is restored.
    let post = posts::Entity::find_by_id(post.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(post.moderation_status, "approved");

    // Appeal is closed.
    let appeal = appeals_orm::Entity::find_by_id(appeal.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(appeal.status, "approved");
    assert_eq!(appeal.resolved_by, Some(moderator.id));
    assert!(appeal.resolved_at.is_some());

    // The author's standing is restored: violation removed, trust bumped.
    let author = reload_user(&db, author.id).await.unwrap();
    assert_eq!(author.violations, 0);
    assert_eq!(author.trust_score, 65);
}

#[actix_rt::test]
async fn test_second_resolution_is_a_conflict() {
    let db = setup_test_database().await.expect("db setup");
    let author = create_member(&db, "ap_double_author").await.unwrap();
    let moderator = create_moderator(&db, "ap_double_mod").await.unwrap();

    let post = create_test_post(&db, author.id, "Rejected once.", "rejected")
        .await
        .unwrap();
    let appeal = appeals::file_appeal(
        &db,
        author.id,
        "post",
        post.id,
        "Please take another look at this one.",
    )
    .await
    .unwrap();

    appeals::resolve_appeal(&db, appeal.id, moderator.id, "approve", None)
        .await
        .unwrap();

    let again = appeals::resolve_appeal(&db, appeal.id, moderator.id, "reject", None).await;
    assert!(matches!(again, Err(ModerationError::Conflict(_))));
}

#[actix_rt::test]
async fn test_ban_appeal_rejected_keeps_the_ban() {
    let db = setup_test_database().await.expect("db setup");
    let moderator = create_moderator(&db, "ap_ban_mod").await.unwrap();
    let user = create_member(&db, "ap_ban_user").await.unwrap();

    trust::ban(&db, user.id, Some(moderator.id), "harassment", 1)
        .await
        .unwrap();

    let appeal = appeals::file_appeal(
        &db,
        user.id,
        "account",
        user.id,
        "I believe this ban was a misunderstanding.",
    )
    .await
    .expect("banned user can appeal their own account");

    appeals::resolve_appeal(&db, appeal.id, moderator.id, "reject", Some("reviewed the logs"))
        .await
        .unwrap();

    // The ban stands; only the appeal closed.
    let user = reload_user(&db, user.id).await.unwrap();
    assert!(user.is_banned);

    let appeal = appeals_orm::Entity::find_by_id(appeal.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(appeal.status, "rejected");
}

#[actix_rt::test]
async fn test_ban_appeal_approved_unbans() {
    let db = setup_test_database().await.expect("db setup");
    let moderator = create_moderator(&db, "ap_unban_mod").await.unwrap();
    let user = create_member(&db, "ap_unban_user").await.unwrap();

    trust::ban(&db, user.id, Some(moderator.id), "mistaken identity", 0)
        .await
        .unwrap();

    let appeal = appeals::file_appeal(
        &db,
        user.id,
        "account",
        user.id,
        "You banned the wrong account entirely.",
    )
    .await
    .unwrap();

    appeals::resolve_appeal(&db, appeal.id, moderator.id, "approve", None)
        .await
        .unwrap();

    let user = reload_user(&db, user.id).await.unwrap();
    assert!(!user.is_banned);
    assert!(user.banned_reason.is_none());
    assert!(user.banned_until.is_none());
}

#[actix_rt::test]
async fn test_appeal_requires_negative_terminal_state() {
    let db = setup_test_database().await.expect("db setup");
    let author = create_member(&db, "ap_state_author").await.unwrap();

    // Approved content cannot be appealed.
    let live = create_test_post(&db, author.id, "Published and fine.", "approved")
        .await
        .unwrap();
    let result = appeals::file_appeal(
        &db,
        author.id,
        "post",
        live.id,
        "Appealing something that is not rejected.",
    )
    .await;
    assert!(matches!(result, Err(ModerationError::Validation(_))));

    // Neither can a healthy account.
    let result = appeals::file_appeal(
        &db,
        author.id,
        "account",
        author.id,
        "Appealing a ban that does not exist.",
    )
    .await;
    assert!(matches!(result, Err(ModerationError::Validation(_))));
}

#[actix_rt::test]
async fn test_only_the_owner_may_appeal() {
    let db = setup_test_database().await.expect("db setup");
    let author = create_member(&db, "ap_owner_author").await.unwrap();
    let stranger = create_member(&db, "ap_owner_stranger").await.unwrap();

    let post = create_test_post(&db, author.id, "Someone else's post.", "rejected")
        .await
        .unwrap();

    let result = appeals::file_appeal(
        &db,
        stranger.id,
        "post",
        post.id,
        "Appealing on behalf of someone else.",
    )
    .await;
    assert!(matches!(result, Err(ModerationError::Forbidden(_))));

    // Account appeals are similarly self-only.
    let banned = create_banned_test_user(&db, "ap_owner_banned", "spam", true, None)
        .await
        .unwrap();
    let result = appeals::file_appeal(
        &db,
        stranger.id,
        "account",
        banned.id,
        "Appealing a stranger's account ban.",
    )
    .await;
    assert!(matches!(result, Err(ModerationError::Forbidden(_))));
}

#[actix_rt::test]
async fn test_one_open_appeal_per_target() {
    let db = setup_test_database().await.expect("db setup");
    let author = create_member(&db, "ap_single_author").await.unwrap();

    let post = create_test_post(&db, author.id, "Rejected and contested.", "rejected")
        .await
        .unwrap();

    appeals::file_appeal(&db, author.id, "post", post.id, "First appeal, still open.")
        .await
        .unwrap();

    let second = appeals::file_appeal(
        &db,
        author.id,
        "post",
        post.id,
        "Second appeal while the first is open.",
    )
    .await;
    assert!(matches!(second, Err(ModerationError::Conflict(_))));
}

#[actix_rt::test]
async fn test_appeal_reason_minimum_length() {
    let db = setup_test_database().await.expect("db setup");
    let author = create_member(&db, "ap_reason_author").await.unwrap();
    let post = create_test_post(&db, author.id, "Rejected.", "rejected")
        .await
        .unwrap();

    let result = appeals::file_appeal(&db, author.id, "post", post.id, "unfair").await;
    assert!(matches!(result, Err(ModerationError::Validation(_))));
}

#[actix_rt::test]
async fn test_unknown_target_kind_never_parses() {
    let db = setup_test_database().await.expect("db setup");
    let author = create_member(&db, "ap_kind_author").await.unwrap();

    let result = appeals::file_appeal(
        &db,
        author.id,
        "thread",
        1,
        "Appealing a kind this system does not know.",
    )
    .await;
    assert!(matches!(result, Err(ModerationError::Validation(_))));
}
