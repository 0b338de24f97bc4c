//! Integration tests for the trust & ban manager.
mod common;

use chrono::Utc;
use common::{database::*, fixtures::*};
use gatehouse::error::ModerationError;
use gatehouse::orm::moderation_log;
use gatehouse::trust::{self, Severity};
use sea_orm::{entity::*, query::*};

#[actix_rt::test]
async fn test_permanent_ban_fields() {
    let db = setup_test_database().await.expect("db setup");
    let moderator = create_moderator(&db, "ban_perm_mod").await.unwrap();
    let user = create_member(&db, "ban_perm_user").await.unwrap();

    let status = trust::ban(&db, user.id, Some(moderator.id), "ban evasion", 0)
        .await
        .unwrap();
    assert!(status.permanent);

    let user = reload_user(&db, user.id).await.unwrap();
    assert!(user.is_banned);
    assert!(user.banned_until.is_none(), "permanent means NULL banned_until");
    assert_eq!(user.banned_reason.as_deref(), Some("ban evasion"));
}

#[actix_rt::test]
async fn test_timed_ban_expiry_is_set() {
    let db = setup_test_database().await.expect("db setup");
    let moderator = create_moderator(&db, "ban_timed_mod").await.unwrap();
    let user = create_member(&db, "ban_timed_user").await.unwrap();

    let before = Utc::now().naive_utc();
    trust::ban(&db, user.id, Some(moderator.id), "cool off", 7)
        .await
        .unwrap();

    let user = reload_user(&db, user.id).await.unwrap();
    let until = user.banned_until.expect("timed ban must set banned_until");

    let expected = before + chrono::Duration::days(7);
    let drift = (until - expected).num_seconds().abs();
    assert!(drift < 5, "banned_until should be about seven days out");
}

#[actix_rt::test]
async fn test_reban_updates_reason_and_duration() {
    let db = setup_test_database().await.expect("db setup");
    let moderator = create_moderator(&db, "ban_reban_mod").await.unwrap();
    let user = create_member(&db, "ban_reban_user").await.unwrap();

    trust::ban(&db, user.id, Some(moderator.id), "first offense", 1)
        .await
        .unwrap();
    // Banning again is not a conflict; it updates in place.
    trust::ban(&db, user.id, Some(moderator.id), "second look: permanent", 0)
        .await
        .unwrap();

    let user = reload_user(&db, user.id).await.unwrap();
    assert!(user.is_banned);
    assert!(user.banned_until.is_none());
    assert_eq!(user.banned_reason.as_deref(), Some("second look: permanent"));
}

#[actix_rt::test]
async fn test_unban_clears_all_fields_together() {
    let db = setup_test_database().await.expect("db setup");
    let moderator = create_moderator(&db, "ban_unban_mod").await.unwrap();
    let user = create_banned_test_user(&db, "ban_unban_user", "spam", false, Some(60))
        .await
        .unwrap();

    trust::unban(&db, user.id, Some(moderator.id)).await.unwrap();

    let user = reload_user(&db, user.id).await.unwrap();
    assert!(!user.is_banned);
    assert!(user.banned_reason.is_none());
    assert!(user.banned_until.is_none());
}

#[actix_rt::test]
async fn test_unban_of_unbanned_user_is_a_conflict() {
    let db = setup_test_database().await.expect("db setup");
    let moderator = create_moderator(&db, "ban_conflict_mod").await.unwrap();
    let user = create_member(&db, "ban_conflict_user").await.unwrap();

    let result = trust::unban(&db, user.id, Some(moderator.id)).await;
    assert!(matches!(result, Err(ModerationError::Conflict(_))));

    // Unknown user is not-found, not conflict.
    let result = trust::unban(&db, 777_777, Some(moderator.id)).await;
    assert!(matches!(result, Err(ModerationError::NotFound(_))));
}

#[actix_rt::test]
async fn test_ban_validations() {
    let db = setup_test_database().await.expect("db setup");
    let moderator = create_moderator(&db, "ban_valid_mod").await.unwrap();
    let user = create_member(&db, "ban_valid_user").await.unwrap();

    let result = trust::ban(&db, user.id, Some(moderator.id), "   ", 7).await;
    assert!(matches!(result, Err(ModerationError::Validation(_))));

    let result = trust::ban(&db, user.id, Some(moderator.id), "reason", -1).await;
    assert!(matches!(result, Err(ModerationError::Validation(_))));

    let user = reload_user(&db, user.id).await.unwrap();
    assert!(!user.is_banned, "failed validation must not mutate");
}

#[actix_rt::test]
async fn test_trust_score_never_leaves_bounds() {
    let db = setup_test_database().await.expect("db setup");
    let user = create_member(&db, "ban_bounds_user").await.unwrap();

    for _ in 0..30 {
        trust::adjust_trust(&db, user.id, -17).await.unwrap();
    }
    let low = reload_user(&db, user.id).await.unwrap();
    assert_eq!(low.trust_score, 0);

    for _ in 0..30 {
        trust::adjust_trust(&db, user.id, 23).await.unwrap();
    }
    let high = reload_user(&db, user.id).await.unwrap();
    assert_eq!(high.trust_score, 100);
}

#[actix_rt::test]
async fn test_violations_accumulate_into_auto_ban() {
    let db = setup_test_database().await.expect("db setup");
    // High trust so the violation count, not the score, triggers the rule.
    let user = create_test_user(&db, "ban_counter_user", "member", 100).await.unwrap();

    for i in 0..5 {
        let outcome = trust::record_violation(&db, user.id, Severity::Moderate, true)
            .await
            .unwrap();
        if i < 4 {
            assert!(!outcome.auto_banned, "too early to auto-ban at {}", i);
        } else {
            assert!(outcome.auto_banned, "fifth violation must auto-ban");
        }
    }

    let user = reload_user(&db, user.id).await.unwrap();
    assert!(user.is_banned);
    assert_eq!(user.violations, 5);

    // The automatic ban is logged with no moderator.
    let log = moderation_log::Entity::find()
        .filter(moderation_log::Column::UserId.eq(user.id))
        .filter(moderation_log::Column::Action.eq("user_banned"))
        .one(&db)
        .await
        .unwrap()
        .expect("auto-ban must be logged");
    assert!(log.moderator_id.is_none());
}

#[actix_rt::test]
async fn test_minor_violations_do_not_count() {
    let db = setup_test_database().await.expect("db setup");
    let user = create_member(&db, "ban_minor_user").await.unwrap();

    let outcome = trust::record_violation(&db, user.id, Severity::Minor, true)
        .await
        .unwrap();
    assert_eq!(outcome.trust_score, 65);
    assert_eq!(outcome.violations, 0);
}

#[actix_rt::test]
async fn test_warn_user_increments_and_logs() {
    let db = setup_test_database().await.expect("db setup");
    let moderator = create_moderator(&db, "ban_warn_mod").await.unwrap();
    let user = create_member(&db, "ban_warn_user").await.unwrap();

    let outcome = trust::warn(
        &db,
        user.id,
        moderator.id,
        "hostile tone",
        Some("Dial it back, please."),
        true,
    )
    .await
    .unwrap();
    assert_eq!(outcome.violations, 1);
    assert_eq!(outcome.trust_score, 60);

    let log = moderation_log::Entity::find()
        .filter(moderation_log::Column::UserId.eq(user.id))
        .filter(moderation_log::Column::Action.eq("user_warned"))
        .one(&db)
        .await
        .unwrap();
    assert!(log.is_some());

    // Staff cannot be warned.
    let result = trust::warn(&db, moderator.id, moderator.id, "reason", None, true).await;
    assert!(matches!(result, Err(ModerationError::Forbidden(_))));
}

#[actix_rt::test]
async fn test_ban_and_unban_are_logged() {
    let db = setup_test_database().await.expect("db setup");
    let moderator = create_moderator(&db, "ban_log_mod").await.unwrap();
    let user = create_member(&db, "ban_log_user").await.unwrap();

    trust::ban(&db, user.id, Some(moderator.id), "spam", 7)
        .await
        .unwrap();
    trust::unban(&db, user.id, Some(moderator.id)).await.unwrap();

    let actions: Vec<String> = moderation_log::Entity::find()
        .filter(moderation_log::Column::UserId.eq(user.id))
        .order_by_asc(moderation_log::Column::Id)
        .all(&db)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.action)
        .collect();

    assert_eq!(actions, vec!["user_banned".to_string(), "user_unbanned".to_string()]);
}
