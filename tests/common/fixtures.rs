//! Test fixtures for creating test data
#![allow(dead_code)]

use chrono::Utc;
use gatehouse::orm::{comments, posts, sessions, users};
use rand::{distributions::Alphanumeric, Rng};
use sea_orm::{entity::*, ActiveValue::Set, DatabaseConnection, DbErr};
use std::sync::atomic::{AtomicI32, Ordering};

/// Process-wide unique user ids. The author-profile cache and the rate
/// limiter are keyed by user id and shared across every test in a binary,
/// so ids must never repeat between test databases.
static NEXT_USER_ID: AtomicI32 = AtomicI32::new(10_000);

pub fn unique_user_id() -> i32 {
    NEXT_USER_ID.fetch_add(1, Ordering::SeqCst)
}

/// Create a test user with the given role and trust score.
pub async fn create_test_user(
    db: &DatabaseConnection,
    name: &str,
    role: &str,
    trust_score: i32,
) -> Result<users::Model, DbErr> {
    let now = Utc::now().naive_utc();
    // Backdate creation so the gate does not treat fixtures as new accounts.
    let created_at = now - chrono::Duration::days(60);

    users::ActiveModel {
        id: Set(unique_user_id()),
        name: Set(name.to_string()),
        email: Set(Some(format!("{}@test.com", name))),
        role: Set(role.to_string()),
        trust_score: Set(trust_score),
        violations: Set(0),
        report_count: Set(0),
        is_banned: Set(false),
        banned_reason: Set(None),
        banned_until: Set(None),
        created_at: Set(created_at),
        updated_at: Set(now),
    }
    .insert(db)
    .await
}

/// Create a member with default trust.
pub async fn create_member(db: &DatabaseConnection, name: &str) -> Result<users::Model, DbErr> {
    create_test_user(db, name, "member", 70).await
}

/// Create a moderator.
pub async fn create_moderator(db: &DatabaseConnection, name: &str) -> Result<users::Model, DbErr> {
    create_test_user(db, name, "moderator", 90).await
}

/// Create a user whose account is younger than the new-account window.
pub async fn create_new_account(
    db: &DatabaseConnection,
    name: &str,
) -> Result<users::Model, DbErr> {
    let now = Utc::now().naive_utc();
    users::ActiveModel {
        id: Set(unique_user_id()),
        name: Set(name.to_string()),
        email: Set(Some(format!("{}@test.com", name))),
        role: Set("member".to_string()),
        trust_score: Set(70),
        violations: Set(0),
        report_count: Set(0),
        is_banned: Set(false),
        banned_reason: Set(None),
        banned_until: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
}

/// Create a banned test user (permanent or timed).
pub async fn create_banned_test_user(
    db: &DatabaseConnection,
    name: &str,
    ban_reason: &str,
    is_permanent: bool,
    minutes_until_unban: Option<i64>,
) -> Result<users::Model, DbErr> {
    let now = Utc::now().naive_utc();
    let banned_until = if is_permanent {
        None
    } else {
        Some(now + chrono::Duration::minutes(minutes_until_unban.unwrap_or(60)))
    };

    users::ActiveModel {
        id: Set(unique_user_id()),
        name: Set(name.to_string()),
        email: Set(Some(format!("{}@test.com", name))),
        role: Set("member".to_string()),
        trust_score: Set(40),
        violations: Set(3),
        report_count: Set(0),
        is_banned: Set(true),
        banned_reason: Set(Some(ban_reason.to_string())),
        banned_until: Set(banned_until),
        created_at: Set(now - chrono::Duration::days(60)),
        updated_at: Set(now),
    }
    .insert(db)
    .await
}

/// Create a bearer session for a user. Returns the plain token.
pub async fn create_session(db: &DatabaseConnection, user_id: i32) -> Result<String, DbErr> {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect();
    let now = Utc::now().naive_utc();

    sessions::ActiveModel {
        user_id: Set(user_id),
        token_hash: Set(blake3::hash(token.as_bytes()).to_string()),
        expires_at: Set(now + chrono::Duration::days(1)),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(token)
}

/// Create a post in the given moderation status.
pub async fn create_test_post(
    db: &DatabaseConnection,
    user_id: i32,
    body: &str,
    moderation_status: &str,
) -> Result<posts::Model, DbErr> {
    let now = Utc::now().naive_utc();
    posts::ActiveModel {
        user_id: Set(user_id),
        body: Set(body.to_string()),
        media: Set(None),
        visibility: Set("public".to_string()),
        moderation_status: Set(moderation_status.to_string()),
        moderation_reason: Set(None),
        profanity_score: Set(0),
        nsfw_score: Set(0),
        auto_moderated: Set(true),
        was_published: Set(false),
        reviewed_by: Set(None),
        reviewed_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Create a pending post with a nonzero profanity score, as the gate would
/// after a borderline scorer verdict.
pub async fn create_flagged_post(
    db: &DatabaseConnection,
    user_id: i32,
    body: &str,
    profanity_score: i32,
) -> Result<posts::Model, DbErr> {
    let now = Utc::now().naive_utc();
    posts::ActiveModel {
        user_id: Set(user_id),
        body: Set(body.to_string()),
        media: Set(None),
        visibility: Set("public".to_string()),
        moderation_status: Set("pending".to_string()),
        moderation_reason: Set(Some("Held for moderator review".to_string())),
        profanity_score: Set(profanity_score),
        nsfw_score: Set(0),
        auto_moderated: Set(true),
        was_published: Set(false),
        reviewed_by: Set(None),
        reviewed_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Create a comment in the given moderation status.
pub async fn create_test_comment(
    db: &DatabaseConnection,
    post_id: i32,
    user_id: i32,
    body: &str,
    moderation_status: &str,
) -> Result<comments::Model, DbErr> {
    let now = Utc::now().naive_utc();
    comments::ActiveModel {
        post_id: Set(post_id),
        user_id: Set(user_id),
        body: Set(body.to_string()),
        moderation_status: Set(moderation_status.to_string()),
        moderation_reason: Set(None),
        profanity_score: Set(0),
        nsfw_score: Set(0),
        auto_moderated: Set(true),
        was_published: Set(false),
        reviewed_by: Set(None),
        reviewed_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Fetch a user fresh from the database.
pub async fn reload_user(db: &DatabaseConnection, user_id: i32) -> Result<users::Model, DbErr> {
    users::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound("User not found".to_string()))
}
