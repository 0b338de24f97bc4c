//! Decision engine and moderation queue.
//!
//! All terminal transitions here are guarded: the expected pre-state rides
//! in the UPDATE's WHERE clause, and zero affected rows means another
//! moderator got there first — surfaced as a conflict, with no log row or
//! trust change applied.

use crate::error::ModerationError;
use crate::orm::{comments, moderation_log, posts, users};
use crate::trust::{self, Severity};
use crate::{constants::QUEUE_LIMIT_MAX, screen};
use chrono::{NaiveDateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{entity::*, query::*, ActiveValue::Set, DatabaseConnection, DbErr};

// Content moderation statuses
pub const STATUS_PENDING: &str = "pending";
pub const STATUS_APPROVED: &str = "approved";
pub const STATUS_REJECTED: &str = "rejected";

// Log actions. The log is append-only; these strings are its vocabulary.
pub const ACTION_AUTO_APPROVED: &str = "auto_approved";
pub const ACTION_AUTO_REJECTED: &str = "auto_rejected";
pub const ACTION_PENDING_REVIEW: &str = "pending_review";
pub const ACTION_MODERATOR_APPROVED: &str = "moderator_approved";
pub const ACTION_MODERATOR_REJECTED: &str = "moderator_rejected";
pub const ACTION_DELETED_BY_REPORT: &str = "deleted_by_report";
pub const ACTION_REPORT_DISMISSED: &str = "report_dismissed";
pub const ACTION_APPEAL_SUBMITTED: &str = "appeal_submitted";
pub const ACTION_APPEAL_APPROVED: &str = "appeal_approved";
pub const ACTION_APPEAL_REJECTED: &str = "appeal_rejected";
pub const ACTION_USER_BANNED: &str = "user_banned";
pub const ACTION_USER_UNBANNED: &str = "user_unbanned";
pub const ACTION_USER_WARNED: &str = "user_warned";

/// Log/report rows about users carry this kind tag.
pub const CONTENT_KIND_USER: &str = "user";

/// Kind of moderated content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Post,
    Comment,
}

impl ContentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Post => "post",
            ContentKind::Comment => "comment",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "post" => Some(ContentKind::Post),
            "comment" => Some(ContentKind::Comment),
            _ => None,
        }
    }
}

/// A moderated item of either kind, with uniform accessors so callers do
/// not need to be generic over the two entities.
#[derive(Debug, Clone)]
pub enum ContentModel {
    Post(posts::Model),
    Comment(comments::Model),
}

impl ContentModel {
    pub fn kind(&self) -> ContentKind {
        match self {
            ContentModel::Post(_) => ContentKind::Post,
            ContentModel::Comment(_) => ContentKind::Comment,
        }
    }

    pub fn id(&self) -> i32 {
        match self {
            ContentModel::Post(m) => m.id,
            ContentModel::Comment(m) => m.id,
        }
    }

    pub fn author_id(&self) -> i32 {
        match self {
            ContentModel::Post(m) => m.user_id,
            ContentModel::Comment(m) => m.user_id,
        }
    }

    pub fn body(&self) -> &str {
        match self {
            ContentModel::Post(m) => &m.body,
            ContentModel::Comment(m) => &m.body,
        }
    }

    pub fn moderation_status(&self) -> &str {
        match self {
            ContentModel::Post(m) => &m.moderation_status,
            ContentModel::Comment(m) => &m.moderation_status,
        }
    }

    pub fn moderation_reason(&self) -> Option<&str> {
        match self {
            ContentModel::Post(m) => m.moderation_reason.as_deref(),
            ContentModel::Comment(m) => m.moderation_reason.as_deref(),
        }
    }

    pub fn profanity_score(&self) -> i32 {
        match self {
            ContentModel::Post(m) => m.profanity_score,
            ContentModel::Comment(m) => m.profanity_score,
        }
    }

    pub fn nsfw_score(&self) -> i32 {
        match self {
            ContentModel::Post(m) => m.nsfw_score,
            ContentModel::Comment(m) => m.nsfw_score,
        }
    }

    pub fn created_at(&self) -> NaiveDateTime {
        match self {
            ContentModel::Post(m) => m.created_at,
            ContentModel::Comment(m) => m.created_at,
        }
    }
}

/// Look up a moderated item by kind and id.
pub async fn find_content(
    db: &DatabaseConnection,
    kind: ContentKind,
    id: i32,
) -> Result<Option<ContentModel>, DbErr> {
    Ok(match kind {
        ContentKind::Post => posts::Entity::find_by_id(id)
            .one(db)
            .await?
            .map(ContentModel::Post),
        ContentKind::Comment => comments::Entity::find_by_id(id)
            .one(db)
            .await?
            .map(ContentModel::Comment),
    })
}

/// Append a moderation log entry. Never updated, never deleted.
#[allow(clippy::too_many_arguments)]
pub async fn log_action(
    db: &DatabaseConnection,
    user_id: i32,
    moderator_id: Option<i32>,
    content_kind: &str,
    content_id: i32,
    action: &str,
    reason: &str,
    notes: Option<&str>,
    trust_score_change: Option<i32>,
) -> Result<(), DbErr> {
    let entry = moderation_log::ActiveModel {
        user_id: Set(user_id),
        moderator_id: Set(moderator_id),
        content_kind: Set(content_kind.to_string()),
        content_id: Set(content_id),
        action: Set(action.to_string()),
        reason: Set(reason.to_string()),
        notes: Set(notes.map(|n| n.to_string())),
        trust_score_change: Set(trust_score_change),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };
    entry.insert(db).await?;

    Ok(())
}

/// Guarded status flip shared by every decision path. The `expected` status
/// is part of the WHERE clause; returns whether a row was actually updated.
async fn transition_status(
    db: &DatabaseConnection,
    kind: ContentKind,
    id: i32,
    expected: &str,
    new_status: &str,
    reason: Option<&str>,
    reviewer: Option<i32>,
    mark_published: bool,
) -> Result<bool, DbErr> {
    let now = Utc::now().naive_utc();

    let rows_affected = match kind {
        ContentKind::Post => {
            let mut update = posts::Entity::update_many()
                .col_expr(posts::Column::ModerationStatus, Expr::value(new_status))
                .col_expr(
                    posts::Column::ModerationReason,
                    Expr::value(reason.map(|r| r.to_string())),
                )
                .col_expr(posts::Column::ReviewedBy, Expr::value(reviewer))
                .col_expr(posts::Column::ReviewedAt, Expr::value(Some(now)))
                .col_expr(posts::Column::AutoModerated, Expr::value(reviewer.is_none()))
                .col_expr(posts::Column::UpdatedAt, Expr::value(now))
                .filter(posts::Column::Id.eq(id))
                .filter(posts::Column::ModerationStatus.eq(expected));
            if mark_published {
                update = update.col_expr(posts::Column::WasPublished, Expr::value(true));
            }
            update.exec(db).await?.rows_affected
        }
        ContentKind::Comment => {
            let mut update = comments::Entity::update_many()
                .col_expr(comments::Column::ModerationStatus, Expr::value(new_status))
                .col_expr(
                    comments::Column::ModerationReason,
                    Expr::value(reason.map(|r| r.to_string())),
                )
                .col_expr(comments::Column::ReviewedBy, Expr::value(reviewer))
                .col_expr(comments::Column::ReviewedAt, Expr::value(Some(now)))
                .col_expr(
                    comments::Column::AutoModerated,
                    Expr::value(reviewer.is_none()),
                )
                .col_expr(comments::Column::UpdatedAt, Expr::value(now))
                .filter(comments::Column::Id.eq(id))
                .filter(comments::Column::ModerationStatus.eq(expected));
            if mark_published {
                update = update.col_expr(comments::Column::WasPublished, Expr::value(true));
            }
            update.exec(db).await?.rows_affected
        }
    };

    Ok(rows_affected > 0)
}

/// Moderator approval of a pending item.
pub async fn approve_content(
    db: &DatabaseConnection,
    kind: ContentKind,
    id: i32,
    moderator_id: i32,
    notes: Option<&str>,
) -> Result<(), ModerationError> {
    let content = find_content(db, kind, id)
        .await?
        .ok_or(ModerationError::NotFound("Content"))?;

    if content.moderation_status() != STATUS_PENDING {
        return Err(ModerationError::Conflict(format!(
            "Content is already {}",
            content.moderation_status()
        )));
    }

    let flipped = transition_status(
        db,
        kind,
        id,
        STATUS_PENDING,
        STATUS_APPROVED,
        None,
        Some(moderator_id),
        false,
    )
    .await?;

    if !flipped {
        return Err(ModerationError::Conflict(
            "Content was already resolved by another moderator".to_string(),
        ));
    }

    log_action(
        db,
        content.author_id(),
        Some(moderator_id),
        kind.as_str(),
        id,
        ACTION_MODERATOR_APPROVED,
        notes.unwrap_or("Approved by moderator"),
        notes,
        None,
    )
    .await?;

    // The scorer flagged it and a human disagreed: small restitution.
    if content.profanity_score() > 0 || content.nsfw_score() > 0 {
        trust::adjust_trust(db, content.author_id(), crate::constants::TRUST_RESTITUTION).await?;
    }

    screen::clear_recent_submissions(content.author_id());

    log::info!(
        "{} {} approved by moderator {}",
        kind.as_str(),
        id,
        moderator_id
    );

    Ok(())
}

/// Moderator rejection of a pending item. Records a moderate violation
/// against the author.
pub async fn reject_content(
    db: &DatabaseConnection,
    kind: ContentKind,
    id: i32,
    moderator_id: i32,
    reason: &str,
    notes: Option<&str>,
    auto_ban: bool,
) -> Result<(), ModerationError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(ModerationError::Validation(
            "Rejection reason is required".to_string(),
        ));
    }

    let content = find_content(db, kind, id)
        .await?
        .ok_or(ModerationError::NotFound("Content"))?;

    if content.moderation_status() != STATUS_PENDING {
        return Err(ModerationError::Conflict(format!(
            "Content is already {}",
            content.moderation_status()
        )));
    }

    let flipped = transition_status(
        db,
        kind,
        id,
        STATUS_PENDING,
        STATUS_REJECTED,
        Some(reason),
        Some(moderator_id),
        false,
    )
    .await?;

    if !flipped {
        return Err(ModerationError::Conflict(
            "Content was already resolved by another moderator".to_string(),
        ));
    }

    let outcome =
        trust::record_violation(db, content.author_id(), Severity::Moderate, auto_ban).await?;

    log_action(
        db,
        content.author_id(),
        Some(moderator_id),
        kind.as_str(),
        id,
        ACTION_MODERATOR_REJECTED,
        reason,
        notes,
        Some(Severity::Moderate.trust_delta()),
    )
    .await?;

    log::info!(
        "{} {} rejected by moderator {} (author violations: {})",
        kind.as_str(),
        id,
        moderator_id,
        outcome.violations
    );

    Ok(())
}

/// Report-triggered removal. Unlike a queue rejection this accepts content
/// that is already live; an `approved` pre-state marks `was_published`.
/// This is the only path that takes content out of `approved`.
pub async fn remove_by_report(
    db: &DatabaseConnection,
    kind: ContentKind,
    id: i32,
    moderator_id: i32,
    auto_ban: bool,
) -> Result<(), ModerationError> {
    let content = find_content(db, kind, id)
        .await?
        .ok_or(ModerationError::NotFound("Content"))?;

    let before = content.moderation_status().to_string();
    if before == STATUS_REJECTED {
        return Err(ModerationError::Conflict(
            "Content is already removed".to_string(),
        ));
    }

    let was_published = before == STATUS_APPROVED;
    let flipped = transition_status(
        db,
        kind,
        id,
        &before,
        STATUS_REJECTED,
        Some("Removed after report review"),
        Some(moderator_id),
        was_published,
    )
    .await?;

    if !flipped {
        return Err(ModerationError::Conflict(
            "Content was already resolved by another moderator".to_string(),
        ));
    }

    trust::record_violation(db, content.author_id(), Severity::Moderate, auto_ban).await?;

    log_action(
        db,
        content.author_id(),
        Some(moderator_id),
        kind.as_str(),
        id,
        ACTION_DELETED_BY_REPORT,
        "Removed after report review",
        None,
        Some(Severity::Moderate.trust_delta()),
    )
    .await?;

    Ok(())
}

/// Appeal-approved restoration: the one legal `rejected` → `approved`
/// transition.
pub async fn restore_content(
    db: &DatabaseConnection,
    kind: ContentKind,
    id: i32,
    resolver_id: i32,
) -> Result<ContentModel, ModerationError> {
    let content = find_content(db, kind, id)
        .await?
        .ok_or(ModerationError::NotFound("Content"))?;

    if content.moderation_status() != STATUS_REJECTED {
        return Err(ModerationError::Conflict(format!(
            "Content is {}, not rejected",
            content.moderation_status()
        )));
    }

    let flipped = transition_status(
        db,
        kind,
        id,
        STATUS_REJECTED,
        STATUS_APPROVED,
        None,
        Some(resolver_id),
        false,
    )
    .await?;

    if !flipped {
        return Err(ModerationError::Conflict(
            "Content was concurrently modified".to_string(),
        ));
    }

    Ok(content)
}

/// Clamp a queue page request to sane bounds. Pages are 1-based.
pub fn clamp_page(page: u64, limit: u64, default_limit: u64) -> (u64, u64) {
    let page = page.max(1);
    let limit = if limit == 0 { default_limit } else { limit }.min(QUEUE_LIMIT_MAX);
    (page, limit)
}

/// Pending posts, newest first.
pub async fn list_pending_posts(
    db: &DatabaseConnection,
    page: u64,
    limit: u64,
) -> Result<(Vec<posts::Model>, usize), DbErr> {
    let query = posts::Entity::find()
        .filter(posts::Column::ModerationStatus.eq(STATUS_PENDING));

    let total = query.clone().count(db).await?;

    let items = query
        .order_by_desc(posts::Column::CreatedAt)
        .offset((page - 1) * limit)
        .limit(limit)
        .all(db)
        .await?;

    Ok((items, total))
}

/// Pending comments, newest first.
pub async fn list_pending_comments(
    db: &DatabaseConnection,
    page: u64,
    limit: u64,
) -> Result<(Vec<comments::Model>, usize), DbErr> {
    let query = comments::Entity::find()
        .filter(comments::Column::ModerationStatus.eq(STATUS_PENDING));

    let total = query.clone().count(db).await?;

    let items = query
        .order_by_desc(comments::Column::CreatedAt)
        .offset((page - 1) * limit)
        .limit(limit)
        .all(db)
        .await?;

    Ok((items, total))
}

/// Everything a moderator needs on the review screen for one item.
#[derive(Debug)]
pub struct ReviewDetail {
    pub content: ContentModel,
    pub author: users::Model,
    /// Last 10 log entries about this item.
    pub logs: Vec<moderation_log::Model>,
    /// The author's last 5 rejections, for pattern context.
    pub author_recent_rejections: Vec<moderation_log::Model>,
}

pub async fn review_detail(
    db: &DatabaseConnection,
    kind: ContentKind,
    id: i32,
) -> Result<ReviewDetail, ModerationError> {
    let content = find_content(db, kind, id)
        .await?
        .ok_or(ModerationError::NotFound("Content"))?;

    let author = users::Entity::find_by_id(content.author_id())
        .one(db)
        .await?
        .ok_or(ModerationError::NotFound("User"))?;

    let logs = moderation_log::Entity::find()
        .filter(moderation_log::Column::ContentKind.eq(kind.as_str()))
        .filter(moderation_log::Column::ContentId.eq(id))
        .order_by_desc(moderation_log::Column::CreatedAt)
        .limit(10)
        .all(db)
        .await?;

    let author_recent_rejections = moderation_log::Entity::find()
        .filter(moderation_log::Column::UserId.eq(author.id))
        .filter(
            moderation_log::Column::Action
                .is_in([ACTION_AUTO_REJECTED, ACTION_MODERATOR_REJECTED]),
        )
        .order_by_desc(moderation_log::Column::CreatedAt)
        .limit(5)
        .all(db)
        .await?;

    Ok(ReviewDetail {
        content,
        author,
        logs,
        author_recent_rejections,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_kind_round_trip() {
        assert_eq!(ContentKind::parse("post"), Some(ContentKind::Post));
        assert_eq!(ContentKind::parse("comment"), Some(ContentKind::Comment));
        assert_eq!(ContentKind::parse("user"), None);
        assert_eq!(ContentKind::Post.as_str(), "post");
    }

    #[test]
    fn test_clamp_page() {
        assert_eq!(clamp_page(0, 0, 20), (1, 20));
        assert_eq!(clamp_page(3, 50, 20), (3, 50));
        assert_eq!(clamp_page(1, 5000, 20), (1, QUEUE_LIMIT_MAX));
    }
}
