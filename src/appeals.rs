//! Appeal filing and resolution.
//!
//! An appeal carries its target kind from the moment it is filed, and
//! resolution dispatches on that stored kind alone — content appeals go
//! through the decision engine's restore path, account appeals through the
//! ban manager. Each appeal resolves exactly once.

use crate::constants::APPEAL_REASON_MIN;
use crate::error::ModerationError;
use crate::moderation::{self, ContentKind, CONTENT_KIND_USER};
use crate::orm::{appeals, users};
use crate::rate_limit;
use crate::trust::{self, BanStatus};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{entity::*, query::*, ActiveValue::Set, DatabaseConnection};

// Appeal statuses
pub const APPEAL_OPEN: &str = "open";
pub const APPEAL_APPROVED: &str = "approved";
pub const APPEAL_REJECTED: &str = "rejected";

/// Target kind string for account appeals.
pub const TARGET_ACCOUNT: &str = "account";

/// What an appeal may contest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppealTarget {
    Content(ContentKind),
    Account,
}

impl AppealTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            AppealTarget::Content(kind) => kind.as_str(),
            AppealTarget::Account => TARGET_ACCOUNT,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            TARGET_ACCOUNT => Some(AppealTarget::Account),
            other => ContentKind::parse(other).map(AppealTarget::Content),
        }
    }

    /// Kind tag used for moderation log rows about this target.
    fn log_kind(self) -> &'static str {
        match self {
            AppealTarget::Content(kind) => kind.as_str(),
            AppealTarget::Account => CONTENT_KIND_USER,
        }
    }
}

/// File an appeal against a rejection or a ban.
///
/// Allowed only while the target is in a negative terminal state, only by
/// the owner, and with at most one open appeal per target at a time.
pub async fn file_appeal(
    db: &DatabaseConnection,
    appellant_id: i32,
    target_kind: &str,
    target_id: i32,
    reason: &str,
) -> Result<appeals::Model, ModerationError> {
    let target = AppealTarget::parse(target_kind).ok_or_else(|| {
        ModerationError::Validation(format!("Invalid appeal target kind: {}", target_kind))
    })?;

    let reason = reason.trim();
    if reason.chars().count() < APPEAL_REASON_MIN {
        return Err(ModerationError::Validation(format!(
            "Appeal reason must be at least {} characters",
            APPEAL_REASON_MIN
        )));
    }

    rate_limit::check_appeal_rate_limit(appellant_id)?;

    match target {
        AppealTarget::Content(kind) => {
            let content = moderation::find_content(db, kind, target_id)
                .await?
                .ok_or(ModerationError::NotFound("Content"))?;

            if content.author_id() != appellant_id {
                return Err(ModerationError::Forbidden(
                    "Only the author may appeal this content".to_string(),
                ));
            }
            if content.moderation_status() != moderation::STATUS_REJECTED {
                return Err(ModerationError::Validation(
                    "Only rejected content can be appealed".to_string(),
                ));
            }
        }
        AppealTarget::Account => {
            if target_id != appellant_id {
                return Err(ModerationError::Forbidden(
                    "Only the account owner may appeal a ban".to_string(),
                ));
            }

            let user = users::Entity::find_by_id(target_id)
                .one(db)
                .await?
                .ok_or(ModerationError::NotFound("User"))?;

            if !BanStatus::of_user(&user, Utc::now().naive_utc()).banned {
                return Err(ModerationError::Validation(
                    "Account is not banned".to_string(),
                ));
            }
        }
    }

    let open = appeals::Entity::find()
        .filter(appeals::Column::TargetKind.eq(target_kind))
        .filter(appeals::Column::TargetId.eq(target_id))
        .filter(appeals::Column::Status.eq(APPEAL_OPEN))
        .one(db)
        .await?;

    if open.is_some() {
        return Err(ModerationError::Conflict(
            "An appeal for this target is already open".to_string(),
        ));
    }

    let appeal = appeals::ActiveModel {
        target_kind: Set(target_kind.to_string()),
        target_id: Set(target_id),
        appellant_id: Set(appellant_id),
        reason: Set(reason.to_string()),
        status: Set(APPEAL_OPEN.to_string()),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    moderation::log_action(
        db,
        appellant_id,
        None,
        target.log_kind(),
        target_id,
        moderation::ACTION_APPEAL_SUBMITTED,
        reason,
        None,
        None,
    )
    .await?;

    log::info!(
        "Appeal {} filed by user {} for {} {}",
        appeal.id,
        appellant_id,
        target_kind,
        target_id
    );

    Ok(appeal)
}

/// Open appeals, newest first.
pub async fn list_open_appeals(
    db: &DatabaseConnection,
    page: u64,
    limit: u64,
) -> Result<(Vec<appeals::Model>, usize), ModerationError> {
    let query = appeals::Entity::find().filter(appeals::Column::Status.eq(APPEAL_OPEN));

    let total = query.clone().count(db).await?;

    let items = query
        .order_by_desc(appeals::Column::CreatedAt)
        .offset((page - 1) * limit)
        .limit(limit)
        .all(db)
        .await?;

    Ok((items, total))
}

/// Resolve an open appeal.
///
/// decision = "approve": content targets flip back to approved and the
/// author gets restitution; account targets are unbanned. decision =
/// "reject": the appeal closes and the underlying state is untouched.
pub async fn resolve_appeal(
    db: &DatabaseConnection,
    appeal_id: i32,
    moderator_id: i32,
    decision: &str,
    notes: Option<&str>,
) -> Result<(), ModerationError> {
    let approve = match decision {
        "approve" => true,
        "reject" => false,
        other => {
            return Err(ModerationError::Validation(format!(
                "Invalid decision: {} (expected approve or reject)",
                other
            )))
        }
    };

    let appeal = appeals::Entity::find_by_id(appeal_id)
        .one(db)
        .await?
        .ok_or(ModerationError::NotFound("Appeal"))?;

    if appeal.status != APPEAL_OPEN {
        return Err(ModerationError::Conflict(format!(
            "Appeal is already {}",
            appeal.status
        )));
    }

    let target = AppealTarget::parse(&appeal.target_kind).ok_or_else(|| {
        ModerationError::Validation(format!("Invalid appeal target kind: {}", appeal.target_kind))
    })?;

    // An approval must still have something to reverse.
    if approve {
        match target {
            AppealTarget::Content(kind) => {
                let content = moderation::find_content(db, kind, appeal.target_id)
                    .await?
                    .ok_or(ModerationError::NotFound("Content"))?;
                if content.moderation_status() != moderation::STATUS_REJECTED {
                    return Err(ModerationError::Conflict(
                        "Target content is no longer rejected".to_string(),
                    ));
                }
            }
            AppealTarget::Account => {
                let user = users::Entity::find_by_id(appeal.target_id)
                    .one(db)
                    .await?
                    .ok_or(ModerationError::NotFound("User"))?;
                if !user.is_banned {
                    return Err(ModerationError::Conflict(
                        "Target account is not banned".to_string(),
                    ));
                }
            }
        }
    }

    // Claim the appeal before applying side effects, so a racing moderator
    // gets a conflict instead of doubled effects.
    let now = Utc::now().naive_utc();
    let new_status = if approve {
        APPEAL_APPROVED
    } else {
        APPEAL_REJECTED
    };

    let result = appeals::Entity::update_many()
        .col_expr(appeals::Column::Status, Expr::value(new_status))
        .col_expr(
            appeals::Column::ResolutionNotes,
            Expr::value(notes.map(|n| n.to_string())),
        )
        .col_expr(appeals::Column::ResolvedBy, Expr::value(Some(moderator_id)))
        .col_expr(appeals::Column::ResolvedAt, Expr::value(Some(now)))
        .filter(appeals::Column::Id.eq(appeal_id))
        .filter(appeals::Column::Status.eq(APPEAL_OPEN))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(ModerationError::Conflict(
            "Appeal was already resolved by another moderator".to_string(),
        ));
    }

    if approve {
        match target {
            AppealTarget::Content(kind) => {
                let content =
                    moderation::restore_content(db, kind, appeal.target_id, moderator_id).await?;
                trust::restitution(db, content.author_id()).await?;
            }
            AppealTarget::Account => {
                trust::unban(db, appeal.target_id, Some(moderator_id)).await?;
            }
        }
    }

    let (action, reason) = if approve {
        (moderation::ACTION_APPEAL_APPROVED, "Appeal approved")
    } else {
        (moderation::ACTION_APPEAL_REJECTED, "Appeal rejected")
    };

    moderation::log_action(
        db,
        appeal.appellant_id,
        Some(moderator_id),
        target.log_kind(),
        appeal.target_id,
        action,
        reason,
        notes,
        if approve && matches!(target, AppealTarget::Content(_)) {
            Some(crate::constants::TRUST_RESTITUTION)
        } else {
            None
        },
    )
    .await?;

    log::info!(
        "Appeal {} {} by moderator {}",
        appeal_id,
        new_status,
        moderator_id
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appeal_target_parse() {
        assert_eq!(
            AppealTarget::parse("post"),
            Some(AppealTarget::Content(ContentKind::Post))
        );
        assert_eq!(
            AppealTarget::parse("comment"),
            Some(AppealTarget::Content(ContentKind::Comment))
        );
        assert_eq!(AppealTarget::parse("account"), Some(AppealTarget::Account));
        // The source's "resolve as post when unsure" fallback is gone:
        // unknown kinds never parse.
        assert_eq!(AppealTarget::parse("user"), None);
        assert_eq!(AppealTarget::parse(""), None);
    }

    #[test]
    fn test_account_appeals_log_under_user_kind() {
        assert_eq!(AppealTarget::Account.log_kind(), "user");
        assert_eq!(AppealTarget::Content(ContentKind::Post).log_kind(), "post");
    }
}
