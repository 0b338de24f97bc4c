//! Trust & Ban Manager.
//!
//! Owns the moderation columns on the user row: trust score, violation
//! counter and ban state. Nothing else writes them. Every mutation
//! invalidates the gate's profile cache so a fresh ban is enforced on the
//! very next submission.

use crate::cache;
use crate::constants::*;
use crate::error::ModerationError;
use crate::moderation::{self, CONTENT_KIND_USER};
use crate::orm::users;
use chrono::{Duration, NaiveDateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{entity::*, query::*, ActiveValue::Set, DatabaseConnection};

/// Violation severity, mapped to trust penalties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Severe,
    Moderate,
    Minor,
}

impl Severity {
    pub fn trust_delta(self) -> i32 {
        match self {
            Severity::Severe => TRUST_PENALTY_SEVERE,
            Severity::Moderate => TRUST_PENALTY_MODERATE,
            Severity::Minor => TRUST_PENALTY_MINOR,
        }
    }

    /// Minor findings dent the score but do not count as a violation.
    pub fn counts_as_violation(self) -> bool {
        !matches!(self, Severity::Minor)
    }
}

/// Evaluated ban state at a point in time.
///
/// An expired temporary ban reads as not banned; the stored fields are only
/// cleared by an explicit unban, since ban/unban are the sole operations
/// allowed to flip them.
#[derive(Debug, Clone)]
pub struct BanStatus {
    pub banned: bool,
    pub permanent: bool,
    pub reason: Option<String>,
    pub until: Option<NaiveDateTime>,
}

impl BanStatus {
    pub fn evaluate(
        is_banned: bool,
        banned_until: Option<NaiveDateTime>,
        banned_reason: Option<String>,
        now: NaiveDateTime,
    ) -> Self {
        if !is_banned {
            return Self::clear();
        }

        match banned_until {
            Some(until) if until <= now => Self::clear(),
            until => Self {
                banned: true,
                permanent: until.is_none(),
                reason: banned_reason,
                until,
            },
        }
    }

    pub fn of_user(user: &users::Model, now: NaiveDateTime) -> Self {
        Self::evaluate(
            user.is_banned,
            user.banned_until,
            user.banned_reason.clone(),
            now,
        )
    }

    fn clear() -> Self {
        Self {
            banned: false,
            permanent: false,
            reason: None,
            until: None,
        }
    }
}

/// Result of recording a violation.
#[derive(Debug, Clone)]
pub struct ViolationOutcome {
    pub trust_score: i32,
    pub violations: i32,
    pub auto_banned: bool,
}

async fn find_user(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<users::Model, ModerationError> {
    users::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(ModerationError::NotFound("User"))
}

/// Clamp a delta onto a user's trust score. Returns the new score.
pub async fn adjust_trust(
    db: &DatabaseConnection,
    user_id: i32,
    delta: i32,
) -> Result<i32, ModerationError> {
    let user = find_user(db, user_id).await?;
    let new_score = (user.trust_score + delta).clamp(TRUST_MIN, TRUST_MAX);

    let mut active: users::ActiveModel = user.into();
    active.trust_score = Set(new_score);
    active.updated_at = Set(Utc::now().naive_utc());
    active.update(db).await?;

    cache::invalidate_author_profile(user_id);

    Ok(new_score)
}

/// Record a confirmed violation: trust penalty, counter increment, and the
/// auto-ban rule when enabled.
pub async fn record_violation(
    db: &DatabaseConnection,
    user_id: i32,
    severity: Severity,
    auto_ban: bool,
) -> Result<ViolationOutcome, ModerationError> {
    let user = find_user(db, user_id).await?;
    let now = Utc::now().naive_utc();

    let new_score = (user.trust_score + severity.trust_delta()).clamp(TRUST_MIN, TRUST_MAX);
    let new_violations = if severity.counts_as_violation() {
        user.violations + 1
    } else {
        user.violations
    };

    let already_banned = BanStatus::of_user(&user, now).banned;
    let should_auto_ban = auto_ban
        && !already_banned
        && (new_score < TRUST_UNTRUSTED || new_violations >= AUTO_BAN_VIOLATIONS);

    let mut active: users::ActiveModel = user.into();
    active.trust_score = Set(new_score);
    active.violations = Set(new_violations);
    if should_auto_ban {
        let reason = format!("Automatic ban after {} violations", new_violations);
        active.is_banned = Set(true);
        active.banned_reason = Set(Some(reason.clone()));
        active.banned_until = Set(Some(now + Duration::days(AUTO_BAN_DAYS)));

        moderation::log_action(
            db,
            user_id,
            None,
            CONTENT_KIND_USER,
            user_id,
            moderation::ACTION_USER_BANNED,
            &reason,
            None,
            None,
        )
        .await?;

        log::warn!("User {} auto-banned: {}", user_id, reason);
    }
    active.updated_at = Set(now);
    active.update(db).await?;

    cache::invalidate_author_profile(user_id);

    Ok(ViolationOutcome {
        trust_score: new_score,
        violations: new_violations,
        auto_banned: should_auto_ban,
    })
}

/// Restore standing after a rejection is overturned on appeal.
pub async fn restitution(db: &DatabaseConnection, user_id: i32) -> Result<(), ModerationError> {
    let user = find_user(db, user_id).await?;

    let mut active: users::ActiveModel = user.clone().into();
    active.trust_score = Set((user.trust_score + TRUST_RESTITUTION).clamp(TRUST_MIN, TRUST_MAX));
    active.violations = Set((user.violations - 1).max(0));
    active.updated_at = Set(Utc::now().naive_utc());
    active.update(db).await?;

    cache::invalidate_author_profile(user_id);

    Ok(())
}

/// Ban a user. `duration_days == 0` means permanent (`banned_until` NULL).
///
/// Re-banning an already-banned user updates reason and duration in place.
pub async fn ban(
    db: &DatabaseConnection,
    user_id: i32,
    moderator_id: Option<i32>,
    reason: &str,
    duration_days: i64,
) -> Result<BanStatus, ModerationError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(ModerationError::Validation(
            "Ban reason is required".to_string(),
        ));
    }
    if !(0..=3650).contains(&duration_days) {
        return Err(ModerationError::Validation(
            "Ban duration must be between 0 (permanent) and 3650 days".to_string(),
        ));
    }

    let user = find_user(db, user_id).await?;
    let now = Utc::now().naive_utc();

    let banned_until = if duration_days == 0 {
        None
    } else {
        Some(now + Duration::days(duration_days))
    };

    let mut active: users::ActiveModel = user.into();
    active.is_banned = Set(true);
    active.banned_reason = Set(Some(reason.to_string()));
    active.banned_until = Set(banned_until);
    active.updated_at = Set(now);
    active.update(db).await?;

    moderation::log_action(
        db,
        user_id,
        moderator_id,
        CONTENT_KIND_USER,
        user_id,
        moderation::ACTION_USER_BANNED,
        reason,
        None,
        None,
    )
    .await?;

    cache::invalidate_author_profile(user_id);

    log::info!(
        "User {} banned by {:?} (until: {:?})",
        user_id,
        moderator_id,
        banned_until
    );

    Ok(BanStatus {
        banned: true,
        permanent: banned_until.is_none(),
        reason: Some(reason.to_string()),
        until: banned_until,
    })
}

/// Lift a ban: clears `is_banned`, `banned_reason` and `banned_until`
/// together in one guarded update. Unbanning a user who is not banned is a
/// conflict.
pub async fn unban(
    db: &DatabaseConnection,
    user_id: i32,
    moderator_id: Option<i32>,
) -> Result<(), ModerationError> {
    // The guard doubles as the existence check: separate the two error cases
    // only when the update touched nothing.
    let result = users::Entity::update_many()
        .col_expr(users::Column::IsBanned, Expr::value(false))
        .col_expr(users::Column::BannedReason, Expr::value(Option::<String>::None))
        .col_expr(users::Column::BannedUntil, Expr::value(Option::<NaiveDateTime>::None))
        .col_expr(users::Column::UpdatedAt, Expr::value(Utc::now().naive_utc()))
        .filter(users::Column::Id.eq(user_id))
        .filter(users::Column::IsBanned.eq(true))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        find_user(db, user_id).await?;
        return Err(ModerationError::Conflict(
            "User is not banned".to_string(),
        ));
    }

    moderation::log_action(
        db,
        user_id,
        moderator_id,
        CONTENT_KIND_USER,
        user_id,
        moderation::ACTION_USER_UNBANNED,
        "Ban lifted",
        None,
        None,
    )
    .await?;

    cache::invalidate_author_profile(user_id);

    log::info!("User {} unbanned by {:?}", user_id, moderator_id);

    Ok(())
}

/// Issue a formal warning: counts as a moderate violation and feeds the
/// auto-ban rule. Moderators and admins cannot be warned.
pub async fn warn(
    db: &DatabaseConnection,
    user_id: i32,
    moderator_id: i32,
    reason: &str,
    message: Option<&str>,
    auto_ban: bool,
) -> Result<ViolationOutcome, ModerationError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(ModerationError::Validation(
            "Warning reason is required".to_string(),
        ));
    }

    let user = find_user(db, user_id).await?;
    if user.role == "moderator" || user.role == "admin" {
        return Err(ModerationError::Forbidden(
            "Cannot warn a moderator or admin".to_string(),
        ));
    }

    moderation::log_action(
        db,
        user_id,
        Some(moderator_id),
        CONTENT_KIND_USER,
        user_id,
        moderation::ACTION_USER_WARNED,
        reason,
        message,
        Some(Severity::Moderate.trust_delta()),
    )
    .await?;

    record_violation(db, user_id, Severity::Moderate, auto_ban).await
}

/// Increment the received-report counter, used by the trust summary.
pub async fn record_report_received(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<(), ModerationError> {
    users::Entity::update_many()
        .col_expr(
            users::Column::ReportCount,
            Expr::col(users::Column::ReportCount).add(1),
        )
        .filter(users::Column::Id.eq(user_id))
        .exec(db)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive(secs_from_now: i64) -> NaiveDateTime {
        Utc::now().naive_utc() + Duration::seconds(secs_from_now)
    }

    #[test]
    fn test_severity_deltas() {
        assert_eq!(Severity::Severe.trust_delta(), -15);
        assert_eq!(Severity::Moderate.trust_delta(), -10);
        assert_eq!(Severity::Minor.trust_delta(), -5);
        assert!(Severity::Severe.counts_as_violation());
        assert!(!Severity::Minor.counts_as_violation());
    }

    #[test]
    fn test_ban_status_permanent() {
        let status = BanStatus::evaluate(true, None, Some("spam".into()), naive(0));
        assert!(status.banned);
        assert!(status.permanent);
    }

    #[test]
    fn test_ban_status_active_temporary() {
        let status = BanStatus::evaluate(true, Some(naive(3600)), None, naive(0));
        assert!(status.banned);
        assert!(!status.permanent);
    }

    #[test]
    fn test_ban_status_expired_reads_clear() {
        let status = BanStatus::evaluate(true, Some(naive(-60)), Some("old".into()), naive(0));
        assert!(!status.banned);
        assert!(status.reason.is_none());
    }

    #[test]
    fn test_ban_status_not_banned() {
        let status = BanStatus::evaluate(false, None, None, naive(0));
        assert!(!status.banned);
    }
}
