//! Report intake and triage.
//!
//! Any user can report content or another user. Reports are
//! single-resolution workflow objects: once resolved or dismissed they are
//! immutable, and the resolving moderator claims the report with a guarded
//! update before any side effect runs.

use crate::error::ModerationError;
use crate::moderation::{self, ContentKind, CONTENT_KIND_USER};
use crate::orm::{reports, users};
use crate::rate_limit;
use crate::trust;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{entity::*, query::*, ActiveValue::Set, DatabaseConnection, DbErr};

// Report statuses
pub const REPORT_PENDING: &str = "pending";
pub const REPORT_REVIEWING: &str = "reviewing";
pub const REPORT_RESOLVED: &str = "resolved";
pub const REPORT_DISMISSED: &str = "dismissed";

/// Accepted report reasons with their severity weight (1..=3).
pub const REPORT_REASONS: &[(&str, i32)] = &[
    ("spam", 1),
    ("harassment", 2),
    ("hate_speech", 3),
    ("violence", 3),
    ("nsfw", 3),
    ("misinformation", 1),
    ("scam", 2),
    ("copyright", 1),
    ("other", 1),
];

/// Open reports at or past this count flip pending ones to "reviewing".
const ESCALATE_TO_REVIEWING_AT: usize = 3;

/// What a report may point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportTarget {
    Content(ContentKind),
    User,
}

impl ReportTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportTarget::Content(kind) => kind.as_str(),
            ReportTarget::User => CONTENT_KIND_USER,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(ReportTarget::User),
            other => ContentKind::parse(other).map(ReportTarget::Content),
        }
    }
}

fn reason_severity(reason: &str) -> Option<i32> {
    REPORT_REASONS
        .iter()
        .find(|(name, _)| *name == reason)
        .map(|(_, severity)| *severity)
}

/// Initial priority: reason severity plus a bump for repeat offenders,
/// clamped to 1..=5.
pub fn initial_priority(reason_weight: i32, target_violations: i32) -> i32 {
    (reason_weight + target_violations.min(2)).clamp(1, 5)
}

/// File a report. Duplicate open reports from the same reporter against the
/// same target are rejected; refiling after the first is dismissed or
/// resolved is allowed.
pub async fn file_report(
    db: &DatabaseConnection,
    reporter_id: i32,
    content_kind: &str,
    content_id: i32,
    reason: &str,
    description: Option<&str>,
) -> Result<reports::Model, ModerationError> {
    let target = ReportTarget::parse(content_kind).ok_or_else(|| {
        ModerationError::Validation(format!("Invalid content kind: {}", content_kind))
    })?;

    let severity = reason_severity(reason).ok_or_else(|| {
        ModerationError::Validation(format!("Invalid report reason: {}", reason))
    })?;

    if reason == "other" && description.map_or(true, |d| d.trim().is_empty()) {
        return Err(ModerationError::Validation(
            "Please provide details for 'other' reports".to_string(),
        ));
    }

    rate_limit::check_report_rate_limit(reporter_id, content_kind, content_id)?;

    // Resolve the reported user from the target.
    let reported_user_id = match target {
        ReportTarget::Content(kind) => moderation::find_content(db, kind, content_id)
            .await?
            .ok_or(ModerationError::NotFound("Content"))?
            .author_id(),
        ReportTarget::User => content_id,
    };

    let reported_user = users::Entity::find_by_id(reported_user_id)
        .one(db)
        .await?
        .ok_or(ModerationError::NotFound("User"))?;

    if reported_user_id == reporter_id {
        return Err(ModerationError::Validation(
            "You cannot report your own content".to_string(),
        ));
    }

    // One open report per (reporter, target).
    let existing = reports::Entity::find()
        .filter(reports::Column::ReporterId.eq(reporter_id))
        .filter(reports::Column::ContentKind.eq(content_kind))
        .filter(reports::Column::ContentId.eq(content_id))
        .filter(reports::Column::Status.is_in([REPORT_PENDING, REPORT_REVIEWING]))
        .one(db)
        .await?;

    if existing.is_some() {
        return Err(ModerationError::Conflict(
            "You have already reported this content".to_string(),
        ));
    }

    let now = Utc::now().naive_utc();
    let report = reports::ActiveModel {
        reporter_id: Set(reporter_id),
        content_kind: Set(content_kind.to_string()),
        content_id: Set(content_id),
        reported_user_id: Set(reported_user_id),
        reason: Set(reason.to_string()),
        description: Set(description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty())),
        priority: Set(initial_priority(severity, reported_user.violations)),
        status: Set(REPORT_PENDING.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    trust::record_report_received(db, reported_user_id).await?;

    escalate_target(db, content_kind, content_id).await?;

    log::info!(
        "Report {} filed by user {} against {} {} ({})",
        report.id,
        reporter_id,
        content_kind,
        content_id,
        reason
    );

    Ok(report)
}

/// Raise priority as independent reporters pile onto the same target, and
/// flip pending reports to "reviewing" once there are enough of them.
async fn escalate_target(
    db: &DatabaseConnection,
    content_kind: &str,
    content_id: i32,
) -> Result<(), DbErr> {
    let open_count = reports::Entity::find()
        .filter(reports::Column::ContentKind.eq(content_kind))
        .filter(reports::Column::ContentId.eq(content_id))
        .filter(reports::Column::Status.is_in([REPORT_PENDING, REPORT_REVIEWING]))
        .count(db)
        .await?;

    if open_count > 1 {
        let priority = (open_count as i32).min(5);
        reports::Entity::update_many()
            .col_expr(reports::Column::Priority, Expr::value(priority))
            .filter(reports::Column::ContentKind.eq(content_kind))
            .filter(reports::Column::ContentId.eq(content_id))
            .filter(reports::Column::Status.is_in([REPORT_PENDING, REPORT_REVIEWING]))
            .filter(reports::Column::Priority.lt(priority))
            .exec(db)
            .await?;
    }

    if open_count >= ESCALATE_TO_REVIEWING_AT {
        reports::Entity::update_many()
            .col_expr(reports::Column::Status, Expr::value(REPORT_REVIEWING))
            .filter(reports::Column::ContentKind.eq(content_kind))
            .filter(reports::Column::ContentId.eq(content_id))
            .filter(reports::Column::Status.eq(REPORT_PENDING))
            .exec(db)
            .await?;
    }

    Ok(())
}

/// Filters for the report listing.
#[derive(Debug, Default, Clone)]
pub struct ReportFilters {
    pub kind: Option<String>,
    pub status: Option<String>,
    pub priority: Option<i32>,
    pub page: u64,
    pub limit: u64,
}

/// List reports, most urgent first.
pub async fn list_reports(
    db: &DatabaseConnection,
    filters: &ReportFilters,
    default_limit: u64,
) -> Result<(Vec<reports::Model>, usize), ModerationError> {
    let (page, limit) = moderation::clamp_page(filters.page, filters.limit, default_limit);

    let mut query = reports::Entity::find();

    if let Some(kind) = &filters.kind {
        query = query.filter(reports::Column::ContentKind.eq(kind.as_str()));
    }
    if let Some(status) = &filters.status {
        query = query.filter(reports::Column::Status.eq(status.as_str()));
    }
    if let Some(priority) = filters.priority {
        query = query.filter(reports::Column::Priority.eq(priority));
    }

    let total = query.clone().count(db).await?;

    let items = query
        .order_by_desc(reports::Column::Priority)
        .order_by_desc(reports::Column::CreatedAt)
        .offset((page - 1) * limit)
        .limit(limit)
        .all(db)
        .await?;

    Ok((items, total))
}

/// Claim an open report: guarded flip to a terminal status. Returns the
/// report as it was before the flip.
async fn claim_report(
    db: &DatabaseConnection,
    report_id: i32,
    moderator_id: i32,
    new_status: &str,
    note: Option<&str>,
) -> Result<reports::Model, ModerationError> {
    let report = reports::Entity::find_by_id(report_id)
        .one(db)
        .await?
        .ok_or(ModerationError::NotFound("Report"))?;

    if report.status == REPORT_RESOLVED || report.status == REPORT_DISMISSED {
        return Err(ModerationError::Conflict(format!(
            "Report has already been handled ({})",
            report.status
        )));
    }

    let now = Utc::now().naive_utc();
    let result = reports::Entity::update_many()
        .col_expr(reports::Column::Status, Expr::value(new_status))
        .col_expr(reports::Column::ReviewerId, Expr::value(Some(moderator_id)))
        .col_expr(
            reports::Column::ReviewNote,
            Expr::value(note.map(|n| n.to_string())),
        )
        .col_expr(reports::Column::ResolvedAt, Expr::value(Some(now)))
        .col_expr(reports::Column::UpdatedAt, Expr::value(now))
        .filter(reports::Column::Id.eq(report_id))
        .filter(reports::Column::Status.is_in([REPORT_PENDING, REPORT_REVIEWING]))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(ModerationError::Conflict(
            "Report was already handled by another moderator".to_string(),
        ));
    }

    // The reporter may refile against this target now that their report is
    // closed.
    rate_limit::clear_report_target(report.reporter_id, &report.content_kind, report.content_id);

    Ok(report)
}

/// Dismiss a report as invalid. No side effect on the reported target.
pub async fn dismiss_report(
    db: &DatabaseConnection,
    report_id: i32,
    moderator_id: i32,
    note: &str,
) -> Result<(), ModerationError> {
    let note = note.trim();
    if note.is_empty() {
        return Err(ModerationError::Validation(
            "A dismissal note is required".to_string(),
        ));
    }

    let report = claim_report(db, report_id, moderator_id, REPORT_DISMISSED, Some(note)).await?;

    moderation::log_action(
        db,
        report.reported_user_id,
        Some(moderator_id),
        &report.content_kind,
        report.content_id,
        moderation::ACTION_REPORT_DISMISSED,
        "Report dismissed as invalid",
        Some(note),
        None,
    )
    .await?;

    log::info!(
        "Report {} dismissed by moderator {}",
        report_id,
        moderator_id
    );

    Ok(())
}

/// What a resolution actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveAction {
    ContentRemoved,
    ContentAlreadyRemoved,
    UserBanned,
}

/// Resolve a report. Content reports remove the content (soft delete via
/// rejection); user reports route through the ban operation instead.
pub async fn resolve_report(
    db: &DatabaseConnection,
    report_id: i32,
    moderator_id: i32,
    ban_duration_days: Option<i64>,
    auto_ban: bool,
) -> Result<ResolveAction, ModerationError> {
    // Claim first so exactly one moderator performs the side effects.
    let report = claim_report(db, report_id, moderator_id, REPORT_RESOLVED, None).await?;

    let target = ReportTarget::parse(&report.content_kind).ok_or_else(|| {
        ModerationError::Validation(format!("Invalid content kind: {}", report.content_kind))
    })?;

    match target {
        ReportTarget::Content(kind) => {
            match moderation::find_content(db, kind, report.content_id).await? {
                Some(content) if content.moderation_status() != moderation::STATUS_REJECTED => {
                    moderation::remove_by_report(
                        db,
                        kind,
                        report.content_id,
                        moderator_id,
                        auto_ban,
                    )
                    .await?;
                    Ok(ResolveAction::ContentRemoved)
                }
                // Already removed through another report or the queue.
                _ => Ok(ResolveAction::ContentAlreadyRemoved),
            }
        }
        ReportTarget::User => {
            let reason = format!("Reported for {}", report.reason);
            trust::ban(
                db,
                report.content_id,
                Some(moderator_id),
                &reason,
                ban_duration_days.unwrap_or(7),
            )
            .await?;
            Ok(ResolveAction::UserBanned)
        }
    }
}
