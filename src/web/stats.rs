//! Moderation statistics endpoint

use crate::db::get_db_pool;
use crate::error::ModerationError;
use crate::middleware::ClientCtx;
use crate::moderation;
use crate::orm::{comments, moderation_log, posts, users};
use actix_web::{get, web, HttpResponse};
use chrono::{Duration, Utc};
use sea_orm::{entity::*, query::*};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(moderation_stats);
}

#[derive(Deserialize)]
struct StatsQuery {
    /// "24h", "7d" or "30d"
    period: Option<String>,
}

fn period_cutoff(period: &str) -> Result<Duration, ModerationError> {
    match period {
        "24h" => Ok(Duration::hours(24)),
        "7d" => Ok(Duration::days(7)),
        "30d" => Ok(Duration::days(30)),
        other => Err(ModerationError::Validation(format!(
            "Invalid period: {} (expected 24h, 7d or 30d)",
            other
        ))),
    }
}

/// Decision counts, queue depths, banned-user count and top violators for
/// the requested period.
#[get("/api/moderation/stats")]
async fn moderation_stats(
    client: ClientCtx,
    query: web::Query<StatsQuery>,
) -> Result<HttpResponse, ModerationError> {
    client.require_moderator()?;

    let db = get_db_pool();
    let period = query.period.as_deref().unwrap_or("24h");
    let since = Utc::now().naive_utc() - period_cutoff(period)?;

    // Per-action counts within the window.
    let entries = moderation_log::Entity::find()
        .filter(moderation_log::Column::CreatedAt.gte(since))
        .all(db)
        .await?;

    let mut action_counts: HashMap<&str, u64> = HashMap::new();
    let mut rejections_by_user: HashMap<i32, (u64, chrono::NaiveDateTime)> = HashMap::new();

    for entry in &entries {
        *action_counts.entry(entry.action.as_str()).or_default() += 1;

        if entry.action == moderation::ACTION_AUTO_REJECTED
            || entry.action == moderation::ACTION_MODERATOR_REJECTED
        {
            let slot = rejections_by_user
                .entry(entry.user_id)
                .or_insert((0, entry.created_at));
            slot.0 += 1;
            if entry.created_at > slot.1 {
                slot.1 = entry.created_at;
            }
        }
    }

    // Current queue depths, independent of the window.
    let pending_posts = posts::Entity::find()
        .filter(posts::Column::ModerationStatus.eq(moderation::STATUS_PENDING))
        .count(db)
        .await?;
    let pending_comments = comments::Entity::find()
        .filter(comments::Column::ModerationStatus.eq(moderation::STATUS_PENDING))
        .count(db)
        .await?;
    let banned_users = users::Entity::find()
        .filter(users::Column::IsBanned.eq(true))
        .count(db)
        .await?;

    // Top violators: most rejections in the window, with their standing.
    let mut violators: Vec<(i32, u64, chrono::NaiveDateTime)> = rejections_by_user
        .into_iter()
        .map(|(user_id, (count, last))| (user_id, count, last))
        .collect();
    violators.sort_by(|a, b| b.1.cmp(&a.1).then(b.2.cmp(&a.2)));
    violators.truncate(10);

    let mut top_violators = Vec::with_capacity(violators.len());
    for (user_id, rejections, last_violation) in violators {
        if let Some(user) = users::Entity::find_by_id(user_id).one(db).await? {
            top_violators.push(json!({
                "user_id": user.id,
                "name": user.name,
                "rejections": rejections,
                "trust_score": user.trust_score,
                "violations": user.violations,
                "last_violation": last_violation,
            }));
        }
    }

    let count_of = |action: &str| action_counts.get(action).copied().unwrap_or(0);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "period": period,
        "decisions": {
            "auto_approved": count_of(moderation::ACTION_AUTO_APPROVED),
            "auto_rejected": count_of(moderation::ACTION_AUTO_REJECTED),
            "pending_review": count_of(moderation::ACTION_PENDING_REVIEW),
            "moderator_approved": count_of(moderation::ACTION_MODERATOR_APPROVED),
            "moderator_rejected": count_of(moderation::ACTION_MODERATOR_REJECTED),
            "deleted_by_report": count_of(moderation::ACTION_DELETED_BY_REPORT),
        },
        "appeals": {
            "submitted": count_of(moderation::ACTION_APPEAL_SUBMITTED),
            "approved": count_of(moderation::ACTION_APPEAL_APPROVED),
            "rejected": count_of(moderation::ACTION_APPEAL_REJECTED),
        },
        "queues": {
            "pending_posts": pending_posts,
            "pending_comments": pending_comments,
        },
        "banned_users": banned_users,
        "top_violators": top_violators,
    })))
}
