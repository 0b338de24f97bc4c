//! Ban, warning and trust management endpoints

use crate::config::Config;
use crate::db::get_db_pool;
use crate::error::ModerationError;
use crate::middleware::ClientCtx;
use crate::moderation;
use crate::orm::{comments, posts, reports, users};
use crate::reports as report_svc;
use crate::trust;
use actix_web::{get, post, web, HttpResponse};
use chrono::Utc;
use sea_orm::{entity::*, query::*};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(ban_user)
        .service(unban_user)
        .service(warn_user)
        .service(adjust_trust)
        .service(trust_summary);
}

#[derive(Deserialize, Validate)]
struct BanForm {
    #[validate(length(min = 1, message = "Ban reason is required"))]
    reason: String,
    /// 0 = permanent
    duration_days: i64,
}

/// Ban a user. duration_days = 0 is permanent; re-banning updates the
/// reason and duration in place.
#[post("/api/moderation/ban/{user_id}")]
async fn ban_user(
    client: ClientCtx,
    path: web::Path<i32>,
    form: web::Json<BanForm>,
) -> Result<HttpResponse, ModerationError> {
    let moderator_id = client.require_moderator()?;
    let user_id = path.into_inner();

    form.validate()
        .map_err(|e| ModerationError::Validation(e.to_string()))?;

    if user_id == moderator_id {
        return Err(ModerationError::Validation(
            "You cannot ban yourself".to_string(),
        ));
    }

    let status = trust::ban(
        get_db_pool(),
        user_id,
        Some(moderator_id),
        &form.reason,
        form.duration_days,
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": if status.permanent {
            "User banned permanently".to_string()
        } else {
            format!("User banned for {} days", form.duration_days)
        },
        "user_id": user_id,
        "banned_until": status.until,
    })))
}

/// Lift a ban. Clears all ban fields together; 409 if the user is not
/// banned.
#[post("/api/moderation/unban/{user_id}")]
async fn unban_user(
    client: ClientCtx,
    path: web::Path<i32>,
) -> Result<HttpResponse, ModerationError> {
    let moderator_id = client.require_moderator()?;
    let user_id = path.into_inner();

    trust::unban(get_db_pool(), user_id, Some(moderator_id)).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "User unbanned",
        "user_id": user_id,
    })))
}

#[derive(Deserialize, Validate)]
struct WarnForm {
    #[validate(length(min = 1, message = "Warning reason is required"))]
    reason: String,
    message: Option<String>,
}

/// Warn a user: counts as a moderate violation and can trigger the
/// auto-ban rule.
#[post("/api/moderation/warn/{user_id}")]
async fn warn_user(
    client: ClientCtx,
    config: web::Data<Arc<Config>>,
    path: web::Path<i32>,
    form: web::Json<WarnForm>,
) -> Result<HttpResponse, ModerationError> {
    let moderator_id = client.require_moderator()?;
    let user_id = path.into_inner();

    form.validate()
        .map_err(|e| ModerationError::Validation(e.to_string()))?;

    let outcome = trust::warn(
        get_db_pool(),
        user_id,
        moderator_id,
        &form.reason,
        form.message.as_deref(),
        config.auto_ban_enabled(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": if outcome.auto_banned {
            format!(
                "Warning issued. User was automatically banned after {} violations",
                outcome.violations
            )
        } else {
            "Warning issued".to_string()
        },
        "user_id": user_id,
        "trust_score": outcome.trust_score,
        "violations": outcome.violations,
        "auto_banned": outcome.auto_banned,
    })))
}

#[derive(Deserialize)]
struct AdjustTrustForm {
    delta: i32,
}

/// Directly adjust a trust score (admin only). Clamped to bounds.
#[post("/api/moderation/trust/{user_id}/adjust")]
async fn adjust_trust(
    client: ClientCtx,
    path: web::Path<i32>,
    form: web::Json<AdjustTrustForm>,
) -> Result<HttpResponse, ModerationError> {
    client.require_admin()?;
    let user_id = path.into_inner();

    let new_score = trust::adjust_trust(get_db_pool(), user_id, form.delta).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "user_id": user_id,
        "trust_score": new_score,
    })))
}

fn trust_level(score: i32) -> &'static str {
    if score >= 80 {
        "Highly Trusted"
    } else if score >= 60 {
        "Trusted"
    } else if score >= 40 {
        "Normal"
    } else if score >= 20 {
        "Low Trust"
    } else {
        "Untrusted"
    }
}

/// Trust summary for a user: current score, level, and the factors behind
/// it.
#[get("/api/moderation/trust/{user_id}")]
async fn trust_summary(
    client: ClientCtx,
    path: web::Path<i32>,
) -> Result<HttpResponse, ModerationError> {
    client.require_moderator()?;

    let db = get_db_pool();
    let user_id = path.into_inner();

    let user = users::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(ModerationError::NotFound("User"))?;

    let now = Utc::now().naive_utc();
    let account_age_days = (now - user.created_at).num_days();

    let posts_approved = posts::Entity::find()
        .filter(posts::Column::UserId.eq(user_id))
        .filter(posts::Column::ModerationStatus.eq(moderation::STATUS_APPROVED))
        .count(db)
        .await?;

    let comments_approved = comments::Entity::find()
        .filter(comments::Column::UserId.eq(user_id))
        .filter(comments::Column::ModerationStatus.eq(moderation::STATUS_APPROVED))
        .count(db)
        .await?;

    let reports_received = reports::Entity::find()
        .filter(reports::Column::ReportedUserId.eq(user_id))
        .filter(reports::Column::Status.is_in([
            report_svc::REPORT_PENDING,
            report_svc::REPORT_REVIEWING,
            report_svc::REPORT_RESOLVED,
        ]))
        .count(db)
        .await?;

    let reports_dismissed = reports::Entity::find()
        .filter(reports::Column::ReportedUserId.eq(user_id))
        .filter(reports::Column::Status.eq(report_svc::REPORT_DISMISSED))
        .count(db)
        .await?;

    let ban_status = trust::BanStatus::of_user(&user, now);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "user_id": user.id,
        "name": user.name,
        "trust_score": user.trust_score,
        "level": trust_level(user.trust_score),
        "is_banned": ban_status.banned,
        "factors": {
            "account_age": account_age_days.min(30) / 3,
            "posts_approved": (posts_approved as i64 * 2).min(20),
            "comments_approved": (comments_approved as i64).min(10),
            "violations": -(user.violations as i64) * 10,
            "reports_received": -((reports_received as i64) * 5).min(25),
            "reports_dismissed": reports_dismissed as i64 * 3,
        },
        "stats": {
            "account_age_days": account_age_days,
            "posts_approved": posts_approved,
            "comments_approved": comments_approved,
            "violations": user.violations,
            "reports_received": reports_received,
            "reports_dismissed": reports_dismissed,
        },
    })))
}
