//! Moderation queue listing and review detail endpoints

use super::content::ContentView;
use super::Pagination;
use crate::appeals;
use crate::config::Config;
use crate::db::get_db_pool;
use crate::error::ModerationError;
use crate::middleware::ClientCtx;
use crate::moderation::{self, ContentKind, ContentModel};
use crate::orm::users;
use crate::reports::{self, ReportFilters};
use crate::trust::BanStatus;
use actix_web::{get, web, HttpResponse};
use chrono::Utc;
use sea_orm::{entity::*, query::*};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(pending_queue).service(review_detail);
}

#[derive(Deserialize)]
struct QueueQuery {
    page: Option<u64>,
    limit: Option<u64>,
}

/// Moderation-relevant summary of an author, embedded in queue rows and
/// the review detail.
#[derive(Serialize)]
struct AuthorSummary {
    id: i32,
    name: String,
    trust_score: i32,
    violations: i32,
    is_banned: bool,
    banned_until: Option<chrono::NaiveDateTime>,
}

impl AuthorSummary {
    fn from_user(user: &users::Model) -> Self {
        let status = BanStatus::of_user(user, Utc::now().naive_utc());
        Self {
            id: user.id,
            name: user.name.clone(),
            trust_score: user.trust_score,
            violations: user.violations,
            is_banned: status.banned,
            banned_until: status.until,
        }
    }
}

async fn author_summary(user_id: i32) -> Result<Option<AuthorSummary>, ModerationError> {
    let user = users::Entity::find_by_id(user_id).one(get_db_pool()).await?;
    Ok(user.as_ref().map(AuthorSummary::from_user))
}

/// The pending queue, parameterized by item kind: "post", "comment",
/// "report" or "appeal". Newest first; an item can disappear between pages
/// when another moderator resolves it, and acting on it then returns 409.
#[get("/api/moderation/pending/{kind}")]
async fn pending_queue(
    client: ClientCtx,
    config: web::Data<Arc<Config>>,
    path: web::Path<String>,
    query: web::Query<QueueQuery>,
) -> Result<HttpResponse, ModerationError> {
    client.require_moderator()?;

    let db = get_db_pool();
    let kind = path.into_inner();
    let (page, limit) = moderation::clamp_page(
        query.page.unwrap_or(1),
        query.limit.unwrap_or(0),
        config.queue_page_size(),
    );

    let (items, total): (Vec<serde_json::Value>, usize) = match kind.as_str() {
        "post" => {
            let (models, total) = moderation::list_pending_posts(db, page, limit).await?;
            let mut items = Vec::with_capacity(models.len());
            for model in models {
                let author = author_summary(model.user_id).await?;
                let view = ContentView::from_model(&ContentModel::Post(model));
                items.push(json!({ "content": view, "author": author }));
            }
            (items, total)
        }
        "comment" => {
            let (models, total) = moderation::list_pending_comments(db, page, limit).await?;
            let mut items = Vec::with_capacity(models.len());
            for model in models {
                let author = author_summary(model.user_id).await?;
                let view = ContentView::from_model(&ContentModel::Comment(model));
                items.push(json!({ "content": view, "author": author }));
            }
            (items, total)
        }
        "report" => {
            let filters = ReportFilters {
                status: Some(reports::REPORT_PENDING.to_string()),
                page,
                limit,
                ..Default::default()
            };
            let (models, total) = reports::list_reports(db, &filters, limit).await?;
            let items = models
                .into_iter()
                .map(|r| {
                    json!({
                        "id": r.id,
                        "content_kind": r.content_kind,
                        "content_id": r.content_id,
                        "reason": r.reason,
                        "priority": r.priority,
                        "status": r.status,
                        "created_at": r.created_at,
                    })
                })
                .collect();
            (items, total)
        }
        "appeal" => {
            let (models, total) = appeals::list_open_appeals(db, page, limit).await?;
            let items = models
                .into_iter()
                .map(|a| {
                    json!({
                        "id": a.id,
                        "target_kind": a.target_kind,
                        "target_id": a.target_id,
                        "appellant_id": a.appellant_id,
                        "reason": a.reason,
                        "status": a.status,
                        "created_at": a.created_at,
                    })
                })
                .collect();
            (items, total)
        }
        other => {
            return Err(ModerationError::Validation(format!(
                "Invalid queue kind: {}",
                other
            )))
        }
    };

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "items": items,
        "pagination": Pagination::new(page, limit, total),
    })))
}

#[derive(Serialize)]
struct LogEntryView {
    action: String,
    reason: String,
    notes: Option<String>,
    moderator_id: Option<i32>,
    trust_score_change: Option<i32>,
    created_at: chrono::NaiveDateTime,
}

impl LogEntryView {
    fn from_model(entry: crate::orm::moderation_log::Model) -> Self {
        Self {
            action: entry.action,
            reason: entry.reason,
            notes: entry.notes,
            moderator_id: entry.moderator_id,
            trust_score_change: entry.trust_score_change,
            created_at: entry.created_at,
        }
    }
}

/// Full review detail for one item: body, scores, the author's standing
/// and the item's log history. Kind "user" serves account reviews for ban
/// appeals.
#[get("/api/moderation/review/{kind}/{id}")]
async fn review_detail(
    client: ClientCtx,
    path: web::Path<(String, i32)>,
) -> Result<HttpResponse, ModerationError> {
    client.require_moderator()?;

    let db = get_db_pool();
    let (kind, id) = path.into_inner();

    if kind == moderation::CONTENT_KIND_USER {
        let user = users::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(ModerationError::NotFound("User"))?;

        let logs = crate::orm::moderation_log::Entity::find()
            .filter(crate::orm::moderation_log::Column::UserId.eq(id))
            .order_by_desc(crate::orm::moderation_log::Column::CreatedAt)
            .limit(10)
            .all(db)
            .await?;

        return Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "user": AuthorSummary::from_user(&user),
            "banned_reason": user.banned_reason,
            "logs": logs.into_iter().map(LogEntryView::from_model).collect::<Vec<_>>(),
        })));
    }

    let kind = ContentKind::parse(&kind)
        .ok_or_else(|| ModerationError::Validation(format!("Invalid content kind: {}", kind)))?;

    let detail = moderation::review_detail(db, kind, id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "content": ContentView::from_model(&detail.content),
        "author": AuthorSummary::from_user(&detail.author),
        "logs": detail
            .logs
            .into_iter()
            .map(LogEntryView::from_model)
            .collect::<Vec<_>>(),
        "author_recent_rejections": detail
            .author_recent_rejections
            .into_iter()
            .map(LogEntryView::from_model)
            .collect::<Vec<_>>(),
    })))
}
