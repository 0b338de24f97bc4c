//! Appeal filing and resolution endpoints

use super::Pagination;
use crate::appeals::{self, AppealTarget};
use crate::config::Config;
use crate::db::get_db_pool;
use crate::error::ModerationError;
use crate::middleware::ClientCtx;
use crate::moderation;
use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(file_appeal)
        .service(list_appeals)
        .service(resolve_appeal);
}

#[derive(Deserialize)]
struct AppealForm {
    target_kind: String,
    target_id: i32,
    reason: String,
}

/// File an appeal against a rejection or a ban. Owner only.
#[post("/api/appeals")]
async fn file_appeal(
    client: ClientCtx,
    form: web::Json<AppealForm>,
) -> Result<HttpResponse, ModerationError> {
    let appellant_id = client.require_login()?;

    let appeal = appeals::file_appeal(
        get_db_pool(),
        appellant_id,
        &form.target_kind,
        form.target_id,
        &form.reason,
    )
    .await?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Appeal submitted. A moderator will take another look.",
        "appeal_id": appeal.id,
    })))
}

#[derive(Deserialize)]
struct AppealsQuery {
    page: Option<u64>,
    limit: Option<u64>,
}

/// Open appeals, newest first, with a preview of the contested target.
#[get("/api/moderation/appeals")]
async fn list_appeals(
    client: ClientCtx,
    config: web::Data<Arc<Config>>,
    query: web::Query<AppealsQuery>,
) -> Result<HttpResponse, ModerationError> {
    client.require_moderator()?;

    let db = get_db_pool();
    let (page, limit) = moderation::clamp_page(
        query.page.unwrap_or(1),
        query.limit.unwrap_or(0),
        config.queue_page_size(),
    );

    let (models, total) = appeals::list_open_appeals(db, page, limit).await?;

    let mut items = Vec::with_capacity(models.len());
    for appeal in models {
        let target_preview = match AppealTarget::parse(&appeal.target_kind) {
            Some(AppealTarget::Content(kind)) => {
                moderation::find_content(db, kind, appeal.target_id)
                    .await?
                    .map(|content| {
                        json!({
                            "body": content.body(),
                            "moderation_reason": content.moderation_reason(),
                            "profanity_score": content.profanity_score(),
                            "nsfw_score": content.nsfw_score(),
                        })
                    })
            }
            _ => None,
        };

        items.push(json!({
            "id": appeal.id,
            "target_kind": appeal.target_kind,
            "target_id": appeal.target_id,
            "appellant_id": appeal.appellant_id,
            "reason": appeal.reason,
            "status": appeal.status,
            "created_at": appeal.created_at,
            "target": target_preview,
        }));
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "appeals": items,
        "pagination": Pagination::new(page, limit, total),
    })))
}

#[derive(Deserialize)]
struct ResolveAppealForm {
    /// "approve" or "reject"
    decision: String,
    notes: Option<String>,
}

/// Resolve an open appeal. Dispatches on the appeal's stored target kind:
/// content restores, accounts unban. 409 on an already-resolved appeal.
#[post("/api/moderation/appeals/{id}/resolve")]
async fn resolve_appeal(
    client: ClientCtx,
    path: web::Path<i32>,
    form: web::Json<ResolveAppealForm>,
) -> Result<HttpResponse, ModerationError> {
    let moderator_id = client.require_moderator()?;
    let appeal_id = path.into_inner();

    appeals::resolve_appeal(
        get_db_pool(),
        appeal_id,
        moderator_id,
        &form.decision,
        form.notes.as_deref(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("Appeal {}d", form.decision),
        "appeal_id": appeal_id,
    })))
}
