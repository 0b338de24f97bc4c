//! Moderator approve/reject endpoints

use crate::config::Config;
use crate::db::get_db_pool;
use crate::error::ModerationError;
use crate::middleware::ClientCtx;
use crate::moderation::{self, ContentKind};
use actix_web::{post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(approve_content).service(reject_content);
}

fn parse_kind(kind: &str) -> Result<ContentKind, ModerationError> {
    ContentKind::parse(kind)
        .ok_or_else(|| ModerationError::Validation(format!("Invalid content kind: {}", kind)))
}

#[derive(Deserialize, Default)]
struct ApproveForm {
    notes: Option<String>,
}

#[derive(Serialize)]
struct DecisionResponse {
    success: bool,
    message: String,
    id: i32,
    status: &'static str,
}

/// Approve a pending item. 409 if another moderator already resolved it.
#[post("/api/moderation/approve/{kind}/{id}")]
async fn approve_content(
    client: ClientCtx,
    path: web::Path<(String, i32)>,
    form: Option<web::Json<ApproveForm>>,
) -> Result<HttpResponse, ModerationError> {
    let moderator_id = client.require_moderator()?;
    let (kind, id) = path.into_inner();
    let kind = parse_kind(&kind)?;
    let notes = form.and_then(|f| f.into_inner().notes);

    moderation::approve_content(get_db_pool(), kind, id, moderator_id, notes.as_deref()).await?;

    Ok(HttpResponse::Ok().json(DecisionResponse {
        success: true,
        message: "Content approved".to_string(),
        id,
        status: moderation::STATUS_APPROVED,
    }))
}

#[derive(Deserialize, Validate)]
struct RejectForm {
    #[validate(length(min = 1, message = "Rejection reason is required"))]
    reason: String,
    notes: Option<String>,
}

/// Reject a pending item with a reason. Increments the author's violation
/// counter. 409 if another moderator already resolved it.
#[post("/api/moderation/reject/{kind}/{id}")]
async fn reject_content(
    client: ClientCtx,
    config: web::Data<Arc<Config>>,
    path: web::Path<(String, i32)>,
    form: web::Json<RejectForm>,
) -> Result<HttpResponse, ModerationError> {
    let moderator_id = client.require_moderator()?;
    let (kind, id) = path.into_inner();
    let kind = parse_kind(&kind)?;

    form.validate()
        .map_err(|e| ModerationError::Validation(e.to_string()))?;

    moderation::reject_content(
        get_db_pool(),
        kind,
        id,
        moderator_id,
        &form.reason,
        form.notes.as_deref(),
        config.auto_ban_enabled(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(DecisionResponse {
        success: true,
        message: "Content rejected".to_string(),
        id,
        status: moderation::STATUS_REJECTED,
    }))
}
