//! Content submission and status-sync endpoints

use crate::config::Config;
use crate::db::get_db_pool;
use crate::error::ModerationError;
use crate::gate;
use crate::middleware::ClientCtx;
use crate::moderation::{self, ContentKind, ContentModel};
use crate::rate_limit;
use crate::scorer::RiskScorer;
use crate::status_sync;
use actix_web::{get, post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(submit_post)
        .service(submit_comment)
        .service(content_status);
}

/// Moderation-relevant view of a content item.
#[derive(Serialize)]
pub(crate) struct ContentView {
    pub id: i32,
    pub kind: &'static str,
    pub author_id: i32,
    pub body: String,
    pub moderation_status: String,
    pub moderation_reason: Option<String>,
    pub profanity_score: i32,
    pub nsfw_score: i32,
    pub created_at: chrono::NaiveDateTime,
}

impl ContentView {
    pub fn from_model(content: &ContentModel) -> Self {
        Self {
            id: content.id(),
            kind: content.kind().as_str(),
            author_id: content.author_id(),
            body: content.body().to_string(),
            moderation_status: content.moderation_status().to_string(),
            moderation_reason: content.moderation_reason().map(|r| r.to_string()),
            profanity_score: content.profanity_score(),
            nsfw_score: content.nsfw_score(),
            created_at: content.created_at(),
        }
    }
}

#[derive(Deserialize)]
struct NewPostForm {
    body: String,
    media: Option<Vec<String>>,
    visibility: Option<String>,
}

#[derive(Serialize)]
struct SubmissionResponse {
    success: bool,
    message: String,
    content: ContentView,
}

fn submission_message(status: &str) -> &'static str {
    match status {
        moderation::STATUS_APPROVED => "Published",
        moderation::STATUS_REJECTED => "Content was rejected. You may appeal this decision.",
        _ => "Content is awaiting review",
    }
}

/// Submit a post through the moderation gate
#[post("/api/posts")]
async fn submit_post(
    client: ClientCtx,
    config: web::Data<Arc<Config>>,
    scorer: web::Data<Arc<dyn RiskScorer>>,
    form: web::Json<NewPostForm>,
) -> Result<HttpResponse, ModerationError> {
    let author_id = client.require_login()?;

    let outcome = gate::submit_post(
        get_db_pool(),
        scorer.get_ref().as_ref(),
        config.get_ref(),
        author_id,
        &form.body,
        form.media.clone(),
        form.visibility.as_deref().unwrap_or("public"),
    )
    .await?;

    Ok(HttpResponse::Created().json(SubmissionResponse {
        success: true,
        message: submission_message(outcome.status()).to_string(),
        content: ContentView::from_model(&outcome.content),
    }))
}

#[derive(Deserialize)]
struct NewCommentForm {
    body: String,
}

/// Submit a comment on a post through the moderation gate
#[post("/api/posts/{id}/comments")]
async fn submit_comment(
    client: ClientCtx,
    config: web::Data<Arc<Config>>,
    scorer: web::Data<Arc<dyn RiskScorer>>,
    path: web::Path<i32>,
    form: web::Json<NewCommentForm>,
) -> Result<HttpResponse, ModerationError> {
    let author_id = client.require_login()?;
    let post_id = path.into_inner();

    let outcome = gate::submit_comment(
        get_db_pool(),
        scorer.get_ref().as_ref(),
        config.get_ref(),
        author_id,
        post_id,
        &form.body,
    )
    .await?;

    Ok(HttpResponse::Created().json(SubmissionResponse {
        success: true,
        message: submission_message(outcome.status()).to_string(),
        content: ContentView::from_model(&outcome.content),
    }))
}

#[derive(Serialize)]
struct StatusResponse {
    success: bool,
    id: i32,
    kind: &'static str,
    status: String,
    reason: Option<String>,
    advice: &'static str,
    /// Polling contract, present while the item is still pending.
    #[serde(skip_serializing_if = "Option::is_none")]
    poll_interval_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    poll_max_attempts: Option<u32>,
}

/// Status-sync read: a submitting client polls this until its item leaves
/// `pending` or its attempt budget runs out
#[get("/api/content/{kind}/{id}/status")]
async fn content_status(
    client: ClientCtx,
    config: web::Data<Arc<Config>>,
    path: web::Path<(String, i32)>,
) -> Result<HttpResponse, ModerationError> {
    let user_id = client.require_login()?;
    rate_limit::check_api_rate_limit(&user_id.to_string())?;

    let (kind, id) = path.into_inner();
    let kind = ContentKind::parse(&kind)
        .ok_or_else(|| ModerationError::Validation(format!("Invalid content kind: {}", kind)))?;

    let view = status_sync::get_status(get_db_pool(), kind, id).await?;

    // Unpublished state (and its reason) is only the author's and the
    // moderators' business.
    if view.status != moderation::STATUS_APPROVED && !client.is_moderator() {
        let content = moderation::find_content(get_db_pool(), kind, id)
            .await?
            .ok_or(ModerationError::NotFound("Content"))?;
        if content.author_id() != user_id {
            return Err(ModerationError::NotFound("Content"));
        }
    }

    let policy = if view.status == moderation::STATUS_PENDING {
        Some(status_sync::PollPolicy::from_config(config.get_ref()))
    } else {
        None
    };

    Ok(HttpResponse::Ok().json(StatusResponse {
        success: true,
        id: view.id,
        kind: view.kind.as_str(),
        status: view.status,
        reason: view.reason,
        advice: view.advice,
        poll_interval_ms: policy.map(|p| p.interval.as_millis() as u64),
        poll_max_attempts: policy.map(|p| p.max_attempts),
    }))
}
