//! Report submission and triage endpoints

use super::Pagination;
use crate::config::Config;
use crate::db::get_db_pool;
use crate::error::ModerationError;
use crate::middleware::ClientCtx;
use crate::orm::reports as reports_orm;
use crate::reports::{self, ReportFilters, ResolveAction};
use actix_web::{get, post, web, HttpResponse};
use sea_orm::{entity::*, query::*};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(file_report)
        .service(list_reports)
        .service(dismiss_report)
        .service(resolve_report);
}

#[derive(Deserialize, Validate)]
struct ReportForm {
    content_kind: String,
    content_id: i32,
    reason: String,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    description: Option<String>,
}

#[derive(Serialize)]
struct ReportResponse {
    success: bool,
    message: String,
    report_id: Option<i32>,
}

/// File a report against content or a user. Any authenticated user.
#[post("/api/reports")]
async fn file_report(
    client: ClientCtx,
    form: web::Json<ReportForm>,
) -> Result<HttpResponse, ModerationError> {
    let reporter_id = client.require_login()?;

    form.validate()
        .map_err(|e| ModerationError::Validation(e.to_string()))?;

    let report = reports::file_report(
        get_db_pool(),
        reporter_id,
        &form.content_kind,
        form.content_id,
        &form.reason,
        form.description.as_deref(),
    )
    .await?;

    Ok(HttpResponse::Created().json(ReportResponse {
        success: true,
        message: "Report submitted. Thank you for helping keep the community safe.".to_string(),
        report_id: Some(report.id),
    }))
}

#[derive(Deserialize)]
struct ReportsQuery {
    kind: Option<String>,
    status: Option<String>,
    priority: Option<i32>,
    page: Option<u64>,
    limit: Option<u64>,
}

#[derive(Serialize)]
struct ReportView {
    id: i32,
    reporter_id: i32,
    content_kind: String,
    content_id: i32,
    reported_user_id: i32,
    reason: String,
    description: Option<String>,
    priority: i32,
    status: String,
    reviewer_id: Option<i32>,
    review_note: Option<String>,
    resolved_at: Option<chrono::NaiveDateTime>,
    created_at: chrono::NaiveDateTime,
}

impl ReportView {
    fn from_model(report: reports_orm::Model) -> Self {
        Self {
            id: report.id,
            reporter_id: report.reporter_id,
            content_kind: report.content_kind,
            content_id: report.content_id,
            reported_user_id: report.reported_user_id,
            reason: report.reason,
            description: report.description,
            priority: report.priority,
            status: report.status,
            reviewer_id: report.reviewer_id,
            review_note: report.review_note,
            resolved_at: report.resolved_at,
            created_at: report.created_at,
        }
    }
}

/// List reports, filterable by kind/status/priority. Most urgent first.
#[get("/api/moderation/reports")]
async fn list_reports(
    client: ClientCtx,
    config: web::Data<Arc<Config>>,
    query: web::Query<ReportsQuery>,
) -> Result<HttpResponse, ModerationError> {
    client.require_moderator()?;

    let db = get_db_pool();
    let filters = ReportFilters {
        kind: query.kind.clone(),
        status: query.status.clone(),
        priority: query.priority,
        page: query.page.unwrap_or(1),
        limit: query.limit.unwrap_or(0),
    };

    let (models, total) = reports::list_reports(db, &filters, config.queue_page_size()).await?;
    let (page, limit) =
        crate::moderation::clamp_page(filters.page, filters.limit, config.queue_page_size());

    // Per-status counts for the triage header, scoped to the kind filter.
    let mut status_counts = serde_json::Map::new();
    for status in [
        reports::REPORT_PENDING,
        reports::REPORT_REVIEWING,
        reports::REPORT_RESOLVED,
        reports::REPORT_DISMISSED,
    ] {
        let mut count_query =
            reports_orm::Entity::find().filter(reports_orm::Column::Status.eq(status));
        if let Some(kind) = &filters.kind {
            count_query = count_query.filter(reports_orm::Column::ContentKind.eq(kind.as_str()));
        }
        let count = count_query.count(db).await?;
        status_counts.insert(status.to_string(), json!(count));
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "reports": models.into_iter().map(ReportView::from_model).collect::<Vec<_>>(),
        "stats": status_counts,
        "pagination": Pagination::new(page, limit, total),
    })))
}

#[derive(Deserialize, Validate)]
struct DismissForm {
    #[validate(length(min = 1, message = "A dismissal note is required"))]
    note: String,
}

/// Dismiss a report as invalid. Terminal; no side effect on the target.
#[post("/api/moderation/reports/{id}/dismiss")]
async fn dismiss_report(
    client: ClientCtx,
    path: web::Path<i32>,
    form: web::Json<DismissForm>,
) -> Result<HttpResponse, ModerationError> {
    let moderator_id = client.require_moderator()?;

    form.validate()
        .map_err(|e| ModerationError::Validation(e.to_string()))?;

    let report_id = path.into_inner();
    reports::dismiss_report(get_db_pool(), report_id, moderator_id, &form.note).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Report dismissed",
        "report_id": report_id,
    })))
}

#[derive(Deserialize, Default)]
struct ResolveForm {
    /// Ban duration for user-kind reports; 0 = permanent. Defaults to 7.
    duration_days: Option<i64>,
}

/// Resolve a report: content reports remove the content, user reports ban
/// the user.
#[post("/api/moderation/reports/{id}/resolve")]
async fn resolve_report(
    client: ClientCtx,
    config: web::Data<Arc<Config>>,
    path: web::Path<i32>,
    form: Option<web::Json<ResolveForm>>,
) -> Result<HttpResponse, ModerationError> {
    let moderator_id = client.require_moderator()?;

    let report_id = path.into_inner();
    let duration_days = form.and_then(|f| f.into_inner().duration_days);

    let action = reports::resolve_report(
        get_db_pool(),
        report_id,
        moderator_id,
        duration_days,
        config.auto_ban_enabled(),
    )
    .await?;

    let message = match action {
        ResolveAction::ContentRemoved => "Report resolved; content removed",
        ResolveAction::ContentAlreadyRemoved => "Report resolved; content was already removed",
        ResolveAction::UserBanned => "Report resolved; user banned",
    };

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": message,
        "report_id": report_id,
    })))
}
