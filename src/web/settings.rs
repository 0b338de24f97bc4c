//! Runtime settings endpoints (admin only)
//!
//! Moderation thresholds, queue sizes and rate limits are database-backed
//! and hot-reloadable; updating a rate-limit key re-applies the limiter
//! configuration immediately.

use crate::config::{Config, SettingValue};
use crate::db::get_db_pool;
use crate::error::ModerationError;
use crate::middleware::ClientCtx;
use crate::orm::settings;
use crate::rate_limit;
use actix_web::{get, post, web, HttpResponse};
use sea_orm::{entity::*, query::*};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(list_settings).service(update_setting);
}

/// List all runtime settings grouped by category.
#[get("/api/moderation/settings")]
async fn list_settings(client: ClientCtx) -> Result<HttpResponse, ModerationError> {
    client.require_admin()?;

    let rows = settings::Entity::find()
        .order_by_asc(settings::Column::Category)
        .order_by_asc(settings::Column::Key)
        .all(get_db_pool())
        .await?;

    let items: Vec<serde_json::Value> = rows
        .into_iter()
        .map(|s| {
            json!({
                "key": s.key,
                "value": s.value,
                "value_type": s.value_type,
                "category": s.category,
                "description": s.description,
                "updated_at": s.updated_at,
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "settings": items,
    })))
}

#[derive(Deserialize)]
struct UpdateSettingForm {
    key: String,
    value: String,
    /// "string", "int", "bool" or "json"
    value_type: String,
}

/// Update a runtime setting. Rate-limit keys take effect immediately.
#[post("/api/moderation/settings")]
async fn update_setting(
    client: ClientCtx,
    config: web::Data<Arc<Config>>,
    form: web::Json<UpdateSettingForm>,
) -> Result<HttpResponse, ModerationError> {
    let admin_id = client.require_admin()?;

    let value = SettingValue::parse(&form.value, &form.value_type).ok_or_else(|| {
        ModerationError::Validation(format!(
            "Value '{}' does not parse as {}",
            form.value, form.value_type
        ))
    })?;

    config
        .set_value(get_db_pool(), &form.key, value, Some(admin_id))
        .await?;

    if form.key.starts_with("rate_limit.") {
        rate_limit::reload_rate_limits(config.get_ref());
    }

    log::info!("Setting {} updated by admin {}", form.key, admin_id);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "key": form.key,
    })))
}
