//! Submission gate.
//!
//! Routes every new post or comment to auto-approved, auto-rejected or
//! pending review. Order of checks: active ban (before any scoring), the
//! local screen, then the remote risk scorer. A scorer outage fails open to
//! pending review so nothing bypasses moderation during a dependency
//! outage. Exactly one log entry is appended per decision.

use crate::cache::{self, AuthorProfile};
use crate::config::Config;
use crate::error::ModerationError;
use crate::moderation::{self, ContentKind, ContentModel};
use crate::orm::{comments, posts, users};
use crate::scorer::{RiskScore, RiskScorer};
use crate::trust::{self, BanStatus, Severity};
use crate::{rate_limit, screen};
use chrono::Utc;
use sea_orm::{entity::*, query::*, ActiveValue::Set, DatabaseConnection};

/// Hard cap on submission body length.
const BODY_MAX: usize = 50_000;

/// Gate decision for a scored submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
    Hold,
}

/// Thresholds effective for one author after trust modulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// Combined score below this auto-approves.
    pub approve_below: i32,
    /// Combined score at or above this auto-rejects.
    pub reject_at: i32,
}

/// Modulate the configured base thresholds by the author's trust band.
/// Lower trust tightens both ends; accounts younger than a week are held
/// to the new-account band regardless of score.
pub fn effective_thresholds(
    base_approve: i32,
    base_reject: i32,
    trust_score: i32,
    account_age_days: i64,
) -> Thresholds {
    use crate::constants::*;

    let mut approve_below = if trust_score >= TRUST_HIGH {
        base_approve + 40
    } else if trust_score >= TRUST_LOW {
        base_approve + 20
    } else if trust_score >= TRUST_UNTRUSTED {
        base_approve
    } else {
        10
    };

    if account_age_days < NEW_ACCOUNT_DAYS {
        approve_below = approve_below.min(20);
    }

    let reject_at = if trust_score < TRUST_UNTRUSTED {
        base_reject - 20
    } else {
        base_reject
    };

    let reject_at = reject_at.clamp(1, 100);

    Thresholds {
        approve_below: approve_below.clamp(0, reject_at - 1),
        reject_at,
    }
}

/// Pure decision rule over a combined score.
pub fn decide(combined_score: i32, thresholds: Thresholds) -> Decision {
    if combined_score >= thresholds.reject_at {
        Decision::Reject
    } else if combined_score < thresholds.approve_below {
        Decision::Approve
    } else {
        Decision::Hold
    }
}

/// Outcome handed back to the submitting client.
#[derive(Debug)]
pub struct SubmissionOutcome {
    pub content: ContentModel,
    /// Log action recorded for the decision.
    pub action: &'static str,
}

impl SubmissionOutcome {
    pub fn status(&self) -> &str {
        self.content.moderation_status()
    }
}

/// Load the author's moderation profile, via the cache.
async fn load_author_profile(
    db: &DatabaseConnection,
    author_id: i32,
) -> Result<AuthorProfile, ModerationError> {
    if let Some(profile) = cache::get_author_profile(author_id) {
        return Ok(profile);
    }

    let user = users::Entity::find_by_id(author_id)
        .one(db)
        .await?
        .ok_or(ModerationError::NotFound("User"))?;

    let profile = AuthorProfile {
        trust_score: user.trust_score,
        violations: user.violations,
        is_banned: user.is_banned,
        banned_until: user.banned_until,
        created_at: user.created_at,
    };
    cache::store_author_profile(author_id, profile.clone());

    Ok(profile)
}

/// The scored decision shared by posts and comments. Returns the status,
/// the log action, the decision reason and the effective text score.
struct GateRun {
    status: &'static str,
    action: &'static str,
    reason: Option<String>,
    score: RiskScore,
    severe: bool,
}

async fn run_gate(
    scorer: &dyn RiskScorer,
    config: &Config,
    profile: &AuthorProfile,
    author_id: i32,
    body: &str,
    media: &[String],
) -> GateRun {
    // Layer 1: local screen. A hard block rejects without scoring.
    let screened = screen::screen_content(author_id, body, config.screen_max_urls());
    if screened.blocked {
        return GateRun {
            status: moderation::STATUS_REJECTED,
            action: moderation::ACTION_AUTO_REJECTED,
            reason: screened.reason,
            score: RiskScore::new(100, 0),
            severe: true,
        };
    }

    // Layer 2: the external model. Fail open to pending, never to approval.
    let score = match scorer.score(body, media).await {
        Ok(score) => score,
        Err(err) => {
            log::warn!("Risk scorer unavailable, holding for review: {}", err);
            return GateRun {
                status: moderation::STATUS_PENDING,
                action: moderation::ACTION_PENDING_REVIEW,
                reason: Some("Automatic scoring unavailable".to_string()),
                score: RiskScore::default(),
                severe: false,
            };
        }
    };

    let score = RiskScore::new(score.profanity.max(screened.score), score.nsfw);

    let account_age_days = (Utc::now().naive_utc() - profile.created_at).num_days();
    let thresholds = effective_thresholds(
        config.auto_approve_below(),
        config.auto_reject_at(),
        profile.trust_score,
        account_age_days,
    );

    match decide(score.combined(), thresholds) {
        Decision::Approve => GateRun {
            status: moderation::STATUS_APPROVED,
            action: moderation::ACTION_AUTO_APPROVED,
            reason: None,
            score,
            severe: false,
        },
        Decision::Reject => GateRun {
            status: moderation::STATUS_REJECTED,
            action: moderation::ACTION_AUTO_REJECTED,
            reason: Some("Content violates community guidelines".to_string()),
            score,
            severe: true,
        },
        Decision::Hold => GateRun {
            status: moderation::STATUS_PENDING,
            action: moderation::ACTION_PENDING_REVIEW,
            reason: Some("Held for moderator review".to_string()),
            score,
            severe: false,
        },
    }
}

fn validate_body(body: &str) -> Result<(), ModerationError> {
    if body.trim().is_empty() {
        return Err(ModerationError::Validation(
            "Content body must not be empty".to_string(),
        ));
    }
    if body.len() > BODY_MAX {
        return Err(ModerationError::Validation(format!(
            "Content body exceeds {} characters",
            BODY_MAX
        )));
    }
    Ok(())
}

fn check_ban(profile: &AuthorProfile) -> Result<(), ModerationError> {
    let status = BanStatus::evaluate(
        profile.is_banned,
        profile.banned_until,
        None,
        Utc::now().naive_utc(),
    );
    if status.banned {
        let until = status
            .until
            .map(|u| format!(" until {}", u.format("%Y-%m-%d %H:%M")))
            .unwrap_or_else(|| " permanently".to_string());
        return Err(ModerationError::Forbidden(format!(
            "Account is banned{}. You may appeal this decision.",
            until
        )));
    }
    Ok(())
}

/// Submit a new post through the gate.
pub async fn submit_post(
    db: &DatabaseConnection,
    scorer: &dyn RiskScorer,
    config: &Config,
    author_id: i32,
    body: &str,
    media: Option<Vec<String>>,
    visibility: &str,
) -> Result<SubmissionOutcome, ModerationError> {
    validate_body(body)?;
    if !["public", "friends", "private"].contains(&visibility) {
        return Err(ModerationError::Validation(
            "Invalid visibility".to_string(),
        ));
    }

    let profile = load_author_profile(db, author_id).await?;
    check_ban(&profile)?;
    rate_limit::check_post_submission_rate_limit(author_id)?;

    let media = media.unwrap_or_default();
    let run = run_gate(scorer, config, &profile, author_id, body, &media).await;

    let now = Utc::now().naive_utc();
    let model = posts::ActiveModel {
        user_id: Set(author_id),
        body: Set(body.trim().to_string()),
        media: Set(if media.is_empty() {
            None
        } else {
            Some(serde_json::json!(media))
        }),
        visibility: Set(visibility.to_string()),
        moderation_status: Set(run.status.to_string()),
        moderation_reason: Set(run.reason.clone()),
        profanity_score: Set(run.score.profanity),
        nsfw_score: Set(run.score.nsfw),
        auto_moderated: Set(true),
        was_published: Set(false),
        reviewed_by: Set(None),
        reviewed_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    finish_submission(
        db,
        config,
        ContentKind::Post,
        model.id,
        author_id,
        &run,
    )
    .await?;

    Ok(SubmissionOutcome {
        content: ContentModel::Post(model),
        action: run.action,
    })
}

/// Submit a new comment through the gate.
pub async fn submit_comment(
    db: &DatabaseConnection,
    scorer: &dyn RiskScorer,
    config: &Config,
    author_id: i32,
    post_id: i32,
    body: &str,
) -> Result<SubmissionOutcome, ModerationError> {
    validate_body(body)?;

    // The parent must exist and be visible.
    let post = posts::Entity::find_by_id(post_id)
        .one(db)
        .await?
        .ok_or(ModerationError::NotFound("Post"))?;
    if post.moderation_status == moderation::STATUS_REJECTED {
        return Err(ModerationError::NotFound("Post"));
    }

    let profile = load_author_profile(db, author_id).await?;
    check_ban(&profile)?;
    rate_limit::check_comment_submission_rate_limit(author_id)?;

    let run = run_gate(scorer, config, &profile, author_id, body, &[]).await;

    let now = Utc::now().naive_utc();
    let model = comments::ActiveModel {
        post_id: Set(post_id),
        user_id: Set(author_id),
        body: Set(body.trim().to_string()),
        moderation_status: Set(run.status.to_string()),
        moderation_reason: Set(run.reason.clone()),
        profanity_score: Set(run.score.profanity),
        nsfw_score: Set(run.score.nsfw),
        auto_moderated: Set(true),
        was_published: Set(false),
        reviewed_by: Set(None),
        reviewed_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    finish_submission(
        db,
        config,
        ContentKind::Comment,
        model.id,
        author_id,
        &run,
    )
    .await?;

    Ok(SubmissionOutcome {
        content: ContentModel::Comment(model),
        action: run.action,
    })
}

/// Shared post-insert bookkeeping: the single log entry per decision, and
/// the violation record for auto-rejections.
async fn finish_submission(
    db: &DatabaseConnection,
    config: &Config,
    kind: ContentKind,
    content_id: i32,
    author_id: i32,
    run: &GateRun,
) -> Result<(), ModerationError> {
    let trust_change = if run.severe {
        Some(Severity::Severe.trust_delta())
    } else {
        None
    };

    moderation::log_action(
        db,
        author_id,
        None,
        kind.as_str(),
        content_id,
        run.action,
        run.reason.as_deref().unwrap_or("Content approved"),
        None,
        trust_change,
    )
    .await?;

    if run.severe {
        trust::record_violation(db, author_id, Severity::Severe, config.auto_ban_enabled())
            .await?;
    }

    log::info!(
        "{} {} gate decision: {} ({})",
        kind.as_str(),
        content_id,
        run.status,
        run.action
    );

    Ok(())
}
