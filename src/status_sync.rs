//! Status sync.
//!
//! A client that just submitted pending content has no push channel; it
//! polls the status read until the item leaves `pending` or the attempt
//! budget runs out. The server keeps no polling state — the loop here is
//! the client side of the contract, bounded and cancellable (dropping the
//! future abandons it with nothing to clean up).

use crate::error::ModerationError;
use crate::moderation::{self, ContentKind};
use sea_orm::DatabaseConnection;
use std::time::Duration;

/// Polling policy: how often and how many times.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 10,
        }
    }
}

impl PollPolicy {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            interval: Duration::from_millis(config.poll_interval_ms()),
            max_attempts: config.poll_max_attempts(),
        }
    }
}

/// Current moderation state of one item, as returned to the polling client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusView {
    pub kind: ContentKind,
    pub id: i32,
    pub status: String,
    pub reason: Option<String>,
    /// What the client should do: "keep", "remove" or "wait".
    pub advice: &'static str,
}

/// Terminal outcome of a polling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Keep the item; it is published.
    Approved,
    /// Remove the item locally; the appeal flow is available.
    Rejected { reason: Option<String> },
    /// Attempt budget exhausted while still pending.
    TimedOut,
}

fn advice_for(status: &str) -> &'static str {
    match status {
        moderation::STATUS_APPROVED => "keep",
        moderation::STATUS_REJECTED => "remove",
        _ => "wait",
    }
}

/// Single status read.
pub async fn get_status(
    db: &DatabaseConnection,
    kind: ContentKind,
    id: i32,
) -> Result<StatusView, ModerationError> {
    let content = moderation::find_content(db, kind, id)
        .await?
        .ok_or(ModerationError::NotFound("Content"))?;

    Ok(StatusView {
        kind,
        id,
        advice: advice_for(content.moderation_status()),
        status: content.moderation_status().to_string(),
        reason: content.moderation_reason().map(|r| r.to_string()),
    })
}

/// Poll until the item leaves `pending` or the budget is exhausted.
///
/// Read-only: abandoning the loop needs no server-side cleanup.
pub async fn poll_until_resolved(
    db: &DatabaseConnection,
    kind: ContentKind,
    id: i32,
    policy: PollPolicy,
) -> Result<PollOutcome, ModerationError> {
    for attempt in 0..policy.max_attempts {
        if attempt > 0 {
            actix_web::rt::time::sleep(policy.interval).await;
        }

        let view = get_status(db, kind, id).await?;
        match view.status.as_str() {
            moderation::STATUS_APPROVED => return Ok(PollOutcome::Approved),
            moderation::STATUS_REJECTED => {
                return Ok(PollOutcome::Rejected {
                    reason: view.reason,
                })
            }
            _ => {}
        }
    }

    Ok(PollOutcome::TimedOut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_bounded() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(1));
        assert_eq!(policy.max_attempts, 10);
    }

    #[test]
    fn test_advice_mapping() {
        assert_eq!(advice_for("approved"), "keep");
        assert_eq!(advice_for("rejected"), "remove");
        assert_eq!(advice_for("pending"), "wait");
    }
}
