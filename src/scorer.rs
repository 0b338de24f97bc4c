//! Risk scorer client.
//!
//! The classification model itself is an external service; this module only
//! defines the contract the gate consumes: a profanity score and an NSFW
//! score, both 0..=100. Transport failures are surfaced as [`ScorerError`]
//! and the gate fails open to pending review, never to auto-approval.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Risk scores for a single submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskScore {
    /// 0..=100
    pub profanity: i32,
    /// 0..=100
    pub nsfw: i32,
}

impl RiskScore {
    pub fn new(profanity: i32, nsfw: i32) -> Self {
        Self {
            profanity: profanity.clamp(0, 100),
            nsfw: nsfw.clamp(0, 100),
        }
    }

    /// The gate thresholds against the worst of the two signals.
    pub fn combined(&self) -> i32 {
        self.profanity.max(self.nsfw)
    }
}

/// Scorer transport or decode failure.
#[derive(Debug, Clone)]
pub struct ScorerError {
    pub message: String,
}

impl std::fmt::Display for ScorerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Interface to the external content-classification model.
#[async_trait]
pub trait RiskScorer: Send + Sync {
    async fn score(&self, body: &str, media: &[String]) -> Result<RiskScore, ScorerError>;
}

#[derive(Serialize)]
struct ScoreRequest<'a> {
    content: &'a str,
    media: &'a [String],
}

#[derive(Deserialize)]
struct ScoreResponse {
    profanity: i32,
    nsfw: i32,
}

/// HTTP implementation against the scoring service.
pub struct HttpRiskScorer {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpRiskScorer {
    pub fn new(base_url: String, timeout_ms: u64, api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .expect("Failed to build scorer HTTP client");

        Self {
            client,
            base_url,
            api_key,
        }
    }

    /// Build a scorer from the application config.
    pub fn from_app_config() -> Self {
        let cfg = crate::app_config::scorer();
        Self::new(cfg.url, cfg.timeout_ms, cfg.api_key)
    }
}

#[async_trait]
impl RiskScorer for HttpRiskScorer {
    async fn score(&self, body: &str, media: &[String]) -> Result<RiskScore, ScorerError> {
        let url = format!("{}/v1/score", self.base_url.trim_end_matches('/'));

        let mut request = self
            .client
            .post(&url)
            .json(&ScoreRequest {
                content: body,
                media,
            });

        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await.map_err(|e| ScorerError {
            message: format!("request failed: {}", e),
        })?;

        if !response.status().is_success() {
            return Err(ScorerError {
                message: format!("scorer returned {}", response.status()),
            });
        }

        let scores: ScoreResponse = response.json().await.map_err(|e| ScorerError {
            message: format!("invalid scorer response: {}", e),
        })?;

        Ok(RiskScore::new(scores.profanity, scores.nsfw))
    }
}

/// Deterministic scorer for tests and local development without the model
/// service running.
pub struct StaticScorer {
    pub score: RiskScore,
}

impl StaticScorer {
    pub fn new(profanity: i32, nsfw: i32) -> Self {
        Self {
            score: RiskScore::new(profanity, nsfw),
        }
    }
}

#[async_trait]
impl RiskScorer for StaticScorer {
    async fn score(&self, _body: &str, _media: &[String]) -> Result<RiskScore, ScorerError> {
        Ok(self.score)
    }
}

/// Scorer that always fails, for exercising the fail-open path.
pub struct UnavailableScorer;

#[async_trait]
impl RiskScorer for UnavailableScorer {
    async fn score(&self, _body: &str, _media: &[String]) -> Result<RiskScore, ScorerError> {
        Err(ScorerError {
            message: "scorer offline".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scores_are_clamped() {
        let score = RiskScore::new(150, -20);
        assert_eq!(score.profanity, 100);
        assert_eq!(score.nsfw, 0);
    }

    #[test]
    fn test_combined_takes_the_worse_signal() {
        assert_eq!(RiskScore::new(30, 70).combined(), 70);
        assert_eq!(RiskScore::new(85, 10).combined(), 85);
    }
}
