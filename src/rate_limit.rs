/// Rate limiting module for preventing abuse
///
/// Implements sliding window rate limiting using in-memory storage (DashMap).
/// This is suitable for single-instance deployments. For multi-instance
/// deployments, consider using a shared backing store.
///
/// Rate limits are configurable via database settings and support hot reload.
use arc_swap::ArcSwap;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;

/// Global rate limiter instance
pub static RATE_LIMITER: Lazy<Arc<RateLimiter>> = Lazy::new(|| Arc::new(RateLimiter::new()));

/// Global rate limit configuration (hot-reloadable)
static RATE_LIMIT_CONFIG: Lazy<ArcSwap<RateLimitConfig>> =
    Lazy::new(|| ArcSwap::from_pointee(RateLimitConfig::default()));

/// Rate limit configuration loaded from database settings
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    // Content submission
    pub post_submission_max: usize,
    pub post_submission_window: Duration,
    pub comment_submission_max: usize,
    pub comment_submission_window: Duration,

    // Reports: shared counter per (reporter, target) plus a per-reporter cap
    pub report_max: usize,
    pub report_window: Duration,
    pub report_per_target_max: usize,
    pub report_per_target_window: Duration,

    // Appeals
    pub appeal_max: usize,
    pub appeal_window: Duration,

    // General API (status polling etc.)
    pub api_max: usize,
    pub api_window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            post_submission_max: 10,
            post_submission_window: Duration::from_secs(60), // 1 minute
            comment_submission_max: 20,
            comment_submission_window: Duration::from_secs(60), // 1 minute

            report_max: 5,
            report_window: Duration::from_secs(300), // 5 minutes
            report_per_target_max: 1,
            report_per_target_window: Duration::from_secs(600), // 10 minutes

            appeal_max: 3,
            appeal_window: Duration::from_secs(3600), // 1 hour

            api_max: 60,
            api_window: Duration::from_secs(60), // 1 minute
        }
    }
}

impl RateLimitConfig {
    /// Load rate limit configuration from the Config settings
    pub fn from_config(config: &Config) -> Self {
        Self {
            post_submission_max: config.get_int_or("rate_limit.post_submission.max_requests", 10)
                as usize,
            post_submission_window: Duration::from_secs(
                config.get_int_or("rate_limit.post_submission.window_seconds", 60) as u64,
            ),
            comment_submission_max: config
                .get_int_or("rate_limit.comment_submission.max_requests", 20)
                as usize,
            comment_submission_window: Duration::from_secs(
                config.get_int_or("rate_limit.comment_submission.window_seconds", 60) as u64,
            ),

            report_max: config.get_int_or("rate_limit.report.max_requests", 5) as usize,
            report_window: Duration::from_secs(
                config.get_int_or("rate_limit.report.window_seconds", 300) as u64,
            ),
            report_per_target_max: config.get_int_or("rate_limit.report_per_target.max_requests", 1)
                as usize,
            report_per_target_window: Duration::from_secs(
                config.get_int_or("rate_limit.report_per_target.window_seconds", 600) as u64,
            ),

            appeal_max: config.get_int_or("rate_limit.appeal.max_requests", 3) as usize,
            appeal_window: Duration::from_secs(
                config.get_int_or("rate_limit.appeal.window_seconds", 3600) as u64,
            ),

            api_max: config.get_int_or("rate_limit.api.max_requests", 60) as usize,
            api_window: Duration::from_secs(
                config.get_int_or("rate_limit.api.window_seconds", 60) as u64,
            ),
        }
    }
}

/// Initialize rate limits from config (call at startup after loading settings)
pub fn init_rate_limits(config: &Config) {
    let rate_config = RateLimitConfig::from_config(config);
    RATE_LIMIT_CONFIG.store(Arc::new(rate_config));
    log::info!("Rate limit configuration initialized from database settings");
}

/// Reload rate limits from config (call when rate limit settings are changed)
pub fn reload_rate_limits(config: &Config) {
    let rate_config = RateLimitConfig::from_config(config);
    RATE_LIMIT_CONFIG.store(Arc::new(rate_config));
    log::info!("Rate limit configuration reloaded");
}

/// Get the current rate limit configuration
pub fn get_rate_limit_config() -> Arc<RateLimitConfig> {
    RATE_LIMIT_CONFIG.load_full()
}

/// Rate limiter using in-memory storage
pub struct RateLimiter {
    /// Map of (action_type:identifier) -> Request timestamps
    requests: DashMap<String, Vec<Instant>>,
}

/// Error returned when rate limit is exceeded
#[derive(Debug, Clone)]
pub struct RateLimitError {
    /// Number of seconds until the rate limit resets
    pub retry_after_seconds: u64,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new() -> Self {
        Self {
            requests: DashMap::new(),
        }
    }

    /// Check if a request should be rate limited
    ///
    /// # Arguments
    /// * `action` - The action being rate limited (e.g., "report", "appeal")
    /// * `identifier` - Unique identifier for the requester
    /// * `max_requests` - Maximum number of requests allowed in the window
    /// * `window` - Time window for the rate limit
    ///
    /// # Returns
    /// * `Ok(())` if the request is allowed
    /// * `Err(RateLimitError)` if the rate limit is exceeded
    pub fn check_rate_limit(
        &self,
        action: &str,
        identifier: &str,
        max_requests: usize,
        window: Duration,
    ) -> Result<(), RateLimitError> {
        let key = format!("{}:{}", action, identifier);
        let now = Instant::now();

        let mut entry = self.requests.entry(key).or_default();

        // Remove requests outside the time window (sliding window)
        entry.retain(|&timestamp| now.duration_since(timestamp) < window);

        if entry.len() >= max_requests {
            // Calculate how long until the oldest request expires
            let oldest = entry[0];
            let retry_after = window.saturating_sub(now.duration_since(oldest));

            return Err(RateLimitError {
                retry_after_seconds: retry_after.as_secs() + 1, // Round up
            });
        }

        entry.push(now);

        Ok(())
    }

    /// Clean up old entries to prevent memory leaks
    ///
    /// Should be called periodically (e.g., every 5 minutes) to remove
    /// entries for keys that haven't been used recently.
    pub fn cleanup_old_entries(&self) {
        self.requests.retain(|_, timestamps| !timestamps.is_empty());
    }

    /// Get the current request count for a specific action/identifier
    pub fn get_request_count(&self, action: &str, identifier: &str, window: Duration) -> u32 {
        let key = format!("{}:{}", action, identifier);
        let now = Instant::now();

        if let Some(entry) = self.requests.get(&key) {
            entry
                .iter()
                .filter(|&&timestamp| now.duration_since(timestamp) < window)
                .count() as u32
        } else {
            0
        }
    }

    /// Clear all requests for a specific action/identifier
    pub fn clear_requests(&self, action: &str, identifier: &str) {
        let key = format!("{}:{}", action, identifier);
        self.requests.remove(&key);
    }

    /// Get the number of tracked keys (for monitoring/debugging)
    pub fn tracked_keys_count(&self) -> usize {
        self.requests.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Helper functions for common rate-limited actions
// ============================================================================

/// Check rate limit for post submission
///
/// Uses configurable limit per user
pub fn check_post_submission_rate_limit(user_id: i32) -> Result<(), RateLimitError> {
    let config = get_rate_limit_config();
    RATE_LIMITER.check_rate_limit(
        "post_submission",
        &user_id.to_string(),
        config.post_submission_max,
        config.post_submission_window,
    )
}

/// Check rate limit for comment submission
///
/// Uses configurable limit per user
pub fn check_comment_submission_rate_limit(user_id: i32) -> Result<(), RateLimitError> {
    let config = get_rate_limit_config();
    RATE_LIMITER.check_rate_limit(
        "comment_submission",
        &user_id.to_string(),
        config.comment_submission_max,
        config.comment_submission_window,
    )
}

/// Check rate limit for report submissions
///
/// Two counters: an overall per-reporter cap, and a shared per
/// (reporter, target) counter that stops duplicate-report flooding before
/// the database is consulted.
pub fn check_report_rate_limit(
    reporter_id: i32,
    content_kind: &str,
    content_id: i32,
) -> Result<(), RateLimitError> {
    let config = get_rate_limit_config();
    RATE_LIMITER.check_rate_limit(
        "report",
        &reporter_id.to_string(),
        config.report_max,
        config.report_window,
    )?;
    RATE_LIMITER.check_rate_limit(
        "report_target",
        &format!("{}:{}:{}", reporter_id, content_kind, content_id),
        config.report_per_target_max,
        config.report_per_target_window,
    )
}

/// Reset the per-target report counter once a report is handled, so a
/// reporter may legitimately refile against the same target after their
/// first report was dismissed or resolved.
pub fn clear_report_target(reporter_id: i32, content_kind: &str, content_id: i32) {
    RATE_LIMITER.clear_requests(
        "report_target",
        &format!("{}:{}:{}", reporter_id, content_kind, content_id),
    );
}

/// Check rate limit for appeal filing
///
/// Uses configurable limit per user
pub fn check_appeal_rate_limit(user_id: i32) -> Result<(), RateLimitError> {
    let config = get_rate_limit_config();
    RATE_LIMITER.check_rate_limit(
        "appeal",
        &user_id.to_string(),
        config.appeal_max,
        config.appeal_window,
    )
}

/// Check rate limit for general API requests
///
/// Applies to: status polling, queue reads, etc.
pub fn check_api_rate_limit(identifier: &str) -> Result<(), RateLimitError> {
    let config = get_rate_limit_config();
    RATE_LIMITER.check_rate_limit("api", identifier, config.api_max, config.api_window)
}

/// Periodic cleanup entry point, spawned as an interval task by the binary.
pub fn cleanup_old_entries_public() {
    RATE_LIMITER.cleanup_old_entries();
}
