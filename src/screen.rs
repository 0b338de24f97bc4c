//! Local submission screen.
//!
//! Cheap, synchronous checks that run before the remote risk scorer is
//! consulted: link limits, shortener blacklist, near-duplicate detection and
//! a couple of shape heuristics. A hard block here rejects the submission
//! outright; soft findings only raise the effective risk score handed to
//! the gate's thresholds.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::{Duration, Instant};

/// URL pattern for detecting links in content
static URL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://[^\s\])<>]+").expect("Invalid URL regex"));

/// Shortened / throwaway domains that reports consistently trace back to.
const BLACKLISTED_DOMAINS: &[&str] = &[
    "bit.ly",
    "tinyurl.com",
    "goo.gl",
    "t.co",
    "ow.ly",
    "adf.ly",
    "bc.vc",
    "ouo.io",
];

/// How long a submission stays in the duplicate window.
const DUPLICATE_WINDOW: Duration = Duration::from_secs(600);

/// Similarity ratio above which two bodies count as the same submission.
const DUPLICATE_SIMILARITY: f32 = 0.85;

/// Recent submissions per author, for duplicate detection.
/// In-memory; a restart forgives, which is acceptable for a spam screen.
static RECENT_SUBMISSIONS: Lazy<DashMap<i32, Vec<(String, Instant)>>> = Lazy::new(DashMap::new);

/// Result of the local screen
#[derive(Debug, Clone)]
pub struct ScreenResult {
    /// Hard block: reject without consulting the scorer.
    pub blocked: bool,
    pub reason: Option<String>,
    /// Soft signal, 0..=100, folded into the risk score.
    pub score: i32,
}

impl ScreenResult {
    fn passed() -> Self {
        Self {
            blocked: false,
            reason: None,
            score: 0,
        }
    }

    fn blocked(reason: String) -> Self {
        Self {
            blocked: true,
            reason: Some(reason),
            score: 100,
        }
    }
}

/// Run the local screen over a submission body.
///
/// `max_urls` comes from the runtime config. The duplicate check records the
/// body on every non-blocked pass; call [`clear_recent_submissions`] once
/// the content is approved so an author can legitimately repost after an
/// appeal.
pub fn screen_content(author_id: i32, body: &str, max_urls: usize) -> ScreenResult {
    if body.trim().len() < 2 {
        return ScreenResult::passed();
    }

    // Link checks
    let urls: Vec<&str> = URL_REGEX.find_iter(body).map(|m| m.as_str()).collect();

    if urls.len() > max_urls {
        return ScreenResult::blocked(format!(
            "Too many links ({} allowed, found {})",
            max_urls,
            urls.len()
        ));
    }

    for raw in &urls {
        match url::Url::parse(raw) {
            Ok(parsed) => {
                let host = parsed.host_str().unwrap_or("").to_lowercase();
                if BLACKLISTED_DOMAINS.iter().any(|d| host.ends_with(d)) {
                    return ScreenResult::blocked(format!("Link to blocked domain: {}", host));
                }
            }
            Err(_) => {
                return ScreenResult::blocked("Malformed link in content".to_string());
            }
        }
    }

    // Duplicate check against the author's recent submissions
    if let Some(similarity) = check_duplicate(author_id, body) {
        return ScreenResult::blocked(format!(
            "Duplicate of a recent submission ({}% similar)",
            (similarity * 100.0).round() as i32
        ));
    }

    // Soft heuristics
    let mut score = 0;

    if has_repeated_characters(body, 5) {
        score += 15;
    }

    if body.len() > 30 {
        let alpha: Vec<char> = body.chars().filter(|c| c.is_alphabetic()).collect();
        if !alpha.is_empty() {
            let caps_ratio =
                alpha.iter().filter(|c| c.is_uppercase()).count() as f32 / alpha.len() as f32;
            if caps_ratio > 0.8 {
                score += 25;
            }
        }
    }

    if body.len() < 50 && !urls.is_empty() {
        score += 20;
    }

    ScreenResult {
        blocked: false,
        reason: None,
        score,
    }
}

/// Forget an author's duplicate window (e.g. after approval).
pub fn clear_recent_submissions(author_id: i32) {
    RECENT_SUBMISSIONS.remove(&author_id);
}

/// Periodic cleanup of expired duplicate-window entries.
pub fn cleanup_recent_submissions() {
    let now = Instant::now();
    RECENT_SUBMISSIONS.retain(|_, entries| {
        entries.retain(|(_, at)| now.duration_since(*at) < DUPLICATE_WINDOW);
        !entries.is_empty()
    });
}

/// Returns the similarity ratio when the body duplicates a recent
/// submission, recording the body otherwise.
fn check_duplicate(author_id: i32, body: &str) -> Option<f32> {
    let now = Instant::now();
    let mut entry = RECENT_SUBMISSIONS.entry(author_id).or_default();

    entry.retain(|(_, at)| now.duration_since(*at) < DUPLICATE_WINDOW);

    for (previous, _) in entry.iter() {
        let ratio = similarity(previous, body);
        if ratio >= DUPLICATE_SIMILARITY {
            return Some(ratio);
        }
    }

    entry.push((body.to_string(), now));
    None
}

/// Character-level similarity of two strings, 0.0..=1.0.
fn similarity(a: &str, b: &str) -> f32 {
    if a == b {
        return 1.0;
    }
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }

    let shared: usize = dissimilar::diff(a, b)
        .iter()
        .map(|chunk| match chunk {
            dissimilar::Chunk::Equal(text) => text.chars().count(),
            _ => 0,
        })
        .sum();

    shared as f32 / longest as f32
}

/// Check if content has repeated characters (e.g., "aaaaaaa")
fn has_repeated_characters(content: &str, threshold: usize) -> bool {
    let mut prev_char = '\0';
    let mut count = 1;

    for c in content.chars() {
        if c == prev_char && c.is_alphabetic() {
            count += 1;
            if count >= threshold {
                return true;
            }
        } else {
            count = 1;
            prev_char = c;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    // Author ids in tests are spaced out so the shared duplicate window
    // never crosses between tests.

    #[test]
    fn test_clean_content_passes() {
        let result = screen_content(100, "A normal post about gardening.", 3);
        assert!(!result.blocked);
        assert_eq!(result.score, 0);
    }

    #[test]
    fn test_too_many_urls_blocked() {
        let body = "http://a.com http://b.com http://c.com http://d.com";
        let result = screen_content(101, body, 3);
        assert!(result.blocked);
        assert!(result.reason.unwrap().contains("links"));
    }

    #[test]
    fn test_blacklisted_domain_blocked() {
        let result = screen_content(102, "look at this https://bit.ly/xyz now", 3);
        assert!(result.blocked);
        assert!(result.reason.unwrap().contains("bit.ly"));
    }

    #[test]
    fn test_exact_duplicate_blocked() {
        let body = "This exact text, posted twice in a row.";
        assert!(!screen_content(103, body, 3).blocked);

        let second = screen_content(103, body, 3);
        assert!(second.blocked);
        assert!(second.reason.unwrap().contains("Duplicate"));
    }

    #[test]
    fn test_near_duplicate_blocked() {
        assert!(!screen_content(104, "Buy my handmade candles, link in bio!!", 3).blocked);
        let second = screen_content(104, "Buy my handmade candles, link in bio!", 3);
        assert!(second.blocked);
    }

    #[test]
    fn test_duplicate_window_is_per_author() {
        let body = "Identical text from two different people.";
        assert!(!screen_content(105, body, 3).blocked);
        assert!(!screen_content(106, body, 3).blocked);
    }

    #[test]
    fn test_clear_recent_submissions_resets_window() {
        let body = "Posting this again after my appeal went through.";
        assert!(!screen_content(107, body, 3).blocked);
        clear_recent_submissions(107);
        assert!(!screen_content(107, body, 3).blocked);
    }

    #[test]
    fn test_all_caps_raises_score() {
        let result = screen_content(108, "WHY IS EVERYONE IGNORING MY EXTREMELY URGENT POST", 3);
        assert!(!result.blocked);
        assert!(result.score >= 25);
    }

    #[test]
    fn test_repeated_characters_raise_score() {
        let result = screen_content(109, "Wooooooow this is amaziiiiing", 3);
        assert!(!result.blocked);
        assert!(result.score >= 15);
    }

    #[test]
    fn test_similarity_bounds() {
        assert_eq!(similarity("same", "same"), 1.0);
        assert!(similarity("abcdef", "uvwxyz") < 0.3);
    }
}
