//! In-memory caching for frequently accessed data.
//! Uses moka for TTL-based caching with LRU eviction.

use moka::sync::Cache;
use once_cell::sync::Lazy;
use std::time::Duration;

/// Cached moderation profile for an author, read by the submission gate on
/// every submission. Only trust-module writes invalidate it, so the TTL is
/// a backstop, not the consistency mechanism.
#[derive(Clone, Debug)]
pub struct AuthorProfile {
    pub trust_score: i32,
    pub violations: i32,
    pub is_banned: bool,
    pub banned_until: Option<chrono::NaiveDateTime>,
    pub created_at: chrono::NaiveDateTime,
}

/// Cache for author profiles with 30 second TTL.
/// Key is user_id.
static AUTHOR_PROFILE_CACHE: Lazy<Cache<i32, AuthorProfile>> = Lazy::new(|| {
    Cache::builder()
        .time_to_live(Duration::from_secs(30))
        .max_capacity(10_000)
        .build()
});

/// Get a cached author profile, if present.
pub fn get_author_profile(user_id: i32) -> Option<AuthorProfile> {
    AUTHOR_PROFILE_CACHE.get(&user_id)
}

/// Store an author profile after a database read.
pub fn store_author_profile(user_id: i32, profile: AuthorProfile) {
    AUTHOR_PROFILE_CACHE.insert(user_id, profile);
}

/// Invalidate the cached profile for a user.
/// Called by every trust/ban mutation so the gate never acts on a stale
/// ban decision.
pub fn invalidate_author_profile(user_id: i32) {
    AUTHOR_PROFILE_CACHE.invalidate(&user_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn profile(trust: i32, banned: bool) -> AuthorProfile {
        AuthorProfile {
            trust_score: trust,
            violations: 0,
            is_banned: banned,
            banned_until: None,
            created_at: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn test_cache_insert_and_get() {
        store_author_profile(9001, profile(70, false));

        let cached = get_author_profile(9001);
        assert!(cached.is_some());
        assert_eq!(cached.unwrap().trust_score, 70);

        // Clean up
        invalidate_author_profile(9001);
    }

    #[test]
    fn test_cache_invalidation() {
        store_author_profile(9002, profile(50, true));
        assert!(get_author_profile(9002).is_some());

        invalidate_author_profile(9002);
        assert!(get_author_profile(9002).is_none());
    }
}
