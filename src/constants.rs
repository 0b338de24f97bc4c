//! Shared constants for the moderation domain.

/// Trust score bounds. Scores are clamped into this range on every write.
pub const TRUST_MIN: i32 = 0;
pub const TRUST_MAX: i32 = 100;

/// Trust score assigned to new accounts.
pub const TRUST_DEFAULT: i32 = 70;

/// Band edges used by the submission gate to pick thresholds.
pub const TRUST_UNTRUSTED: i32 = 20;
pub const TRUST_LOW: i32 = 50;
pub const TRUST_HIGH: i32 = 85;

/// Accounts younger than this are held to the low-trust band regardless
/// of their score.
pub const NEW_ACCOUNT_DAYS: i64 = 7;

/// Trust penalties by violation severity.
pub const TRUST_PENALTY_SEVERE: i32 = -15;
pub const TRUST_PENALTY_MODERATE: i32 = -10;
pub const TRUST_PENALTY_MINOR: i32 = -5;

/// Restitution applied when a rejection is overturned on appeal.
pub const TRUST_RESTITUTION: i32 = 5;

/// Violation count at which the auto-ban rule fires.
pub const AUTO_BAN_VIOLATIONS: i32 = 5;

/// Duration of an automatic ban, in days.
pub const AUTO_BAN_DAYS: i64 = 7;

/// Minimum length of an appeal reason.
pub const APPEAL_REASON_MIN: usize = 10;

/// Hard cap on queue page size.
pub const QUEUE_LIMIT_MAX: u64 = 100;
