pub mod appeals;
pub mod comments;
pub mod feature_flags;
pub mod moderation_log;
pub mod posts;
pub mod reports;
pub mod sessions;
pub mod settings;
pub mod users;
