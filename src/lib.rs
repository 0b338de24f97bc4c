pub mod app_config;
pub mod appeals;
pub mod cache;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod gate;
pub mod middleware;
pub mod moderation;
pub mod orm;
pub mod rate_limit;
pub mod reports;
pub mod scorer;
pub mod screen;
pub mod status_sync;
pub mod trust;
pub mod web;
