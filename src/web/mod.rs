pub mod appeals;
pub mod bans;
pub mod content;
pub mod decisions;
pub mod reports;
pub mod review;
pub mod settings;
pub mod stats;

use serde::Serialize;

/// Pagination block attached to every listing response.
#[derive(Serialize)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub pages: u64,
}

impl Pagination {
    pub fn new(page: u64, limit: u64, total: usize) -> Self {
        let total = total as u64;
        Self {
            page,
            limit,
            total,
            pages: if limit == 0 { 0 } else { (total + limit - 1) / limit },
        }
    }
}

/// Configures the web app by adding services from each web file.
///
/// @see https://docs.rs/actix-web/4.0.1/actix_web/struct.App.html#method.configure
pub fn configure(conf: &mut actix_web::web::ServiceConfig) {
    // Descending order. Order is important.
    // Route resolution will stop at the first match.
    appeals::configure(conf);
    bans::configure(conf);
    content::configure(conf);
    decisions::configure(conf);
    reports::configure(conf);
    review::configure(conf);
    settings::configure(conf);
    stats::configure(conf);
}
