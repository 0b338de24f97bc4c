use actix_web::http::header;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use env_logger::Env;
use gatehouse::config::create_config;
use gatehouse::db::{get_db_pool, init_db};
use gatehouse::scorer::{HttpRiskScorer, RiskScorer};
use std::sync::Arc;
use std::time::Duration;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_lib_mods();
    init_our_mods();
    init_db(std::env::var("DATABASE_URL").expect("DATABASE_URL must be set.")).await;

    // Load runtime configuration from database
    let config = create_config();
    config
        .load_from_database(get_db_pool())
        .await
        .expect("Failed to load configuration from database");

    // Initialize rate limits from database settings
    gatehouse::rate_limit::init_rate_limits(&config);

    // The risk scorer is an external service; everything behind this trait
    // object is replaceable in tests.
    let scorer: Arc<dyn RiskScorer> = Arc::new(HttpRiskScorer::from_app_config());

    // Spawn periodic in-memory cleanup task
    actix_web::rt::spawn(async {
        let mut interval = actix_web::rt::time::interval(Duration::from_secs(300)); // Every 5 minutes
        loop {
            interval.tick().await;
            gatehouse::rate_limit::cleanup_old_entries_public();
            gatehouse::screen::cleanup_recent_submissions();
            log::debug!("Rate limiter and duplicate-window cleanup completed");
        }
    });

    let bind_address = gatehouse::app_config::server().bind_address;
    log::info!("Starting moderation service on {}", bind_address);

    HttpServer::new(move || {
        // Order of middleware IS IMPORTANT and is in REVERSE EXECUTION ORDER.
        App::new()
            .app_data(Data::new(config.clone()))
            .app_data(Data::new(scorer.clone()))
            // Security headers - applied to all responses
            .wrap(
                DefaultHeaders::new()
                    .add((header::X_FRAME_OPTIONS, "DENY"))
                    .add((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
                    .add(("Referrer-Policy", "strict-origin-when-cross-origin")),
            )
            .wrap(Logger::new("%a %{User-Agent}i"))
            .configure(gatehouse::web::configure)
    })
    .bind(&bind_address)?
    .run()
    .await
}

/// Initialize third party crates we rely on but don't have control over.
pub fn init_lib_mods() {
    // This should be calls to crates without any transformative work applied.
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
}

/// Initialize all local mods.
/// Panics
pub fn init_our_mods() {
    // This should be a list of simple function calls.
    // Each module should work mostly independent of others.
    // This way, we can unit test individual modules without loading the entire application.
    gatehouse::app_config::init();
}
