//! Global database pool.
//!
//! The pool is initialized once at startup and handed out as a static
//! reference. Service functions take `&DatabaseConnection` so tests can
//! supply their own connection instead of the global.

use once_cell::sync::OnceCell;
use sea_orm::{Database, DatabaseConnection};

static DB_POOL: OnceCell<DatabaseConnection> = OnceCell::new();

/// Connect to the database and store the pool.
/// Panics on connection failure; the service cannot run without a database.
pub async fn init_db(database_url: String) {
    let pool = Database::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    DB_POOL
        .set(pool)
        .expect("init_db must only be called once");
}

/// Returns the global connection pool.
/// Panics if `init_db` has not been called.
pub fn get_db_pool() -> &'static DatabaseConnection {
    DB_POOL.get().expect("Database pool is not initialized")
}
