//! Test database setup and management
#![allow(dead_code)]

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr, Statement};
use std::sync::atomic::{AtomicU32, Ordering};

static DB_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Create a fresh file-backed SQLite database for one test.
///
/// Every call gets its own database file under the system temp directory,
/// so tests are isolated without truncation between runs. Production runs
/// Postgres; the schema below is the SQLite rendering of the same tables.
pub async fn setup_test_database() -> Result<DatabaseConnection, DbErr> {
    let serial = DB_COUNTER.fetch_add(1, Ordering::SeqCst);
    let path = std::env::temp_dir().join(format!(
        "gatehouse_test_{}_{}.sqlite",
        std::process::id(),
        serial
    ));
    // A previous run may have left the file behind.
    let _ = std::fs::remove_file(&path);

    let url = format!("sqlite://{}?mode=rwc", path.display());
    let db = Database::connect(&url).await?;

    create_schema(&db).await?;

    Ok(db)
}

async fn execute(db: &DatabaseConnection, sql: &str) -> Result<(), DbErr> {
    db.execute(Statement::from_string(DbBackend::Sqlite, sql.to_string()))
        .await?;
    Ok(())
}

/// Create all tables.
async fn create_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    execute(
        db,
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT,
            role TEXT NOT NULL DEFAULT 'member',
            trust_score INTEGER NOT NULL DEFAULT 70,
            violations INTEGER NOT NULL DEFAULT 0,
            report_count INTEGER NOT NULL DEFAULT 0,
            is_banned INTEGER NOT NULL DEFAULT 0,
            banned_reason TEXT,
            banned_until TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );",
    )
    .await?;

    execute(
        db,
        "CREATE TABLE sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            token_hash TEXT NOT NULL UNIQUE,
            expires_at TEXT NOT NULL,
            created_at TEXT NOT NULL
        );",
    )
    .await?;

    execute(
        db,
        "CREATE TABLE posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            body TEXT NOT NULL,
            media TEXT,
            visibility TEXT NOT NULL DEFAULT 'public',
            moderation_status TEXT NOT NULL DEFAULT 'pending',
            moderation_reason TEXT,
            profanity_score INTEGER NOT NULL DEFAULT 0,
            nsfw_score INTEGER NOT NULL DEFAULT 0,
            auto_moderated INTEGER NOT NULL DEFAULT 0,
            was_published INTEGER NOT NULL DEFAULT 0,
            reviewed_by INTEGER REFERENCES users(id) ON DELETE SET NULL,
            reviewed_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );",
    )
    .await?;

    execute(
        db,
        "CREATE TABLE comments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            body TEXT NOT NULL,
            moderation_status TEXT NOT NULL DEFAULT 'pending',
            moderation_reason TEXT,
            profanity_score INTEGER NOT NULL DEFAULT 0,
            nsfw_score INTEGER NOT NULL DEFAULT 0,
            auto_moderated INTEGER NOT NULL DEFAULT 0,
            was_published INTEGER NOT NULL DEFAULT 0,
            reviewed_by INTEGER REFERENCES users(id) ON DELETE SET NULL,
            reviewed_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );",
    )
    .await?;

    execute(
        db,
        "CREATE TABLE reports (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            reporter_id INTEGER NOT NULL REFERENCES users(id),
            content_kind TEXT NOT NULL,
            content_id INTEGER NOT NULL,
            reported_user_id INTEGER NOT NULL REFERENCES users(id),
            reason TEXT NOT NULL,
            description TEXT,
            priority INTEGER NOT NULL DEFAULT 1,
            status TEXT NOT NULL DEFAULT 'pending',
            reviewer_id INTEGER REFERENCES users(id),
            review_note TEXT,
            resolved_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );",
    )
    .await?;

    execute(
        db,
        "CREATE TABLE appeals (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            target_kind TEXT NOT NULL,
            target_id INTEGER NOT NULL,
            appellant_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            reason TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'open',
            resolution_notes TEXT,
            resolved_by INTEGER REFERENCES users(id) ON DELETE SET NULL,
            resolved_at TEXT,
            created_at TEXT NOT NULL
        );",
    )
    .await?;

    execute(
        db,
        "CREATE TABLE moderation_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            moderator_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
            content_kind TEXT NOT NULL,
            content_id INTEGER NOT NULL,
            action TEXT NOT NULL,
            reason TEXT NOT NULL,
            notes TEXT,
            trust_score_change INTEGER,
            created_at TEXT NOT NULL
        );",
    )
    .await?;

    execute(
        db,
        "CREATE TABLE settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            value_type TEXT NOT NULL,
            description TEXT,
            category TEXT NOT NULL DEFAULT 'custom',
            is_public INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL,
            updated_by INTEGER
        );",
    )
    .await?;

    execute(
        db,
        "CREATE TABLE feature_flags (
            key TEXT PRIMARY KEY,
            enabled INTEGER NOT NULL DEFAULT 0,
            description TEXT,
            updated_at TEXT NOT NULL
        );",
    )
    .await?;

    Ok(())
}
