//! Database initialization
//!
//! Opens (or creates) the SQLite file and creates the schema idempotently
//! with `CREATE TABLE IF NOT EXISTS`. Identifiers are hyphenated UUID text;
//! dates, times and timestamps use sqlx's chrono text encodings.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Current schema version recorded in `schema_version`
pub const SCHEMA_VERSION: i64 = 1;

/// Open the database file, creating it and its parent folder if needed
///
/// Connection options apply to every pooled connection: foreign keys on,
/// WAL journal, 5 s busy timeout.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;
    Ok(pool)
}

/// Open a private in-memory database with the full schema
///
/// A single connection that is never recycled, since each new in-memory
/// connection would see an empty database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;
    Ok(pool)
}

/// Create every table and index (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_admin_users_table(pool).await?;
    create_speakers_table(pool).await?;
    create_tags_table(pool).await?;
    create_sessions_table(pool).await?;
    create_recordings_table(pool).await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_admin_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS admin_users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE COLLATE NOCASE,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'admin' CHECK (role IN ('admin', 'super_admin')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_speakers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS speakers (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            title TEXT NOT NULL,
            affiliation TEXT NOT NULL,
            bio TEXT,
            image_url TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_speakers_name ON speakers(name)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_tags_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tags (
            id TEXT PRIMARY KEY,
            label TEXT NOT NULL,
            category TEXT NOT NULL CHECK (category IN ('organ', 'type', 'level')),
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Labels are unique per category, case-insensitively
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_tags_category_label ON tags(category, label COLLATE NOCASE)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_sessions_table(pool: &SqlitePool) -> Result<()> {
    // Tag and speaker references are RESTRICT: a tag leaves only through
    // delete-with-replacement, a speaker only once unreferenced.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            summary TEXT NOT NULL,
            abstract TEXT NOT NULL,
            objectives TEXT NOT NULL DEFAULT '[]',
            date TEXT NOT NULL,
            time TEXT NOT NULL,
            duration_minutes INTEGER NOT NULL CHECK (duration_minutes > 0),
            status TEXT NOT NULL DEFAULT 'draft' CHECK (status IN ('draft', 'published', 'completed')),
            platform TEXT NOT NULL,
            meeting_link TEXT,
            meeting_id TEXT,
            meeting_password TEXT,
            speaker_id TEXT NOT NULL REFERENCES speakers(id) ON DELETE RESTRICT,
            organ_tag_id TEXT NOT NULL REFERENCES tags(id) ON DELETE RESTRICT,
            type_tag_id TEXT NOT NULL REFERENCES tags(id) ON DELETE RESTRICT,
            level_tag_id TEXT NOT NULL REFERENCES tags(id) ON DELETE RESTRICT,
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    for sql in [
        "CREATE INDEX IF NOT EXISTS idx_sessions_status_date ON sessions(status, date, time)",
        "CREATE INDEX IF NOT EXISTS idx_sessions_speaker ON sessions(speaker_id)",
        "CREATE INDEX IF NOT EXISTS idx_sessions_organ_tag ON sessions(organ_tag_id)",
        "CREATE INDEX IF NOT EXISTS idx_sessions_type_tag ON sessions(type_tag_id)",
        "CREATE INDEX IF NOT EXISTS idx_sessions_level_tag ON sessions(level_tag_id)",
    ] {
        sqlx::query(sql).execute(pool).await?;
    }

    Ok(())
}

async fn create_recordings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS recordings (
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL UNIQUE REFERENCES sessions(id) ON DELETE CASCADE,
            youtube_url TEXT NOT NULL,
            pdf_url TEXT,
            thumbnail_url TEXT,
            recorded_date TEXT NOT NULL,
            views_count INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_recordings_recorded_date ON recordings(recorded_date)")
        .execute(pool)
        .await?;

    Ok(())
}
