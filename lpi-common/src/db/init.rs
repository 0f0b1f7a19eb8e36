//! Database initialization
//!
//! Creates the SQLite file on first run and ensures the profile and audit
//! tables exist. Every statement is idempotent, so this runs on every startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets status reads proceed while an import upserts
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create all service tables on an existing pool
///
/// Exposed separately so tests can run against an in-memory pool.
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    create_linkedin_profiles_table(pool).await?;
    create_import_audit_table(pool).await?;

    info!("Database tables initialized (linkedin_profiles, linkedin_import_audit)");

    Ok(())
}

/// Create the linkedin_profiles table
///
/// One row per LinkedIn member, keyed by the provider's immutable identity id.
/// `provenance` and `tags` are JSON documents.
async fn create_linkedin_profiles_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS linkedin_profiles (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            linkedin_id TEXT NOT NULL UNIQUE,
            first_name TEXT NOT NULL DEFAULT '',
            last_name TEXT NOT NULL DEFAULT '',
            headline TEXT NOT NULL DEFAULT '',
            email TEXT NOT NULL DEFAULT '',
            profile_picture_url TEXT NOT NULL DEFAULT '',
            profile_url TEXT NOT NULL DEFAULT '',
            profile_url_guessed INTEGER NOT NULL DEFAULT 0,
            provenance TEXT NOT NULL DEFAULT '{}',
            tags TEXT NOT NULL DEFAULT '[]',
            role_level TEXT NOT NULL DEFAULT 'professional',
            import_status TEXT NOT NULL DEFAULT 'completed',
            consent_given_at TEXT NOT NULL,
            consent_user_agent TEXT NOT NULL DEFAULT '',
            consent_ip_address TEXT NOT NULL DEFAULT '',
            last_fetched_at TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_linkedin_profiles_user_id ON linkedin_profiles(user_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the append-only import audit table
async fn create_import_audit_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS linkedin_import_audit (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            linkedin_id TEXT NOT NULL,
            action TEXT NOT NULL,
            fields_present TEXT NOT NULL DEFAULT '[]',
            failed_sources TEXT NOT NULL DEFAULT '[]',
            user_agent TEXT NOT NULL DEFAULT '',
            ip_address TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
