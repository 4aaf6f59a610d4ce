//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for all application data.

mod accounts;
mod reports;
mod repository;

pub use accounts::Session;
pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meta (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            schema_version INTEGER NOT NULL DEFAULT 1,
            revision_id INTEGER NOT NULL DEFAULT 0,
            generated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        INSERT OR IGNORE INTO meta (id, schema_version, revision_id, generated_at)
        VALUES (1, 1, 0, datetime('now'));
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS quotes (
            id TEXT PRIMARY KEY,
            quote_type TEXT NOT NULL,
            supplier_name TEXT NOT NULL,
            supplier_phone TEXT NOT NULL DEFAULT '',
            prefix TEXT NOT NULL,
            first_quote_number TEXT NOT NULL DEFAULT '',
            second_quote_number TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            observation TEXT NOT NULL DEFAULT '',
            photo_url TEXT,
            attachments TEXT,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS suppliers (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            phone TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reports (
            id TEXT PRIMARY KEY,
            request_date TEXT NOT NULL,
            approval_date TEXT,
            prefix TEXT NOT NULL,
            department TEXT NOT NULL,
            description TEXT NOT NULL,
            supplier TEXT NOT NULL DEFAULT '',
            approval_numbers TEXT NOT NULL DEFAULT '',
            total REAL NOT NULL DEFAULT 0,
            invoice TEXT,
            status TEXT NOT NULL DEFAULT '',
            delivery_status TEXT NOT NULL DEFAULT 'Pending',
            notes TEXT,
            protocoled_at TEXT,
            protocoled_by TEXT,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS report_items (
            id TEXT PRIMARY KEY,
            category TEXT NOT NULL,
            value TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            name TEXT NOT NULL,
            subtitle TEXT NOT NULL DEFAULT '',
            logo_url TEXT,
            accent_color TEXT NOT NULL,
            users TEXT NOT NULL DEFAULT '[]',
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        INSERT OR IGNORE INTO settings (id, name, subtitle, logo_url, accent_color, users)
        VALUES (1, 'Fleet Desk', 'Maintenance quotes and reports', NULL, '#1F6FEB', '[]');
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            email TEXT PRIMARY KEY,
            password_salt TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sessions (
            token TEXT PRIMARY KEY,
            email TEXT NOT NULL,
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for common queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_quotes_created_at ON quotes(created_at);
        CREATE INDEX IF NOT EXISTS idx_suppliers_name ON suppliers(name);
        CREATE INDEX IF NOT EXISTS idx_reports_request_date ON reports(request_date);
        CREATE INDEX IF NOT EXISTS idx_reports_delivery_status ON reports(delivery_status);
        CREATE INDEX IF NOT EXISTS idx_report_items_category ON report_items(category);
        CREATE INDEX IF NOT EXISTS idx_sessions_email ON sessions(email);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
