mod models;

pub use models::*;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

use crate::auth::password::hash_password;

pub type DbPool = SqlitePool;

/// Timestamps are stored as fixed-width RFC 3339 UTC strings so that they
/// compare correctly as text.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn now() -> String {
    timestamp(Utc::now())
}

/// Execute a SQL migration file statement by statement. Comment lines are
/// stripped from the whole file first so a `;` inside a comment never
/// splits a statement.
async fn execute_sql(pool: &SqlitePool, sql: &str) -> Result<()> {
    let cleaned = strip_comment_lines(sql);
    for statement in cleaned.split(';') {
        let trimmed = statement.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(pool).await?;
        }
    }
    Ok(())
}

fn strip_comment_lines(sql: &str) -> String {
    sql.lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn init(data_dir: &Path) -> Result<DbPool> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

    let db_path = data_dir.join("rental.db");

    info!("Initializing database at {}", db_path.display());

    // Pragmas go on the connect options so every pooled connection gets them
    let options = SqliteConnectOptions::new()
        .filename(&db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    info!("Database initialized successfully");
    Ok(pool)
}

/// Single-connection in-memory database with the full schema applied.
/// Every pooled connection to an in-memory database is its own database, so
/// the pool is capped at one connection.
pub async fn connect_memory() -> Result<DbPool> {
    let pool = memory_pool().await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

async fn memory_pool() -> Result<DbPool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    Ok(pool)
}

async fn table_exists(pool: &SqlitePool, table: &str) -> Result<bool> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' AND name = ?")
            .bind(table)
            .fetch_optional(pool)
            .await?;
    Ok(row.is_some())
}

async fn has_column(pool: &SqlitePool, table: &str, column: &str) -> Result<bool> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT name FROM pragma_table_info(?) WHERE name = ?")
            .bind(table)
            .bind(column)
            .fetch_optional(pool)
            .await?;
    Ok(row.is_some())
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");

    // Databases written by earlier releases are upgraded in place before the
    // base schema runs, since its CREATE INDEX statements expect new columns.

    // Users keyed by username -> full_name shape
    if table_exists(pool, "users").await? && has_column(pool, "users", "username").await? {
        warn!("Upgrading legacy users table (username -> full_name)");
        execute_sql(pool, include_str!("../../migrations/002_legacy_users.sql")).await?;
    }

    // Sessions with plaintext tokens are invalidated
    if table_exists(pool, "sessions").await? && !has_column(pool, "sessions", "token_hash").await? {
        warn!("Upgrading legacy sessions table; existing sessions are invalidated");
        execute_sql(pool, include_str!("../../migrations/003_legacy_sessions.sql")).await?;
    }

    // Chat logs attributed by user_id
    if table_exists(pool, "chat_logs").await?
        && has_column(pool, "chat_logs", "user_id").await?
        && !has_column(pool, "chat_logs", "user_email").await?
    {
        warn!("Upgrading legacy chat_logs table (user_id -> user_email)");
        execute_sql(pool, include_str!("../../migrations/004_legacy_chat_logs.sql")).await?;
    }

    // Plaintext admin passwords
    if table_exists(pool, "admin").await? && has_column(pool, "admin", "password").await? {
        rehash_admin_passwords(pool).await?;
    }

    // Picnic spots created before the gallery columns existed
    if table_exists(pool, "picnic_spots").await? {
        for column in ["trip_images", "hotel_images"] {
            if !has_column(pool, "picnic_spots", column).await? {
                sqlx::query(&format!("ALTER TABLE picnic_spots ADD COLUMN {} TEXT", column))
                    .execute(pool)
                    .await?;
            }
        }
    }

    execute_sql(pool, include_str!("../../migrations/001_initial.sql")).await?;

    Ok(())
}

/// Replace the plaintext `admin.password` column with Argon2 hashes.
async fn rehash_admin_passwords(pool: &SqlitePool) -> Result<()> {
    warn!("Hashing plaintext admin passwords");

    if !has_column(pool, "admin", "password_hash").await? {
        sqlx::query("ALTER TABLE admin ADD COLUMN password_hash TEXT NOT NULL DEFAULT ''")
            .execute(pool)
            .await?;
    }

    let rows: Vec<(i64, String)> = sqlx::query_as("SELECT id, password FROM admin")
        .fetch_all(pool)
        .await?;

    let mut tx = pool.begin().await?;
    for (id, plain) in &rows {
        let hash = hash_password(plain)
            .map_err(|e| anyhow::anyhow!("Failed to hash admin password: {}", e))?;
        sqlx::query("UPDATE admin SET password_hash = ? WHERE id = ?")
            .bind(&hash)
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }
    sqlx::query("ALTER TABLE admin DROP COLUMN password")
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(count = rows.len(), "Admin passwords hashed");
    Ok(())
}
