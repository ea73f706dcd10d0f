//! Database initialization and access layer
//!
//! Creates the schema idempotently on startup and seeds the default material
//! catalog on first run. All stock mutations live in `materials` and are
//! single UPDATE statements, so concurrent recordings cannot lose updates.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

pub mod materials;
pub mod stakeholders;

pub use materials::{get_material, list_materials, record_receipt, record_usage, Material};
pub use stakeholders::{list_stakeholders, Stakeholder};

/// Initialize the database connection pool and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc creates the database file on first run
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers while one writer holds the lock
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    // Writers queue instead of failing immediately under contention
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;
    seed_default_materials(&pool).await?;

    Ok(pool)
}

/// Create all tables (idempotent, safe to call multiple times)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS materials (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL COLLATE NOCASE UNIQUE,
            unit TEXT NOT NULL,
            quantity INTEGER NOT NULL DEFAULT 0
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS stakeholders (
            id INTEGER PRIMARY KEY,
            name TEXT,
            phone_number TEXT NOT NULL UNIQUE
        )",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Seed the default material catalog on first run.
///
/// `INSERT OR IGNORE` keyed on the case-insensitive name makes this
/// idempotent; quantities are left untouched for existing rows.
pub async fn seed_default_materials(pool: &SqlitePool) -> Result<()> {
    const DEFAULTS: [(&str, &str); 4] = [
        ("Cement", "bags"),
        ("Sand", "tonnes"),
        ("Steel Rods", "metres"),
        ("Gravel", "tonnes"),
    ];

    for (name, unit) in DEFAULTS {
        sqlx::query("INSERT OR IGNORE INTO materials (name, unit) VALUES (?, ?)")
            .bind(name)
            .bind(unit)
            .execute(pool)
            .await?;
    }

    Ok(())
}
