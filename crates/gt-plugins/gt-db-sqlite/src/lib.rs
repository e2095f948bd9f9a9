//! # gt-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational
//! model and the `gt-core` domain models. All three persistence ports
//! ([`gt_core::GeoIndex`], [`gt_core::TipStore`], [`gt_core::UserStore`])
//! share a single pool; UUIDs are stored as 16-byte BLOBs.

mod geo;
mod tips;
mod users;

pub use geo::SqliteGeoIndex;
pub use tips::SqliteTipStore;
pub use users::SqliteUserStore;

use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

// Helpers for UUID conversion
pub(crate) fn uuid_to_blob(id: Uuid) -> Vec<u8> {
    id.as_bytes().to_vec()
}

pub(crate) fn blob_to_uuid(blob: &[u8]) -> Uuid {
    Uuid::from_slice(blob).unwrap_or_default()
}

/// One statement per entry; SQLite executes them individually.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS countries (
        id   BLOB PRIMARY KEY,
        name TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS regions (
        id         BLOB PRIMARY KEY,
        name       TEXT NOT NULL,
        country_id BLOB NOT NULL REFERENCES countries(id)
    )",
    "CREATE TABLE IF NOT EXISTS subregions (
        id        BLOB PRIMARY KEY,
        name      TEXT NOT NULL,
        region_id BLOB NOT NULL REFERENCES regions(id)
    )",
    "CREATE TABLE IF NOT EXISTS cities (
        id           BLOB PRIMARY KEY,
        name         TEXT NOT NULL,
        latitude     REAL NOT NULL,
        longitude    REAL NOT NULL,
        subregion_id BLOB REFERENCES subregions(id),
        region_id    BLOB REFERENCES regions(id),
        country_id   BLOB REFERENCES countries(id)
    )",
    "CREATE INDEX IF NOT EXISTS idx_cities_latitude ON cities(latitude)",
    "CREATE TABLE IF NOT EXISTS users (
        id            BLOB PRIMARY KEY,
        username      TEXT NOT NULL UNIQUE,
        email         TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        token         TEXT,
        created_at    TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_users_token ON users(token)",
    "CREATE TABLE IF NOT EXISTS tips (
        id         BLOB PRIMARY KEY,
        owner_id   BLOB NOT NULL REFERENCES users(id),
        title      TEXT NOT NULL,
        text       TEXT NOT NULL,
        score      REAL NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS tip_cities (
        tip_id  BLOB NOT NULL REFERENCES tips(id) ON DELETE CASCADE,
        city_id BLOB NOT NULL,
        PRIMARY KEY (tip_id, city_id)
    )",
    "CREATE TABLE IF NOT EXISTS tip_subregions (
        tip_id       BLOB NOT NULL REFERENCES tips(id) ON DELETE CASCADE,
        subregion_id BLOB NOT NULL,
        PRIMARY KEY (tip_id, subregion_id)
    )",
    "CREATE TABLE IF NOT EXISTS tip_regions (
        tip_id    BLOB NOT NULL REFERENCES tips(id) ON DELETE CASCADE,
        region_id BLOB NOT NULL,
        PRIMARY KEY (tip_id, region_id)
    )",
    "CREATE TABLE IF NOT EXISTS tip_countries (
        tip_id     BLOB NOT NULL REFERENCES tips(id) ON DELETE CASCADE,
        country_id BLOB NOT NULL,
        PRIMARY KEY (tip_id, country_id)
    )",
];

/// Creates the schema if it does not exist yet. Safe to call on every
/// startup; proper migrations are out of scope for this service.
pub async fn init_schema(pool: &SqlitePool) -> anyhow::Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// Connects to `url` and ensures the schema exists. The returned pool is
/// cloned into every store that shares the database.
pub async fn connect(url: &str) -> anyhow::Result<SqlitePool> {
    let pool = SqlitePool::connect(url).await?;
    init_schema(&pool).await?;
    log::info!("sqlite schema ready at {}", url);
    Ok(pool)
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    // A single connection keeps the in-memory database alive and shared
    // across the whole test.
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    init_schema(&pool).await.expect("schema");
    pool
}
