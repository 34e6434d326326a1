//! Schema migrations for the gallery database.

use rusqlite::Connection;
use tracing::info;

use lightbox_core::{LightboxError, Result};

/// Applies any pending migrations. Safe to call on every open.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            name       TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )
    .map_err(|e| LightboxError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| LightboxError::Storage(format!("Failed to read schema version: {}", e)))?;

    if current < 1 {
        apply_v1(conn)?;
        info!(version = 1, "Applied schema migration");
    }

    Ok(())
}

/// v1: the images table plus indexes for timestamp and favorite scans.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- One row per generated image. rowid order doubles as write recency:
        -- saves delete-then-insert, so the newest write always has the
        -- largest rowid.
        CREATE TABLE IF NOT EXISTS images (
            id              TEXT PRIMARY KEY NOT NULL,
            url             TEXT NOT NULL,
            thumbnail_url   TEXT NOT NULL DEFAULT '',
            prompt          TEXT NOT NULL DEFAULT '',
            negative_prompt TEXT NOT NULL DEFAULT '',
            width           INTEGER NOT NULL,
            height          INTEGER NOT NULL,
            steps           INTEGER NOT NULL DEFAULT 4,
            guidance_scale  REAL NOT NULL DEFAULT 7.5,
            seed            INTEGER NOT NULL DEFAULT -1,
            style           TEXT,
            is_favorite     INTEGER NOT NULL DEFAULT 0,
            created_at      INTEGER NOT NULL,
            file_size_bytes INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_images_created_at
            ON images (created_at DESC);

        CREATE INDEX IF NOT EXISTS idx_images_favorite
            ON images (is_favorite, created_at DESC);

        INSERT OR IGNORE INTO schema_migrations (version, name)
            VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| LightboxError::Storage(format!("Migration v1 failed: {}", e)))?;

    Ok(())
}
