//! SQLite storage tier.

use std::path::Path;
use std::sync::Arc;

use rusqlite::params;

use lightbox_core::{ImageId, ImageRecord, LightboxError, Result, SourceTier, Timestamp};

use crate::db::Database;
use crate::tier::TierStore;

/// Durable adapter over the gallery database. Highest-priority local tier.
///
/// Write recency rides on rowid: a save deletes any previous row for the id
/// and inserts a fresh one, so `ORDER BY rowid DESC` is always
/// newest-write-first and eviction can trim by the same ordering.
#[derive(Debug)]
pub struct SqliteStore {
    db: Arc<Database>,
    capacity: usize,
}

impl SqliteStore {
    pub fn new(db: Arc<Database>, capacity: usize) -> Self {
        Self { db, capacity }
    }

    /// Opens (or creates) the database file at `path`.
    pub fn open(path: &Path, capacity: usize) -> Result<Self> {
        Ok(Self::new(Arc::new(Database::new(path)?), capacity))
    }

    /// In-memory variant for tests and ephemeral profiles.
    pub fn in_memory(capacity: usize) -> Result<Self> {
        Ok(Self::new(Arc::new(Database::in_memory()?), capacity))
    }
}

impl TierStore for SqliteStore {
    fn tier(&self) -> SourceTier {
        SourceTier::Database
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn save(&self, record: &ImageRecord) -> Result<()> {
        record.validate()?;
        let capacity = self.capacity as i64;
        self.db.with_conn(|conn| {
            // Delete-then-insert rather than upsert so the row gets a fresh
            // rowid and moves to the front of the recency order.
            conn.execute("DELETE FROM images WHERE id = ?1", params![record.id.as_str()])
                .map_err(|e| LightboxError::Storage(format!("Failed to replace image: {}", e)))?;

            conn.execute(
                "INSERT INTO images (id, url, thumbnail_url, prompt, negative_prompt,
                                     width, height, steps, guidance_scale, seed, style,
                                     is_favorite, created_at, file_size_bytes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    record.id.as_str(),
                    record.url,
                    record.thumbnail_url,
                    record.prompt,
                    record.negative_prompt,
                    record.width as i64,
                    record.height as i64,
                    record.steps as i64,
                    record.guidance_scale,
                    record.seed,
                    record.style,
                    record.is_favorite,
                    record.created_at.0,
                    record.file_size_bytes as i64,
                ],
            )
            .map_err(|e| LightboxError::Storage(format!("Failed to insert image: {}", e)))?;

            conn.execute(
                "DELETE FROM images WHERE id NOT IN
                     (SELECT id FROM images ORDER BY rowid DESC LIMIT ?1)",
                params![capacity],
            )
            .map_err(|e| LightboxError::Storage(format!("Failed to evict images: {}", e)))?;

            Ok(())
        })
    }

    fn get_all(&self) -> Result<Vec<ImageRecord>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, url, thumbnail_url, prompt, negative_prompt,
                            width, height, steps, guidance_scale, seed, style,
                            is_favorite, created_at, file_size_bytes
                     FROM images
                     ORDER BY rowid DESC",
                )
                .map_err(|e| LightboxError::Storage(format!("Failed to prepare query: {}", e)))?;

            let rows = stmt
                .query_map([], row_to_record)
                .map_err(|e| LightboxError::Storage(format!("Failed to query images: {}", e)))?;

            rows.collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| LightboxError::Storage(format!("Failed to read image row: {}", e)))
        })
    }

    fn find(&self, id: &ImageId) -> Result<Option<ImageRecord>> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT id, url, thumbnail_url, prompt, negative_prompt,
                        width, height, steps, guidance_scale, seed, style,
                        is_favorite, created_at, file_size_bytes
                 FROM images WHERE id = ?1",
                params![id.as_str()],
                row_to_record,
            )
            .optional()
            .map_err(|e| LightboxError::Storage(format!("Failed to look up image: {}", e)))
        })
    }

    fn delete(&self, id: &ImageId) -> Result<bool> {
        self.db.with_conn(|conn| {
            let rows = conn
                .execute("DELETE FROM images WHERE id = ?1", params![id.as_str()])
                .map_err(|e| LightboxError::Storage(format!("Failed to delete image: {}", e)))?;
            Ok(rows > 0)
        })
    }

    fn update_favorite(&self, id: &ImageId, favorite: bool) -> Result<bool> {
        self.db.with_conn(|conn| {
            let rows = conn
                .execute(
                    "UPDATE images SET is_favorite = ?1 WHERE id = ?2",
                    params![favorite, id.as_str()],
                )
                .map_err(|e| LightboxError::Storage(format!("Failed to update favorite: {}", e)))?;
            Ok(rows > 0)
        })
    }

    fn clear(&self) -> Result<()> {
        self.db.with_conn(|conn| {
            conn.execute("DELETE FROM images", [])
                .map_err(|e| LightboxError::Storage(format!("Failed to clear images: {}", e)))?;
            Ok(())
        })
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<ImageRecord> {
    Ok(ImageRecord {
        id: ImageId(row.get(0)?),
        url: row.get(1)?,
        thumbnail_url: row.get(2)?,
        prompt: row.get(3)?,
        negative_prompt: row.get(4)?,
        width: row.get::<_, i64>(5)? as u32,
        height: row.get::<_, i64>(6)? as u32,
        steps: row.get::<_, i64>(7)? as u32,
        guidance_scale: row.get(8)?,
        seed: row.get(9)?,
        style: row.get(10)?,
        is_favorite: row.get::<_, i64>(11)? != 0,
        created_at: Timestamp(row.get(12)?),
        file_size_bytes: row.get::<_, i64>(13)? as u64,
        source: None,
    })
}

trait OptionalExt<T> {
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
