//! SQLite connection management for the database tier.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

use lightbox_core::{LightboxError, Result};

use crate::migrations;

/// Wrapper around a SQLite connection with WAL mode and schema migrations
/// applied at open time.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Opens (or creates) the gallery database at the given path and brings
    /// the schema up to date.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| LightboxError::Storage(format!("Failed to open database: {}", e)))?;

        // WAL gives concurrent readers while a write is in flight, which
        // matters because merge reads race adapter writes.
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA cache_size = -32000;",
        )
        .map_err(|e| LightboxError::Storage(format!("Failed to set pragmas: {}", e)))?;

        migrations::run_migrations(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens an in-memory database, for tests and ephemeral profiles.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| LightboxError::Storage(format!("Failed to open in-memory db: {}", e)))?;

        migrations::run_migrations(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Runs a closure with exclusive access to the underlying connection.
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| LightboxError::Storage(format!("Database lock poisoned: {}", e)))?;
        f(&conn)
    }
}

// SAFETY: Connection is !Sync because SQLite connections must not be used
// concurrently from multiple threads. All access goes through the Mutex in
// `with_conn`, which serializes callers:
// 1. The Connection is never handed out by reference beyond the closure.
// 2. The Mutex guarantees at most one thread touches it at a time.
// 3. rusqlite Connections are Send when not in use (no thread-local state).
// 4. WAL mode handles cross-process concurrency at the SQLite layer.
unsafe impl Send for Database {}
unsafe impl Sync for Database {}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}
