//! SQLite channel store.
//!
//! Discovered channels are kept one row per (source, onid, tid, sid) with the
//! full record serialized as JSON next to a few searchable columns. Every
//! merge is recorded in `scan_history`.

#[cfg(feature = "database")]
mod channel;
#[cfg(feature = "database")]
mod models;
#[cfg(feature = "database")]
mod schema;

#[cfg(feature = "database")]
pub use models::*;

#[cfg(feature = "database")]
use rusqlite::{Connection, Result as SqliteResult};
#[cfg(feature = "database")]
use std::path::Path;
#[cfg(feature = "database")]
use thiserror::Error;

/// Database error types.
#[cfg(feature = "database")]
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Channel record error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Channel not found: ONID={onid}, TID={tid}, SID={sid}")]
    ChannelNotFound { onid: u16, tid: u16, sid: u16 },
}

#[cfg(feature = "database")]
pub type Result<T> = std::result::Result<T, DatabaseError>;

/// Main database connection wrapper.
#[cfg(feature = "database")]
pub struct Database {
    conn: Connection,
}

#[cfg(feature = "database")]
impl Database {
    /// Open or create a database at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize_schema()?;
        Ok(db)
    }

    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute_batch(schema::SCHEMA_SQL)?;
        Ok(())
    }

    /// Get the underlying connection (for advanced queries).
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn transaction(&mut self) -> SqliteResult<rusqlite::Transaction<'_>> {
        self.conn.transaction()
    }
}

#[cfg(feature = "database")]
impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg(feature = "database")]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.connection().is_autocommit());
    }

    #[test]
    fn test_schema_creation() {
        let db = Database::open_in_memory().unwrap();
        let count: i32 = db
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('channels', 'scan_history')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);
    }
}
