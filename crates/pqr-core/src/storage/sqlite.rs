//! SQLite key-value backend
//!
//! Keeps every slot as a row of the `kv` table. Useful when the data
//! directory lives on a filesystem where many small renames are slow, and
//! gives a single file to back up.

use std::fs;
use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::error::{StorageError, StorageResult};
use super::schema::{init_schema, needs_init};
use super::KeyValueStorage;

/// Key-value storage in a SQLite database
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Open or create the database at `path`
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        if needs_init(&conn) {
            init_schema(&conn)?;
        }

        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl KeyValueStorage for SqliteStorage {
    fn read(&self, key: &str) -> StorageResult<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn write(&self, key: &str, value: &str) -> StorageResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value, Utc::now().timestamp()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_missing_returns_none() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        assert!(storage.read("pqrs").unwrap().is_none());
    }

    #[test]
    fn test_write_replaces_row() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        storage.write("pqr_counter", "1").unwrap();
        storage.write("pqr_counter", "2").unwrap();

        assert_eq!(storage.read("pqr_counter").unwrap().as_deref(), Some("2"));

        let rows: i64 = storage
            .conn
            .query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_remove() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        storage.write("pqrs", "[]").unwrap();
        storage.remove("pqrs").unwrap();
        storage.remove("pqrs").unwrap();
        assert!(storage.read("pqrs").unwrap().is_none());
    }

    #[test]
    fn test_values_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data").join("pqr.db");
        {
            let storage = SqliteStorage::open(&path).unwrap();
            storage.write("pqrs", "[{\"id\":\"PQR-0001\"}]").unwrap();
        }

        let storage = SqliteStorage::open(&path).unwrap();
        assert_eq!(
            storage.read("pqrs").unwrap().as_deref(),
            Some("[{\"id\":\"PQR-0001\"}]")
        );
    }
}
