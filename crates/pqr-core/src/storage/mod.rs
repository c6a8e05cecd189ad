//! Storage layer
//!
//! Records and the id counter live in named slots of a key-value store.
//! Every slot holds a whole serialized value and is always replaced as a
//! whole, so a backend only needs `read`, `write` and `remove`.
//!
//! ## Backends
//!
//! - [`FileStorage`]: one file per key under the data directory, atomic writes
//! - [`SqliteStorage`]: a single `kv` table in `pqr.db`
//! - [`MemoryStorage`]: in-process map, used by tests

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::Config;

pub mod error;
pub mod file;
pub mod memory;
pub mod schema;
pub mod sqlite;

pub use error::{StorageError, StorageResult};
pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
pub use sqlite::SqliteStorage;

/// Raw key-value I/O.
///
/// All methods take `&self`; the tool is single-threaded and backends that
/// hold in-process state use interior mutability.
pub trait KeyValueStorage {
    /// Read the value stored under `key`.
    /// Returns `Ok(None)` if the key has never been written.
    fn read(&self, key: &str) -> StorageResult<Option<String>>;

    /// Replace the value stored under `key`.
    fn write(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;
}

impl<T: KeyValueStorage + ?Sized> KeyValueStorage for Box<T> {
    fn read(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).write(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }
}

impl<T: KeyValueStorage + ?Sized> KeyValueStorage for &T {
    fn read(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).write(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }
}

/// Which backend the store persists to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// JSON files in the data directory
    #[default]
    File,
    /// SQLite database in the data directory
    Sqlite,
    /// Nothing survives the process
    Memory,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageBackend::File => "file",
            StorageBackend::Sqlite => "sqlite",
            StorageBackend::Memory => "memory",
        };
        f.write_str(name)
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" | "json" => Ok(StorageBackend::File),
            "sqlite" | "db" => Ok(StorageBackend::Sqlite),
            "memory" | "mem" => Ok(StorageBackend::Memory),
            other => Err(format!(
                "Unknown storage backend '{}'. Use file, sqlite or memory.",
                other
            )),
        }
    }
}

/// Open the backend selected by the configuration
pub fn open_storage(config: &Config) -> Result<Box<dyn KeyValueStorage>> {
    let storage: Box<dyn KeyValueStorage> = match config.backend {
        StorageBackend::File => Box::new(
            FileStorage::open(&config.data_dir)
                .with_context(|| format!("Failed to open file storage in {:?}", config.data_dir))?,
        ),
        StorageBackend::Sqlite => Box::new(
            SqliteStorage::open(&config.sqlite_path())
                .with_context(|| format!("Failed to open SQLite storage {:?}", config.sqlite_path()))?,
        ),
        StorageBackend::Memory => Box::new(MemoryStorage::new()),
    };
    tracing::debug!("Opened {} storage", config.backend);
    Ok(storage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_str() {
        assert_eq!("file".parse::<StorageBackend>(), Ok(StorageBackend::File));
        assert_eq!("SQLite".parse::<StorageBackend>(), Ok(StorageBackend::Sqlite));
        assert_eq!(" memory ".parse::<StorageBackend>(), Ok(StorageBackend::Memory));
        assert!("redis".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_backend_display_round_trips() {
        for backend in [
            StorageBackend::File,
            StorageBackend::Sqlite,
            StorageBackend::Memory,
        ] {
            assert_eq!(backend.to_string().parse::<StorageBackend>(), Ok(backend));
        }
    }

    #[test]
    fn test_boxed_storage_delegates() {
        let storage: Box<dyn KeyValueStorage> = Box::new(MemoryStorage::new());
        storage.write("k", "v").unwrap();
        assert_eq!(storage.read("k").unwrap().as_deref(), Some("v"));
        storage.remove("k").unwrap();
        assert!(storage.read("k").unwrap().is_none());
    }
}
