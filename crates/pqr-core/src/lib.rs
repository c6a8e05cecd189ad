//! PQR Core Library
//!
//! This crate provides the core functionality for PQR, a local tool for
//! filing and following up claim/complaint records (Petición/Queja/Reclamo).
//!
//! # Architecture
//!
//! - **Key-value storage**: the whole record collection and the id counter
//!   live in two named slots of an injected [`KeyValueStorage`]
//! - **Record store**: create, full-record update, list and search over
//!   that collection
//!
//! # Quick Start
//!
//! ```text
//! let mut store = RecordStore::new(FileStorage::open(data_dir)?);
//!
//! let mut draft = PqrRecord::draft("jdoe@example.com");
//! draft.order = "ORD-1".into();
//! let record = store.create(draft)?;   // PQR-0001
//!
//! let hits = store.search("ord-1")?;
//! ```
//!
//! # Modules
//!
//! - `store`: Record store (main entry point)
//! - `allocator`: Sequence numbers behind record ids
//! - `models`: Records, comments and status
//! - `storage`: Key-value backends (file, SQLite, memory)
//! - `export`: Spreadsheet export
//! - `notify`: New-record notifications
//! - `config`: Application configuration

pub mod allocator;
pub mod config;
pub mod export;
pub mod models;
pub mod notify;
pub mod storage;
pub mod store;

pub use allocator::{format_pqr_id, SequenceAllocator};
pub use config::Config;
pub use models::{Attachment, Comment, PqrRecord, PqrStatus, ValidationError};
pub use notify::{Notifier, NotifyError};
pub use storage::{
    open_storage, FileStorage, KeyValueStorage, MemoryStorage, SqliteStorage, StorageBackend,
    StorageError,
};
pub use store::{RecordStore, StoreError};
