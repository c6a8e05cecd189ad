//! Command handlers

use pqr_core::{KeyValueStorage, RecordStore};

pub mod comment;
pub mod config;
pub mod create;
pub mod export;
pub mod record;
pub mod status;

/// Record store over whichever backend the configuration selects
pub type Store = RecordStore<Box<dyn KeyValueStorage>>;

#[cfg(test)]
pub(crate) fn memory_store() -> Store {
    let storage: Box<dyn KeyValueStorage> = Box::new(pqr_core::MemoryStorage::new());
    RecordStore::new(storage)
}
