//! Record store
//!
//! The `RecordStore` owns the persisted collection of PQR records. The whole
//! collection lives in the `pqrs` slot as a JSON array and every mutation is
//! a full read-modify-write of that slot.
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = RecordStore::new(FileStorage::open(data_dir)?);
//!
//! let record = store.create(draft)?;       // assigns PQR-0001
//! let hits = store.search("acme")?;        // id, order, carrier, OC
//!
//! let mut record = store.get(&record.id)?.unwrap();
//! record.add_comment("Carrier contacted", "ops@example.com")?;
//! store.update(&record)?;
//! ```
//!
//! Two processes writing the same storage can lose each other's updates;
//! the last writer wins.

use chrono::Utc;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::allocator::{format_pqr_id, parse_pqr_sequence, SequenceAllocator};
use crate::models::PqrRecord;
use crate::storage::{KeyValueStorage, StorageError};

/// Storage key holding the record collection
pub const RECORDS_KEY: &str = "pqrs";

/// Storage key receiving an unreadable collection before it is replaced
pub const CORRUPT_BACKUP_KEY: &str = "pqrs_corrupt_backup";

/// Errors returned by record store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Failed to serialize records: {0}")]
    Serialize(#[from] serde_json::Error),

    /// `update` was given a record whose id is not in the collection
    #[error("PQR not found: {0}")]
    NotFound(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable collection of PQR records over a key-value storage
pub struct RecordStore<S> {
    storage: S,
}

impl<S: KeyValueStorage> RecordStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    fn allocator(&self) -> SequenceAllocator<&S> {
        SequenceAllocator::new(&self.storage)
    }

    // ==================== Mutations ====================

    /// Assign a fresh id to `draft`, append it, and persist the collection
    ///
    /// Any id already on the draft is overwritten. Field contents are not
    /// validated here.
    pub fn create(&mut self, mut draft: PqrRecord) -> StoreResult<PqrRecord> {
        let mut collection = self.load()?;
        let sequence = self.allocator().next_after(collection.highest_sequence())?;
        draft.id = format_pqr_id(sequence);

        collection.records.push(draft.clone());
        self.save(&collection)?;

        info!("Created {}", draft.id);
        Ok(draft)
    }

    /// Replace the stored record having the same id
    ///
    /// The supplied value becomes the full new state, comments included.
    /// Returns `StoreError::NotFound` without writing anything if no
    /// stored record has that id.
    pub fn update(&mut self, record: &PqrRecord) -> StoreResult<()> {
        let mut collection = self.load()?;
        let slot = collection
            .records
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or_else(|| StoreError::NotFound(record.id.clone()))?;

        *slot = record.clone();
        self.save(&collection)?;

        info!("Updated {}", record.id);
        Ok(())
    }

    // ==================== Queries ====================

    /// Get a record by exact id
    pub fn get(&self, id: &str) -> StoreResult<Option<PqrRecord>> {
        Ok(self.records()?.into_iter().find(|r| r.id == id))
    }

    /// Look up a record the way an operator types it
    ///
    /// Accepts the exact id, the id in any letter case, or a bare sequence
    /// number (`7` finds `PQR-0007`).
    pub fn find(&self, query: &str) -> StoreResult<Option<PqrRecord>> {
        let query = query.trim();
        let wanted = match query.parse::<u64>() {
            Ok(n) => format_pqr_id(n),
            Err(_) => query.to_string(),
        };
        Ok(self
            .records()?
            .into_iter()
            .find(|r| r.id.eq_ignore_ascii_case(&wanted)))
    }

    /// Every record, in creation order
    pub fn list_all(&self) -> StoreResult<Vec<PqrRecord>> {
        self.records()
    }

    /// Records whose id, order, carrier or purchase order contains `term`
    ///
    /// Matching is case-insensitive. An empty term returns everything.
    /// Collection order is preserved.
    pub fn search(&self, term: &str) -> StoreResult<Vec<PqrRecord>> {
        let records = self.records()?;
        if term.is_empty() {
            return Ok(records);
        }

        let lowered = term.to_lowercase();
        Ok(records
            .into_iter()
            .filter(|r| r.matches_term(&lowered))
            .collect())
    }

    /// Number of stored records
    pub fn count(&self) -> StoreResult<usize> {
        Ok(self.records()?.len())
    }

    /// Last sequence number handed out, 0 before the first create
    pub fn last_sequence(&self) -> StoreResult<u64> {
        Ok(self.allocator().current()?)
    }

    // ==================== Persistence ====================

    fn records(&self) -> StoreResult<Vec<PqrRecord>> {
        Ok(self.load()?.records)
    }

    /// Read the collection, decoding each record on its own
    ///
    /// Absent data is an empty collection. Records that fail to decode are
    /// left out; a slot that is not a JSON array at all reads as empty.
    /// Nothing is written here.
    fn load(&self) -> StoreResult<Collection> {
        let Some(raw) = self.storage.read(RECORDS_KEY)? else {
            debug!("No {} slot yet", RECORDS_KEY);
            return Ok(Collection::default());
        };

        let elements = match serde_json::from_str::<Vec<Value>>(&raw) {
            Ok(elements) => elements,
            Err(e) => {
                warn!("Stored records are unreadable, treating as empty: {}", e);
                return Ok(Collection {
                    unreadable: Some(raw),
                    ..Collection::default()
                });
            }
        };

        let total = elements.len();
        let mut collection = Collection::default();
        for (index, element) in elements.into_iter().enumerate() {
            let skipped_id = element
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string);
            match serde_json::from_value::<PqrRecord>(element) {
                Ok(record) => collection.records.push(record),
                Err(e) => {
                    warn!(
                        "Skipping unreadable record #{} ({}): {}",
                        index,
                        skipped_id.as_deref().unwrap_or("no id"),
                        e
                    );
                    collection.skipped_ids.extend(skipped_id);
                }
            }
        }

        if collection.records.len() < total {
            collection.unreadable = Some(raw);
        }
        debug!("Loaded {} of {} records", collection.records.len(), total);
        Ok(collection)
    }

    fn save(&self, collection: &Collection) -> StoreResult<()> {
        if let Some(raw) = &collection.unreadable {
            self.back_up(raw)?;
        }
        let json = serde_json::to_string(&collection.records)?;
        self.storage.write(RECORDS_KEY, &json)?;
        debug!("Saved {} records", collection.records.len());
        Ok(())
    }

    /// Keep unreadable data before a write replaces it
    ///
    /// The first backup lands in `pqrs_corrupt_backup`. An existing backup
    /// is never replaced; later ones get a timestamped key.
    fn back_up(&self, raw: &str) -> StoreResult<()> {
        let key = match self.storage.read(CORRUPT_BACKUP_KEY)? {
            None => CORRUPT_BACKUP_KEY.to_string(),
            Some(existing) if existing == raw => return Ok(()),
            Some(_) => format!(
                "{}-{}",
                CORRUPT_BACKUP_KEY,
                Utc::now().format("%Y%m%d%H%M%S%3f")
            ),
        };
        self.storage.write(&key, raw)?;
        warn!("Backed up unreadable records to '{}'", key);
        Ok(())
    }
}

/// The record collection as read from storage
#[derive(Default)]
struct Collection {
    records: Vec<PqrRecord>,
    /// Ids of records left out because they failed to decode
    skipped_ids: Vec<String>,
    /// Raw slot value, kept when any part of it failed to decode
    unreadable: Option<String>,
}

impl Collection {
    /// Highest sequence number carried by any stored record, readable or not
    fn highest_sequence(&self) -> u64 {
        self.records
            .iter()
            .map(|r| r.id.as_str())
            .chain(self.skipped_ids.iter().map(String::as_str))
            .filter_map(parse_pqr_sequence)
            .max()
            .unwrap_or(0)
    }
}
