//! Identifier allocation
//!
//! Record ids are `PQR-` followed by a sequence number zero padded to four
//! digits. The last issued number lives in the `pqr_counter` slot as a
//! decimal string and only ever grows; numbers are never reused.

use tracing::{debug, warn};

use crate::storage::{KeyValueStorage, StorageResult};

/// Storage key holding the last issued sequence number
pub const COUNTER_KEY: &str = "pqr_counter";

/// Prefix of every record id
pub const ID_PREFIX: &str = "PQR-";

/// Render a sequence number as a record id (`PQR-0001`, `PQR-12345`)
pub fn format_pqr_id(sequence: u64) -> String {
    format!("{}{:04}", ID_PREFIX, sequence)
}

/// Extract the sequence number from a record id
pub fn parse_pqr_sequence(id: &str) -> Option<u64> {
    let digits = id
        .get(..ID_PREFIX.len())
        .filter(|prefix| prefix.eq_ignore_ascii_case(ID_PREFIX))
        .map(|_| &id[ID_PREFIX.len()..])?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Hands out strictly increasing sequence numbers backed by storage
pub struct SequenceAllocator<S> {
    storage: S,
}

impl<S: KeyValueStorage> SequenceAllocator<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Last issued number, 0 if none has been issued
    ///
    /// An unreadable counter value is treated as 0.
    pub fn current(&self) -> StorageResult<u64> {
        let Some(raw) = self.storage.read(COUNTER_KEY)? else {
            return Ok(0);
        };
        match raw.trim().parse::<u64>() {
            Ok(n) => Ok(n),
            Err(_) => {
                warn!("Ignoring unreadable {} value {:?}", COUNTER_KEY, raw);
                Ok(0)
            }
        }
    }

    /// Issue the next number and persist it before returning
    ///
    /// `in_use` is the highest number already carried by a stored record.
    /// The issued number is above both it and the counter, so a lost or
    /// unreadable counter never hands out an id that exists.
    pub fn next_after(&self, in_use: u64) -> StorageResult<u64> {
        let current = self.current()?;
        if in_use > current {
            warn!(
                "{} is behind stored records ({} < {}), skipping ahead",
                COUNTER_KEY, current, in_use
            );
        }
        let next = current.max(in_use) + 1;
        self.storage.write(COUNTER_KEY, &next.to_string())?;
        debug!("Issued sequence number {}", next);
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_format_pqr_id() {
        assert_eq!(format_pqr_id(1), "PQR-0001");
        assert_eq!(format_pqr_id(42), "PQR-0042");
        assert_eq!(format_pqr_id(9999), "PQR-9999");
        assert_eq!(format_pqr_id(12345), "PQR-12345");
    }

    #[test]
    fn test_parse_pqr_sequence() {
        assert_eq!(parse_pqr_sequence("PQR-0001"), Some(1));
        assert_eq!(parse_pqr_sequence("pqr-0420"), Some(420));
        assert_eq!(parse_pqr_sequence("PQR-12345"), Some(12345));
        assert_eq!(parse_pqr_sequence("PQR-"), None);
        assert_eq!(parse_pqr_sequence("PQR-12a"), None);
        assert_eq!(parse_pqr_sequence("ORD-0001"), None);
        assert_eq!(parse_pqr_sequence("PQ"), None);
    }

    #[test]
    fn test_starts_at_one() {
        let storage = MemoryStorage::new();
        let allocator = SequenceAllocator::new(&storage);

        assert_eq!(allocator.current().unwrap(), 0);
        assert_eq!(allocator.next_after(0).unwrap(), 1);
        assert_eq!(storage.read(COUNTER_KEY).unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn test_strictly_increasing() {
        let storage = MemoryStorage::new();
        let allocator = SequenceAllocator::new(&storage);

        let issued: Vec<u64> = (0..5).map(|_| allocator.next_after(0).unwrap()).collect();
        assert_eq!(issued, vec![1, 2, 3, 4, 5]);
        assert_eq!(allocator.current().unwrap(), 5);
    }

    #[test]
    fn test_continues_from_persisted_value() {
        let storage = MemoryStorage::new();
        storage.write(COUNTER_KEY, "17").unwrap();

        let allocator = SequenceAllocator::new(&storage);
        assert_eq!(allocator.next_after(0).unwrap(), 18);
    }

    #[test]
    fn test_corrupt_counter_restarts_at_one() {
        let storage = MemoryStorage::new();
        storage.write(COUNTER_KEY, "not a number").unwrap();

        let allocator = SequenceAllocator::new(&storage);
        assert_eq!(allocator.next_after(0).unwrap(), 1);
    }

    #[test]
    fn test_skips_past_numbers_in_use() {
        let storage = MemoryStorage::new();
        storage.write(COUNTER_KEY, "3").unwrap();

        let allocator = SequenceAllocator::new(&storage);
        assert_eq!(allocator.next_after(9).unwrap(), 10);
        assert_eq!(allocator.current().unwrap(), 10);
        // A stale floor does not pull the counter back
        assert_eq!(allocator.next_after(2).unwrap(), 11);
    }

    #[test]
    fn test_write_failure_propagates() {
        let storage = MemoryStorage::new();
        storage.set_simulate_write_error(true);

        let allocator = SequenceAllocator::new(&storage);
        assert!(allocator.next_after(0).is_err());

        storage.set_simulate_write_error(false);
        assert_eq!(allocator.current().unwrap(), 0);
    }
}
