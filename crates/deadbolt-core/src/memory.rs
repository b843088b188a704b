//! In-memory store implementation
//!
//! Process-local `LockStore` over a concurrent map keyed by record name.
//! Backs the protocol test-suite and embedders that want the lock API
//! without an external store.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::error::StoreError;
use crate::model::LockRecord;
use crate::store::{ExpireStamp, InsertOutcome, LockStore, RecordFilter, Selector};

/// In-memory lock-record store.
///
/// Name uniqueness is structural (records are keyed by name), and the map's
/// per-key locking provides the per-document atomicity the protocol needs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<String, LockRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record, live and reclaimed. Diagnostic only.
    pub fn records(&self) -> Vec<LockRecord> {
        self.records.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Atomically remove the record matching `filter`, if any.
    ///
    /// The key is located first (by name directly, or by scanning for a
    /// code), then `remove_if` re-evaluates the filter under the entry lock,
    /// so a concurrent writer that got there first simply leaves us with no
    /// match.
    fn take(&self, filter: &RecordFilter) -> Option<LockRecord> {
        let key = match &filter.selector {
            Selector::Name(name) => name.clone(),
            Selector::Code(_) => self
                .records
                .iter()
                .find(|entry| filter.matches(entry.value()))
                .map(|entry| entry.key().clone())?,
        };
        self.records
            .remove_if(&key, |_, record| filter.matches(record))
            .map(|(_, record)| record)
    }
}

#[async_trait]
impl LockStore for MemoryStore {
    async fn find_one_and_update(
        &self,
        filter: RecordFilter,
        stamp: ExpireStamp,
    ) -> Result<Option<LockRecord>, StoreError> {
        let Some(prior) = self.take(&filter) else {
            return Ok(None);
        };
        let mut dead = prior.clone();
        dead.name = stamp.renamed;
        dead.expired = Some(stamp.at);
        self.records.insert(dead.name.clone(), dead);
        Ok(Some(prior))
    }

    async fn find_one_and_delete(
        &self,
        filter: RecordFilter,
    ) -> Result<Option<LockRecord>, StoreError> {
        Ok(self.take(&filter))
    }

    async fn insert(&self, record: &LockRecord) -> Result<InsertOutcome, StoreError> {
        match self.records.entry(record.name.clone()) {
            Entry::Occupied(_) => Ok(InsertOutcome::DuplicateName),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    async fn ensure_name_index(&self) -> Result<(), StoreError> {
        // Keyed by name; the index exists by construction.
        Ok(())
    }
}
