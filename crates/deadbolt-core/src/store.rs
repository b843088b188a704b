//! Store capability consumed by the lock protocol
//!
//! The protocol needs four operations from a backing store, each scoped to a
//! single document and each atomic on that document:
//! - stamp at most one matching record (returning its pre-image)
//! - delete at most one matching record (returning its pre-image)
//! - uniqueness-enforcing insert
//! - idempotent unique-index declaration on `name`
//!
//! No scan, multi-document transaction, or cross-collection coordination is
//! required of an implementation.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::LockRecord;

/// Exact-match selector for a single live record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// The record currently holding this lock name.
    Name(String),
    /// The record created with this code.
    Code(String),
}

/// Bound on the record's `expire` field, both ends strict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpireBound {
    /// `expire < t`: the holder has timed out (reclamation path).
    Before(i64),
    /// `expire > t`: the holder is still within its window (release path).
    After(i64),
}

/// Filter selecting at most one record.
///
/// A filter only ever matches records without an `expired` stamp; reclaimed
/// records are inert and invisible to the protocol.
#[derive(Debug, Clone)]
pub struct RecordFilter {
    pub selector: Selector,
    pub expire: ExpireBound,
}

impl RecordFilter {
    /// The stale holder of `name`: timed out before `now`, not yet reclaimed.
    pub fn stale_name(name: impl Into<String>, now: i64) -> Self {
        Self {
            selector: Selector::Name(name.into()),
            expire: ExpireBound::Before(now),
        }
    }

    /// The still-valid record created with `code`.
    pub fn live_code(code: impl Into<String>, now: i64) -> Self {
        Self {
            selector: Selector::Code(code.into()),
            expire: ExpireBound::After(now),
        }
    }

    /// Evaluate the filter against a record.
    pub fn matches(&self, record: &LockRecord) -> bool {
        if record.is_dead() {
            return false;
        }
        let selected = match &self.selector {
            Selector::Name(name) => &record.name == name,
            Selector::Code(code) => &record.code == code,
        };
        let in_bound = match self.expire {
            ExpireBound::Before(t) => record.expire < t,
            ExpireBound::After(t) => record.expire > t,
        };
        selected && in_bound
    }
}

/// Mutation applied to a reclaimed record: rewrite the name so the unique
/// index frees it, and stamp the reclamation time.
#[derive(Debug, Clone)]
pub struct ExpireStamp {
    /// The rewritten name, `name:timestamp`.
    pub renamed: String,
    /// Reclamation time (Unix millis), stored in the `expired` field.
    pub at: i64,
}

impl ExpireStamp {
    pub fn new(name: &str, now: i64) -> Self {
        Self {
            renamed: format!("{}:{}", name, now),
            at: now,
        }
    }
}

/// Result of a uniqueness-enforcing insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record was written; the caller now holds the lock.
    Inserted,
    /// A live record with the same name already exists.
    DuplicateName,
}

/// Atomic single-document operations over the lock-record collection.
///
/// Implementations must guarantee per-document atomicity: for a given filter,
/// at most one caller observes a pre-image from `find_one_and_update` /
/// `find_one_and_delete`, and `insert` enforces name uniqueness against
/// records not yet stamped. Everything else about mutual exclusion is the
/// protocol's job.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Atomically apply `stamp` to at most one record matching `filter`,
    /// returning the pre-modification record if one matched.
    async fn find_one_and_update(
        &self,
        filter: RecordFilter,
        stamp: ExpireStamp,
    ) -> Result<Option<LockRecord>, StoreError>;

    /// Atomically delete at most one record matching `filter`, returning the
    /// deleted record if one matched.
    async fn find_one_and_delete(
        &self,
        filter: RecordFilter,
    ) -> Result<Option<LockRecord>, StoreError>;

    /// Insert a fresh record, enforcing the unique index on `name`.
    async fn insert(&self, record: &LockRecord) -> Result<InsertOutcome, StoreError>;

    /// Declare the unique index on `name`. Idempotent; must complete before
    /// concurrent `acquire` calls are safe.
    async fn ensure_name_index(&self) -> Result<(), StoreError>;
}
