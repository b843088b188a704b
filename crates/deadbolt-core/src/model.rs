//! Lock record data model

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// One persisted document per lock name while the lock is held or pending
/// reclamation.
///
/// Field names are part of the storage format and must not change: a record
/// written by one process is read and reclaimed by others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    /// Lock identity. Rewritten to `name:timestamp` on expiry so the unique
    /// index frees the original name.
    pub name: String,
    /// Capability proving the holder that created this record; required to
    /// release it.
    pub code: String,
    /// Time after which the record is eligible for reclamation (Unix millis).
    pub expire: i64,
    /// Creation time (Unix millis), diagnostic only.
    pub inserted: i64,
    /// Reclamation stamp (Unix millis). Presence marks the record dead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expired: Option<i64>,
}

impl LockRecord {
    /// Build a fresh record for a holder acquiring `name` at `now`.
    pub fn new(
        name: impl Into<String>,
        code: impl Into<String>,
        now: i64,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            expire: now + timeout.as_millis() as i64,
            inserted: now,
            expired: None,
        }
    }

    /// Whether the record has been reclaimed and is permanently inert.
    pub fn is_dead(&self) -> bool {
        self.expired.is_some()
    }
}

/// Generate a fresh lock code: 16 random bytes as 32 lowercase hex chars.
pub(crate) fn generate_code() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    const_hex::encode(bytes)
}

pub(crate) fn epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
