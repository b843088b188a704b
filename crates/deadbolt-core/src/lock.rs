//! Lock handle and acquire/release protocol

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{LockError, StoreError};
use crate::model::{LockRecord, epoch_millis, generate_code};
use crate::store::{ExpireStamp, InsertOutcome, LockStore, RecordFilter};

/// Lock behaviour knobs, validated at construction.
#[derive(Debug, Clone)]
pub struct LockConfig {
    /// Window before a held lock becomes reclaimable.
    pub timeout: Duration,
    /// If true, reclamation deletes the stale record; if false, it is
    /// renamed and stamped in place so it stays queryable.
    pub remove_expired: bool,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            remove_expired: false,
        }
    }
}

/// A handle on one named lock in a shared store.
///
/// Handles are cheap and carry no held-lock state: the only coordination
/// point is the record collection behind the [`LockStore`], so any number of
/// handles for the same name, in any number of processes, behave as one
/// lock. `acquire` returns a code; holding that code is holding the lock.
pub struct Lock {
    store: Arc<dyn LockStore>,
    name: String,
    config: LockConfig,
}

impl Lock {
    /// Create a handle for `name` backed by `store`.
    ///
    /// Fails fast on an empty name or a zero timeout; neither is retried or
    /// deferred to the first operation.
    pub fn new(
        store: Arc<dyn LockStore>,
        name: impl Into<String>,
        config: LockConfig,
    ) -> Result<Self, LockError> {
        let name = name.into();
        if name.is_empty() {
            return Err(LockError::EmptyName);
        }
        if config.timeout.is_zero() {
            return Err(LockError::ZeroTimeout);
        }
        Ok(Self { store, name, config })
    }

    /// Create a handle with the default configuration (30 s timeout,
    /// expired records kept in place).
    pub fn with_defaults(
        store: Arc<dyn LockStore>,
        name: impl Into<String>,
    ) -> Result<Self, LockError> {
        Self::new(store, name, LockConfig::default())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Declare the unique index on `name`.
    ///
    /// Idempotent. The exclusivity guarantee of `acquire` rests entirely on
    /// this index being enforced by the store, so call it once at startup
    /// before contending.
    pub async fn ensure_indexes(&self) -> Result<(), LockError> {
        self.store.ensure_name_index().await?;
        info!(name = %self.name, "lock index ensured");
        Ok(())
    }

    /// Try to take the lock.
    ///
    /// Returns `Ok(Some(code))` when acquired; the code is the capability
    /// required to `release`. Returns `Ok(None)` when a live holder is
    /// within its timeout window (contention is not an error).
    ///
    /// Two store round-trips: first any stale holder of this name is
    /// reclaimed (the result is discarded; it only matters that the name is
    /// cleared), then a fresh record is inserted. The two steps are not a
    /// transaction: two callers may both attempt reclamation, but only one
    /// can flip a given stale record, and the insert's unique index is the
    /// actual exclusivity gate.
    pub async fn acquire(&self) -> Result<Option<String>, LockError> {
        let now = epoch_millis();

        let reclaimed = self
            .reclaim(RecordFilter::stale_name(&self.name, now), now)
            .await?;
        if let Some(stale) = reclaimed {
            debug!(name = %self.name, code = %stale.code, "reclaimed stale holder");
        }

        let record = LockRecord::new(&self.name, generate_code(), now, self.config.timeout);
        match self.store.insert(&record).await? {
            InsertOutcome::Inserted => {
                debug!(name = %self.name, expire = record.expire, "lock acquired");
                Ok(Some(record.code))
            }
            InsertOutcome::DuplicateName => {
                debug!(name = %self.name, "lock busy");
                Ok(None)
            }
        }
    }

    /// Give the lock back.
    ///
    /// Returns `Ok(true)` if the record created with `code` was still valid
    /// and has now been reclaimed, freeing the name for the next `acquire`.
    /// Returns `Ok(false)` when there was nothing to release: unknown code,
    /// already released, or already timed out and reclaimed by someone
    /// else's `acquire`. None of those are errors.
    pub async fn release(&self, code: &str) -> Result<bool, LockError> {
        let now = epoch_millis();

        let prior = self
            .reclaim(RecordFilter::live_code(code, now), now)
            .await?;
        // A pre-image that already carries a stamp lost a reclamation race;
        // canonically that is "nothing to release".
        let released = prior.is_some_and(|record| !record.is_dead());
        if released {
            debug!(name = %self.name, "lock released");
        } else {
            debug!(name = %self.name, "nothing to release");
        }
        Ok(released)
    }

    /// Apply the configured reclamation action to at most one record.
    ///
    /// Release goes through the same transition as timeout reclamation:
    /// there is no renewal path and no direct deletion by the holder.
    async fn reclaim(
        &self,
        filter: RecordFilter,
        now: i64,
    ) -> Result<Option<LockRecord>, StoreError> {
        if self.config.remove_expired {
            self.store.find_one_and_delete(filter).await
        } else {
            self.store
                .find_one_and_update(filter, ExpireStamp::new(&self.name, now))
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn test_config_defaults() {
        let config = LockConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(!config.remove_expired);
    }

    #[test]
    fn test_empty_name_rejected() {
        let result = Lock::with_defaults(store(), "");
        assert!(matches!(result, Err(LockError::EmptyName)));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = LockConfig {
            timeout: Duration::ZERO,
            remove_expired: false,
        };
        let result = Lock::new(store(), "jobs", config);
        assert!(matches!(result, Err(LockError::ZeroTimeout)));
    }

    #[tokio::test]
    async fn test_acquire_returns_code() {
        let lock = Lock::with_defaults(store(), "jobs").unwrap();
        lock.ensure_indexes().await.unwrap();

        let code = lock.acquire().await.unwrap().expect("free lock acquires");
        assert_eq!(code.len(), 32);
    }

    #[tokio::test]
    async fn test_acquire_while_held_is_none() {
        let lock = Lock::with_defaults(store(), "jobs").unwrap();

        assert!(lock.acquire().await.unwrap().is_some());
        assert!(lock.acquire().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_release_unknown_code_is_false() {
        let lock = Lock::with_defaults(store(), "jobs").unwrap();
        assert!(!lock.release("0000deadbeef0000deadbeef0000dead").await.unwrap());
    }
}
