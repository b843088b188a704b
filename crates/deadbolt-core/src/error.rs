//! Error types for the lock protocol and store adapters

use thiserror::Error;

/// Errors surfaced by lock construction and the acquire/release protocol.
///
/// Contention is not an error: a busy lock is the `None` arm of `acquire`,
/// and releasing an unknown or expired code is the `false` arm of `release`.
#[derive(Debug, Error)]
pub enum LockError {
    /// Lock name was empty at construction.
    #[error("lock name must not be empty")]
    EmptyName,

    /// Configured timeout was zero.
    #[error("lock timeout must be greater than zero")]
    ZeroTimeout,

    /// The backing store failed an atomic operation. Propagated verbatim;
    /// the protocol never retries on the caller's behalf.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failure reported by a store adapter, carrying the backend error as source.
#[derive(Debug, Error)]
#[error("store operation '{operation}' failed: {source}")]
pub struct StoreError {
    operation: &'static str,
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl StoreError {
    pub fn new(
        operation: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            operation,
            source: source.into(),
        }
    }

    /// The store operation that failed, e.g. `"insertOne"`.
    pub fn operation(&self) -> &'static str {
        self.operation
    }
}
