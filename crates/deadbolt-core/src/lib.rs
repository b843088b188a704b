//! Deadbolt Core - store-backed mutual exclusion
//!
//! This crate provides:
//! - The lock protocol: acquire / release over atomic single-document
//!   operations, with lazy expiry reclamation (no watchdog, no scheduler)
//! - The `LockStore` capability trait a backing store must satisfy
//! - The persisted lock-record model
//! - An in-memory store for tests and single-process embedding
//!
//! State lives in the shared store, not in process memory: independent
//! processes coordinate exclusive access to a named resource through
//! nothing but per-document atomicity and one unique index. This is a
//! best-effort, timeout-based primitive with at-most-one-holder semantics
//! per name; it is not a consensus protocol, offers no renewal or
//! fairness, and a holder's side effects are not fenced past its timeout.

pub mod error;
pub mod lock;
pub mod memory;
pub mod model;
pub mod store;

// Re-export the public surface
pub use error::{LockError, StoreError};
pub use lock::{Lock, LockConfig};
pub use memory::MemoryStore;
pub use model::LockRecord;
pub use store::{ExpireBound, ExpireStamp, InsertOutcome, LockStore, RecordFilter, Selector};
