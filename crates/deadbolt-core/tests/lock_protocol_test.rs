//! End-to-end protocol tests against the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use regex::Regex;

use deadbolt_core::{Lock, LockConfig, MemoryStore};

fn short_config(remove_expired: bool) -> LockConfig {
    LockConfig {
        timeout: Duration::from_millis(150),
        remove_expired,
    }
}

async fn past_expiry() {
    tokio::time::sleep(Duration::from_millis(200)).await;
}

#[tokio::test]
async fn test_ensure_indexes_is_idempotent() {
    let lock = Lock::with_defaults(Arc::new(MemoryStore::new()), "whatever").unwrap();
    lock.ensure_indexes().await.unwrap();
    lock.ensure_indexes().await.unwrap();
}

#[tokio::test]
async fn test_code_shape() {
    let lock = Lock::with_defaults(Arc::new(MemoryStore::new()), "shape").unwrap();
    let code = lock.acquire().await.unwrap().unwrap();

    let code_pattern = Regex::new("^[0-9a-f]{32}$").unwrap();
    assert!(code_pattern.is_match(&code));
}

#[tokio::test]
async fn test_lock_cannot_be_acquired_twice() {
    let lock = Lock::with_defaults(Arc::new(MemoryStore::new()), "this-lock").unwrap();

    assert!(lock.acquire().await.unwrap().is_some());
    assert!(lock.acquire().await.unwrap().is_none());
}

#[tokio::test]
async fn test_independent_names_are_independent() {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    let lock1 = Lock::with_defaults(store.clone(), "lock-1").unwrap();
    let lock2 = Lock::with_defaults(store.clone(), "lock-2").unwrap();

    assert!(lock1.acquire().await.unwrap().is_some());
    // An outstanding lock on another name changes nothing here.
    assert!(lock2.acquire().await.unwrap().is_some());
}

#[tokio::test]
async fn test_expired_lock_is_reacquired() {
    let lock = Lock::new(Arc::new(MemoryStore::new()), "short", short_config(false)).unwrap();

    let first = lock.acquire().await.unwrap().unwrap();
    past_expiry().await;

    let second = lock.acquire().await.unwrap().expect("expired lock reclaims");
    assert_ne!(first, second);
}

#[tokio::test]
async fn test_release_then_reacquire() {
    let lock = Lock::with_defaults(Arc::new(MemoryStore::new()), "release-me").unwrap();

    let first = lock.acquire().await.unwrap().unwrap();
    assert!(lock.acquire().await.unwrap().is_none());

    assert!(lock.release(&first).await.unwrap());

    let second = lock.acquire().await.unwrap().expect("released lock reacquires");
    assert_ne!(first, second);
}

#[tokio::test]
async fn test_second_release_is_false() {
    let lock = Lock::with_defaults(Arc::new(MemoryStore::new()), "double-release").unwrap();

    let code = lock.acquire().await.unwrap().unwrap();
    assert!(lock.release(&code).await.unwrap());
    assert!(!lock.release(&code).await.unwrap());
}

#[tokio::test]
async fn test_release_after_expiry_is_false() {
    let lock = Lock::new(Arc::new(MemoryStore::new()), "bad-release", short_config(false)).unwrap();

    let code = lock.acquire().await.unwrap().unwrap();
    past_expiry().await;

    // Timed out, never released: nothing left to give back, but not an error.
    assert!(!lock.release(&code).await.unwrap());
}

#[tokio::test]
async fn test_stale_holder_cannot_release_successor() {
    let lock = Lock::new(Arc::new(MemoryStore::new()), "takeover", short_config(false)).unwrap();

    let first = lock.acquire().await.unwrap().unwrap();
    past_expiry().await;
    let second = lock.acquire().await.unwrap().unwrap();

    assert!(!lock.release(&first).await.unwrap());
    assert!(lock.release(&second).await.unwrap());
}

#[tokio::test]
async fn test_kept_record_survives_expiry() {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    let lock = Lock::new(store.clone(), "keep", short_config(false)).unwrap();

    let first = lock.acquire().await.unwrap().unwrap();
    past_expiry().await;
    lock.acquire().await.unwrap().unwrap();

    // The reclaimed record persists under its rewritten name, stamped dead,
    // and no longer occupies the unique index slot for "keep".
    let stale: Vec<_> = store
        .records()
        .into_iter()
        .filter(|record| record.code == first)
        .collect();
    assert_eq!(stale.len(), 1);
    assert!(stale[0].is_dead());
    assert!(stale[0].name.starts_with("keep:"));
}

#[tokio::test]
async fn test_removed_record_is_gone_after_expiry() {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    let lock = Lock::new(store.clone(), "remove", short_config(true)).unwrap();

    let first = lock.acquire().await.unwrap().unwrap();
    past_expiry().await;
    lock.acquire().await.unwrap().unwrap();

    let stale = store
        .records()
        .into_iter()
        .filter(|record| record.code == first)
        .count();
    assert_eq!(stale, 0);
}

#[tokio::test]
async fn test_kept_record_survives_release() {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    let lock = Lock::new(store.clone(), "keep-release", short_config(false)).unwrap();

    let code = lock.acquire().await.unwrap().unwrap();
    assert!(lock.release(&code).await.unwrap());

    // Release rides the same rename+stamp transition as timeout reclamation.
    let stale: Vec<_> = store
        .records()
        .into_iter()
        .filter(|record| record.code == code)
        .collect();
    assert_eq!(stale.len(), 1);
    assert!(stale[0].is_dead());
    assert!(stale[0].name.starts_with("keep-release:"));

    assert!(lock.acquire().await.unwrap().is_some());
}

#[tokio::test]
async fn test_removed_record_is_gone_after_release() {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    let lock = Lock::new(store.clone(), "remove-release", short_config(true)).unwrap();

    let code = lock.acquire().await.unwrap().unwrap();
    assert!(lock.release(&code).await.unwrap());
    assert!(store.records().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_mutual_exclusion_under_contention() {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    let lock = Arc::new(Lock::with_defaults(store, "contended").unwrap());
    lock.ensure_indexes().await.unwrap();

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let lock = lock.clone();
        tasks.push(tokio::spawn(async move { lock.acquire().await.unwrap() }));
    }

    let mut winners = 0;
    for task in tasks {
        if task.await.unwrap().is_some() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}
