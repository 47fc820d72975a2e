// libs/shared/database/src/store.rs
//
// Embedded persistence substrate. Writes that touch the same aggregate are
// serialized either through an optimistic version check (`Collection::update`)
// or a narrow per-key critical section (`ScopeLocks`). Reads clone records
// out and never hold a lock across an await point.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, RwLock};

use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("record not found")]
    NotFound,

    #[error("version check failed: expected {expected}, found {found}")]
    StaleWrite { expected: u64, found: u64 },

    #[error("record already exists")]
    Duplicate,

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// A stored record together with its revision counter. The counter starts at
/// 1 on insert and increments on every committed write.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub record: T,
    pub version: u64,
}

/// In-memory table of versioned records keyed by id.
pub struct Collection<T> {
    records: RwLock<HashMap<Uuid, Versioned<T>>>,
}

impl<T: Clone> Collection<T> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert(&self, id: Uuid, record: T) -> Result<Versioned<T>, StorageError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        if records.contains_key(&id) {
            return Err(StorageError::Duplicate);
        }

        let stored = Versioned { record, version: 1 };
        records.insert(id, stored.clone());
        Ok(stored)
    }

    /// Insert or replace, bumping the version if the record already exists.
    pub fn upsert(&self, id: Uuid, record: T) -> Result<Versioned<T>, StorageError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        let version = records.get(&id).map(|v| v.version + 1).unwrap_or(1);
        let stored = Versioned { record, version };
        records.insert(id, stored.clone());
        Ok(stored)
    }

    pub fn get(&self, id: Uuid) -> Result<Option<Versioned<T>>, StorageError> {
        let records = self
            .records
            .read()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(records.get(&id).cloned())
    }

    pub fn filter<P>(&self, predicate: P) -> Result<Vec<Versioned<T>>, StorageError>
    where
        P: Fn(&T) -> bool,
    {
        let records = self
            .records
            .read()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(records
            .values()
            .filter(|v| predicate(&v.record))
            .cloned()
            .collect())
    }

    /// Compare-and-swap write. The closure runs only if the stored version
    /// still matches `expected_version`; otherwise the write is rejected
    /// with `StaleWrite` and the record is untouched.
    pub fn update<F>(
        &self,
        id: Uuid,
        expected_version: u64,
        apply: F,
    ) -> Result<Versioned<T>, StorageError>
    where
        F: FnOnce(&mut T),
    {
        let mut records = self
            .records
            .write()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        let stored = records.get_mut(&id).ok_or(StorageError::NotFound)?;
        if stored.version != expected_version {
            debug!(
                "stale write on {}: expected v{}, found v{}",
                id, expected_version, stored.version
            );
            return Err(StorageError::StaleWrite {
                expected: expected_version,
                found: stored.version,
            });
        }

        apply(&mut stored.record);
        stored.version += 1;
        Ok(stored.clone())
    }
}

impl<T: Clone> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazily allocated exclusive critical sections, one per aggregate key.
/// Writers on the same key serialize; writers on different keys never
/// contend. Guards are owned so they can be held across await points.
pub struct ScopeLocks<K> {
    locks: StdMutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K: Eq + Hash + Clone> ScopeLocks<K> {
    pub fn new() -> Self {
        Self {
            locks: StdMutex::new(HashMap::new()),
        }
    }

    pub async fn acquire(&self, key: K) -> Result<OwnedMutexGuard<()>, StorageError> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .map_err(|e| StorageError::Unavailable(e.to_string()))?;
            Arc::clone(locks.entry(key).or_insert_with(|| Arc::new(Mutex::new(()))))
        };
        Ok(lock.lock_owned().await)
    }
}

impl<K: Eq + Hash + Clone> Default for ScopeLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Monotonic counter for sequential number assignment. Gap-tolerant: a
/// number handed out to a creation that later fails is never reused.
pub struct Sequence {
    next: AtomicU64,
}

impl Sequence {
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn insert_then_get_returns_version_one() {
        let collection: Collection<String> = Collection::new();
        let id = Uuid::new_v4();

        collection.insert(id, "hello".to_string()).unwrap();

        let stored = collection.get(id).unwrap().unwrap();
        assert_eq!(stored.record, "hello");
        assert_eq!(stored.version, 1);
    }

    #[test]
    fn double_insert_is_rejected() {
        let collection: Collection<u32> = Collection::new();
        let id = Uuid::new_v4();

        collection.insert(id, 1).unwrap();
        assert_matches!(collection.insert(id, 2), Err(StorageError::Duplicate));
    }

    #[test]
    fn update_with_stale_version_is_rejected() {
        let collection: Collection<u32> = Collection::new();
        let id = Uuid::new_v4();
        collection.insert(id, 10).unwrap();

        collection.update(id, 1, |n| *n += 1).unwrap();

        // Second writer still holds version 1.
        let result = collection.update(id, 1, |n| *n += 1);
        assert_matches!(
            result,
            Err(StorageError::StaleWrite {
                expected: 1,
                found: 2
            })
        );

        let stored = collection.get(id).unwrap().unwrap();
        assert_eq!(stored.record, 11);
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn scope_locks_serialize_same_key() {
        let locks: Arc<ScopeLocks<(Uuid, u32)>> = Arc::new(ScopeLocks::new());
        let key = (Uuid::new_v4(), 7);

        let guard = locks.acquire(key.clone()).await.unwrap();

        // Same key must wait; a different key must not.
        let contended = {
            let locks = Arc::clone(&locks);
            let key = key.clone();
            tokio::spawn(async move { locks.acquire(key).await.unwrap() })
        };
        let other = locks.acquire((Uuid::new_v4(), 7)).await.unwrap();
        drop(other);

        tokio::task::yield_now().await;
        assert!(!contended.is_finished());

        drop(guard);
        contended.await.unwrap();
    }

    #[test]
    fn sequence_is_monotonic() {
        let sequence = Sequence::starting_at(5);
        assert_eq!(sequence.next(), 5);
        assert_eq!(sequence.next(), 6);
        assert_eq!(sequence.next(), 7);
    }
}
