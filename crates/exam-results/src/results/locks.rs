use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::domain::BatchId;

/// One mutex per batch so "mutate then rank" sequences on the same batch never interleave.
#[derive(Debug, Default)]
pub struct BatchLocks {
    locks: Mutex<HashMap<BatchId, Arc<Mutex<()>>>>,
}

impl BatchLocks {
    pub fn lock_for(&self, batch: &BatchId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(batch.clone()).or_default().clone()
    }

    /// Run `work` while holding the batch's lock. The guarded value is `()`, so a poisoned lock
    /// carries no torn state and is reclaimed.
    ///
    /// The entry is dropped again once no other caller holds or waits on it.
    pub fn run_exclusive<T>(&self, batch: &BatchId, work: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(batch);
        let outcome = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            work()
        };
        self.release(batch, lock);
        outcome
    }

    /// Number of batches with a live lock entry.
    pub fn tracked(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn release(&self, batch: &BatchId, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Our clone is dropped under the map lock, so a lone map copy means nobody else holds it.
        drop(lock);
        if locks
            .get(batch)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(batch);
        }
    }
}
