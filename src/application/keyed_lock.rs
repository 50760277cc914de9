//! Per-key mutual exclusion.
//!
//! Serializes ledger mutations for one (tenant, user) pair inside this
//! process. Different keys never contend. Entries are dropped as soon as no
//! task holds or waits on them, so the map only grows with concurrency.
//!
//! Across processes the conditional `version` update on the ledger is what
//! keeps writes linear; this lock only avoids needless conflicts.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::foundation::UserId;
use crate::domain::tenant::TenantId;

/// Key used by the reconciliation handlers.
pub type SubscriptionKey = (TenantId, UserId);

type Registry<K> = Arc<Mutex<HashMap<K, Arc<AsyncMutex<()>>>>>;

/// Registry of async locks keyed by `K`.
pub struct KeyedLocks<K: Eq + Hash + Clone> {
    registry: Registry<K>,
}

impl<K: Eq + Hash + Clone> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            registry: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until the lock for `key` is free and takes it.
    pub async fn lock(&self, key: K) -> KeyedGuard<K> {
        let slot = {
            let mut map = lock_registry(&self.registry);
            map.entry(key.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        let guard = slot.lock_owned().await;
        KeyedGuard {
            key,
            registry: self.registry.clone(),
            guard: Some(guard),
        }
    }

    /// Number of keys currently held or awaited.
    pub fn active_keys(&self) -> usize {
        lock_registry(&self.registry).len()
    }
}

fn lock_registry<K>(registry: &Registry<K>) -> MutexGuard<'_, HashMap<K, Arc<AsyncMutex<()>>>> {
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Releases the key on drop.
pub struct KeyedGuard<K: Eq + Hash + Clone> {
    key: K,
    registry: Registry<K>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<K: Eq + Hash + Clone> Drop for KeyedGuard<K> {
    fn drop(&mut self) {
        let mut map = lock_registry(&self.registry);
        // Release first, then forget the slot if only the map still refers to it.
        self.guard.take();
        if let Some(slot) = map.get(&self.key) {
            if Arc::strong_count(slot) == 1 {
                map.remove(&self.key);
            }
        }
    }
}
