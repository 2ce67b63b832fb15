//! In-memory set of known triggers.
//!
//! The index answers "could this message match a respondent?" without a store
//! round trip. A trigger is present iff at least one stored respondent has it.
//! Mutations of one trigger are serialized through a per-trigger lock so that
//! a delete's orphan check cannot interleave with a concurrent post of the
//! same trigger.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::sync::OwnedMutexGuard;

use crate::respondent::RespondentFilter;
use crate::store::{RespondentStore, StoreResult};

type TriggerLock = Arc<tokio::sync::Mutex<()>>;

#[derive(Debug, Default)]
pub struct TriggerIndex {
    triggers: RwLock<HashSet<String>>,
    locks: Mutex<HashMap<String, TriggerLock>>,
}

impl TriggerIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every trigger currently in the store. Returns the number of
    /// distinct triggers known afterwards.
    pub async fn initialize(&self, store: &dyn RespondentStore) -> StoreResult<usize> {
        let loaded = store.triggers().await?;
        let mut triggers = self.write();
        triggers.extend(loaded);
        tracing::debug!(count = triggers.len(), "trigger index initialized");
        Ok(triggers.len())
    }

    pub fn contains(&self, text: &str) -> bool {
        self.read().contains(text)
    }

    pub fn add(&self, trigger: &str) {
        if self.write().insert(trigger.to_string()) {
            tracing::debug!(trigger, "trigger added to index");
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Acquire the mutation lock for `trigger`.
    pub async fn lock(&self, trigger: &str) -> TriggerGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(trigger.to_string()).or_default())
        };
        let guard = lock.lock_owned().await;
        TriggerGuard {
            index: self,
            trigger: trigger.to_string(),
            guard: Some(guard),
        }
    }

    /// Drop the guarded trigger if no stored respondent still uses it.
    /// Returns true when the trigger was removed.
    pub async fn remove_if_orphaned(
        &self,
        guard: &TriggerGuard<'_>,
        store: &dyn RespondentStore,
    ) -> StoreResult<bool> {
        let remaining = store
            .query_ids(&RespondentFilter::trigger(guard.trigger()))
            .await?;
        if !remaining.is_empty() {
            return Ok(false);
        }
        let removed = self.write().remove(guard.trigger());
        if removed {
            tracing::debug!(trigger = guard.trigger(), "orphaned trigger removed from index");
        }
        Ok(removed)
    }

    /// Number of triggers with a live lock entry.
    #[cfg(test)]
    fn lock_entries(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashSet<String>> {
        self.triggers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashSet<String>> {
        self.triggers.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive right to mutate one trigger. Released on drop.
#[derive(Debug)]
pub struct TriggerGuard<'a> {
    index: &'a TriggerIndex,
    trigger: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl TriggerGuard<'_> {
    pub fn trigger(&self) -> &str {
        &self.trigger
    }
}

impl Drop for TriggerGuard<'_> {
    fn drop(&mut self) {
        let mut locks = self
            .index
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        drop(self.guard.take());
        // Only the table still holds the lock: nobody is waiting on it.
        if locks
            .get(&self.trigger)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.trigger);
        }
    }
}
