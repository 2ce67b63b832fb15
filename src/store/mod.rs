//! Respondent store abstractions and in-memory backend.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::respondent::{NewRespondent, Respondent, RespondentFilter};

mod sqlite;

pub use sqlite::SqliteRespondentStore;

/// Result type for respondent store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid persisted value for '{field}': {value}")]
    InvalidPersistedValue { field: &'static str, value: String },
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Durable keyed storage of respondent records.
///
/// Ids are assigned by the store, increase monotonically and are never
/// reused. There is no update operation.
#[async_trait]
pub trait RespondentStore: Send + Sync {
    async fn create(&self, record: NewRespondent) -> StoreResult<Respondent>;
    async fn get(&self, id: u64) -> StoreResult<Option<Respondent>>;
    /// All records matching `filter`, ordered by id.
    async fn query(&self, filter: &RespondentFilter) -> StoreResult<Vec<Respondent>>;
    /// Ids of the records matching `filter`, ordered.
    async fn query_ids(&self, filter: &RespondentFilter) -> StoreResult<Vec<u64>> {
        Ok(self
            .query(filter)
            .await?
            .into_iter()
            .map(|record| record.id)
            .collect())
    }
    /// Trigger of every stored record (duplicates included).
    async fn triggers(&self) -> StoreResult<Vec<String>> {
        Ok(self
            .query(&RespondentFilter::default())
            .await?
            .into_iter()
            .map(|record| record.trigger)
            .collect())
    }
    /// Returns true when a record was removed.
    async fn delete(&self, id: u64) -> StoreResult<bool>;
}

/// Volatile store, used for `backend = "memory"` and in tests.
#[derive(Debug, Default)]
pub struct InMemoryRespondentStore {
    inner: RwLock<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    records: BTreeMap<u64, Respondent>,
    last_id: u64,
}

impl InMemoryRespondentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RespondentStore for InMemoryRespondentStore {
    async fn create(&self, record: NewRespondent) -> StoreResult<Respondent> {
        let mut inner = self.inner.write().await;
        inner.last_id += 1;
        let created = record.with_id(inner.last_id);
        inner.records.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get(&self, id: u64) -> StoreResult<Option<Respondent>> {
        Ok(self.inner.read().await.records.get(&id).cloned())
    }

    async fn query(&self, filter: &RespondentFilter) -> StoreResult<Vec<Respondent>> {
        let inner = self.inner.read().await;
        Ok(inner
            .records
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect())
    }

    async fn delete(&self, id: u64) -> StoreResult<bool> {
        Ok(self.inner.write().await.records.remove(&id).is_some())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::new_record;
    use super::*;

    #[tokio::test]
    async fn assigns_increasing_ids_and_never_reuses_them() {
        let store = InMemoryRespondentStore::new();
        let first = store.create(new_record(1, "a", "x")).await.expect("create");
        let second = store.create(new_record(1, "b", "y")).await.expect("create");
        assert_eq!((first.id, second.id), (1, 2));

        assert!(store.delete(2).await.expect("delete"));
        let third = store.create(new_record(1, "c", "z")).await.expect("create");
        assert_eq!(third.id, 3);
    }

    #[tokio::test]
    async fn queries_by_trigger_in_id_order() {
        let store = InMemoryRespondentStore::new();
        store.create(new_record(1, "hello", "one")).await.expect("create");
        store.create(new_record(2, "bye", "two")).await.expect("create");
        store.create(new_record(3, "hello", "three")).await.expect("create");

        let ids = store
            .query_ids(&RespondentFilter::trigger("hello"))
            .await
            .expect("query");
        assert_eq!(ids, vec![1, 3]);

        let mut triggers = store.triggers().await.expect("triggers");
        triggers.sort();
        assert_eq!(triggers, vec!["bye", "hello", "hello"]);
    }

    #[tokio::test]
    async fn delete_reports_absent_records() {
        let store = InMemoryRespondentStore::new();
        assert!(!store.delete(42).await.expect("delete"));
        assert!(store.get(42).await.expect("get").is_none());
    }
}
