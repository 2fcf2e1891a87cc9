use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument};

use super::{sort_newest_first, RecordFilter, RecordStore};
use crate::models::{Record, RepositoryError, RepositoryResult};

/// In-process record store keyed by id.
///
/// Used as the default backend and in tests. Contents are lost on restart.
#[derive(Clone)]
pub struct InMemoryRecordStore<T: Record> {
    inner: Arc<RwLock<HashMap<String, T>>>,
}

impl<T: Record> Default for InMemoryRecordStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> InMemoryRecordStore<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    fn check_unique(map: &HashMap<String, T>, record: &T) -> RepositoryResult<()> {
        for (field, value) in record.unique_keys() {
            let taken = map
                .values()
                .filter(|other| other.id() != record.id())
                .flat_map(|other| other.unique_keys())
                .any(|(other_field, other_value)| other_field == field && other_value == value);

            if taken {
                return Err(RepositoryError::ConstraintViolation {
                    message: format!("{} with {} '{}' already exists", T::ENTITY, field, value),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<T: Record> RecordStore<T> for InMemoryRecordStore<T> {
    #[instrument(skip(self, record), fields(collection = T::COLLECTION, id = %record.id()))]
    async fn create(&self, record: T) -> RepositoryResult<T> {
        let mut map = self.inner.write().await;

        if map.contains_key(record.id()) {
            return Err(RepositoryError::ConstraintViolation {
                message: format!("{} with id '{}' already exists", T::ENTITY, record.id()),
            });
        }
        Self::check_unique(&map, &record)?;

        map.insert(record.id().to_string(), record.clone());
        info!("Record created");
        Ok(record)
    }

    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<T>> {
        Ok(self.inner.read().await.get(id).cloned())
    }

    #[instrument(skip(self), fields(collection = T::COLLECTION))]
    async fn find_all(&self, filter: RecordFilter) -> RepositoryResult<Vec<T>> {
        let map = self.inner.read().await;

        let mut records = Vec::with_capacity(map.len());
        for record in map.values() {
            if filter.field_equals.is_none() || filter.matches(&serde_json::to_value(record)?) {
                records.push(record.clone());
            }
        }
        drop(map);

        sort_newest_first(&mut records);
        info!("Found {} records", records.len());
        Ok(records)
    }

    #[instrument(skip(self, record), fields(collection = T::COLLECTION, id = %record.id()))]
    async fn update(&self, record: T) -> RepositoryResult<T> {
        let mut map = self.inner.write().await;

        if !map.contains_key(record.id()) {
            return Err(RepositoryError::NotFound);
        }
        Self::check_unique(&map, &record)?;

        map.insert(record.id().to_string(), record.clone());
        info!("Record updated");
        Ok(record)
    }

    #[instrument(skip(self), fields(collection = T::COLLECTION))]
    async fn delete(&self, id: &str) -> RepositoryResult<bool> {
        let existed = self.inner.write().await.remove(id).is_some();
        info!(existed, "Record delete processed");
        Ok(existed)
    }
}
