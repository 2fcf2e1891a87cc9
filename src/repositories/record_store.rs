use async_trait::async_trait;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use crate::models::{Record, RepositoryResult};
use crate::observability::Metrics;

/// Trait defining CRUD persistence for one collection of records
#[async_trait]
pub trait RecordStore<T: Record>: Send + Sync {
    /// Insert a new record. Fails with `ConstraintViolation` when the id or a unique key is taken.
    async fn create(&self, record: T) -> RepositoryResult<T>;

    /// Find a record by its id
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<T>>;

    /// List records matching the filter, newest first
    async fn find_all(&self, filter: RecordFilter) -> RepositoryResult<Vec<T>>;

    /// Replace an existing record. Fails with `NotFound` when it does not exist.
    async fn update(&self, record: T) -> RepositoryResult<T>;

    /// Delete a record; returns whether it existed
    async fn delete(&self, id: &str) -> RepositoryResult<bool>;
}

/// Optional equality filter on a top-level string field of the serialized record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub field_equals: Option<(String, String)>,
}

impl RecordFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn field(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field_equals: Some((name.into(), value.into())),
        }
    }

    /// Check a serialized record against the filter
    pub fn matches(&self, document: &Value) -> bool {
        match &self.field_equals {
            Some((field, expected)) => {
                document.get(field).and_then(Value::as_str) == Some(expected.as_str())
            }
            None => true,
        }
    }
}

/// Sort records by creation time, newest first
pub fn sort_newest_first<T: Record>(records: &mut [T]) {
    records.sort_by_key(|r| std::cmp::Reverse(r.created_at()));
}

/// Record store decorator that reports every operation to Prometheus
pub struct MeteredRecordStore<T: Record> {
    inner: Arc<dyn RecordStore<T>>,
    metrics: Arc<Metrics>,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> MeteredRecordStore<T> {
    pub fn new(inner: Arc<dyn RecordStore<T>>, metrics: Arc<Metrics>) -> Self {
        Self {
            inner,
            metrics,
            _record: PhantomData,
        }
    }

    fn observe<R>(&self, operation: &str, started: Instant, result: &RepositoryResult<R>) {
        self.metrics.record_database_operation(
            operation,
            T::COLLECTION,
            result.is_ok(),
            started.elapsed().as_secs_f64(),
        );
    }
}

#[async_trait]
impl<T: Record> RecordStore<T> for MeteredRecordStore<T> {
    async fn create(&self, record: T) -> RepositoryResult<T> {
        let started = Instant::now();
        let result = self.inner.create(record).await;
        self.observe("create", started, &result);
        result
    }

    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<T>> {
        let started = Instant::now();
        let result = self.inner.find_by_id(id).await;
        self.observe("find_by_id", started, &result);
        result
    }

    async fn find_all(&self, filter: RecordFilter) -> RepositoryResult<Vec<T>> {
        let started = Instant::now();
        let result = self.inner.find_all(filter).await;
        self.observe("find_all", started, &result);
        result
    }

    async fn update(&self, record: T) -> RepositoryResult<T> {
        let started = Instant::now();
        let result = self.inner.update(record).await;
        self.observe("update", started, &result);
        result
    }

    async fn delete(&self, id: &str) -> RepositoryResult<bool> {
        let started = Instant::now();
        let result = self.inner.delete(id).await;
        self.observe("delete", started, &result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_matches_top_level_string_field() {
        let doc = json!({"id": "G1", "zone": "north", "services": []});

        assert!(RecordFilter::all().matches(&doc));
        assert!(RecordFilter::field("zone", "north").matches(&doc));
        assert!(!RecordFilter::field("zone", "south").matches(&doc));
        assert!(!RecordFilter::field("missing", "north").matches(&doc));
        assert!(!RecordFilter::field("services", "[]").matches(&doc));
    }
}
