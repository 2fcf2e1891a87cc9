use std::sync::{Arc, Mutex};
use tokio::task::JoinSet;
use tracing::{info, warn};

use super::BlobStore;
use crate::models::BlobRef;
use crate::observability::Metrics;

/// Post-commit blob cleanup.
///
/// `schedule` hands a batch of references to a background task and returns
/// immediately; deletion failures are logged and counted, never surfaced to
/// the request that scheduled them. `drain` waits for every outstanding batch.
#[derive(Clone)]
pub struct BlobJanitor {
    store: Arc<dyn BlobStore>,
    metrics: Arc<Metrics>,
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl BlobJanitor {
    pub fn new(store: Arc<dyn BlobStore>, metrics: Arc<Metrics>) -> Self {
        Self {
            store,
            metrics,
            tasks: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    /// Queue deletion of `refs`. `reason` is recorded in logs.
    pub fn schedule(&self, refs: Vec<BlobRef>, reason: &'static str) {
        if refs.is_empty() {
            return;
        }

        let store = self.store.clone();
        let metrics = self.metrics.clone();
        let mut tasks = match self.tasks.lock() {
            Ok(tasks) => tasks,
            Err(poisoned) => poisoned.into_inner(),
        };

        // Reap finished batches so the set does not grow without bound
        while tasks.try_join_next().is_some() {}

        info!(count = refs.len(), reason, "Scheduling blob cleanup");
        tasks.spawn(async move {
            for blob in refs {
                match store.delete(&blob).await {
                    Ok(()) => metrics.record_blob_operation("delete", true),
                    Err(e) => {
                        metrics.record_blob_operation("delete", false);
                        warn!(blob = %blob, reason, error = %e, "Blob cleanup failed");
                    }
                }
            }
        });
    }

    /// Number of batches not yet reaped
    pub fn pending(&self) -> usize {
        match self.tasks.lock() {
            Ok(tasks) => tasks.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Wait until every scheduled batch has finished
    pub async fn drain(&self) {
        loop {
            let mut batch = {
                let mut tasks = match self.tasks.lock() {
                    Ok(tasks) => tasks,
                    Err(poisoned) => poisoned.into_inner(),
                };
                std::mem::take(&mut *tasks)
            };

            if batch.is_empty() {
                return;
            }

            while let Some(result) = batch.join_next().await {
                if let Err(e) = result {
                    warn!(error = %e, "Blob cleanup task aborted");
                }
            }
        }
    }
}
