use std::sync::Arc;
use tracing::warn;

use crate::models::{BlobRef, ServiceResult, Upload};
use crate::observability::Metrics;
use crate::storage::{BlobJanitor, BlobStore};

/// Writes the uploads of one request and remembers every stored reference,
/// so a request that fails after storing some of them can be rolled back.
pub struct UploadStager {
    blobs: Arc<dyn BlobStore>,
    metrics: Arc<Metrics>,
    stored: Vec<BlobRef>,
}

impl UploadStager {
    pub fn new(blobs: Arc<dyn BlobStore>, metrics: Arc<Metrics>) -> Self {
        Self {
            blobs,
            metrics,
            stored: Vec::new(),
        }
    }

    pub async fn store(&mut self, upload: &Upload) -> ServiceResult<BlobRef> {
        match self.blobs.store(upload).await {
            Ok(blob) => {
                self.metrics.record_blob_operation("store", true);
                self.stored.push(blob.clone());
                Ok(blob)
            }
            Err(e) => {
                self.metrics.record_blob_operation("store", false);
                warn!(field = %upload.field, error = %e, "Failed to store upload");
                Err(e.into())
            }
        }
    }

    pub async fn store_all(&mut self, uploads: &[Upload]) -> ServiceResult<Vec<BlobRef>> {
        let mut refs = Vec::with_capacity(uploads.len());
        for upload in uploads {
            refs.push(self.store(upload).await?);
        }
        Ok(refs)
    }

    pub fn stored(&self) -> &[BlobRef] {
        &self.stored
    }

    /// Schedule deletion of everything this request stored
    pub fn rollback(self, janitor: &BlobJanitor) {
        if !self.stored.is_empty() {
            warn!(count = self.stored.len(), "Rolling back uploads of failed request");
            janitor.schedule(self.stored, "rollback");
        }
    }
}
