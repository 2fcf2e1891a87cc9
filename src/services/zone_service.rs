use std::sync::Arc;
use tracing::instrument;

use crate::models::{
    validate_optional_text, BlobRef, NewZone, Record, RepositoryError, ServiceError,
    ServiceResult, Upload, Validate, Zone, ZonePatch, MAX_NAME_LENGTH,
};
use crate::observability::BusinessTracingMiddleware;
use crate::repositories::{RecordFilter, RecordStore};
use crate::services::{non_blank, UploadStager};
use crate::storage::{BlobJanitor, BlobStore};

/// Zones group garages; each carries one cover image
pub struct ZoneService {
    store: Arc<dyn RecordStore<Zone>>,
    blobs: Arc<dyn BlobStore>,
    janitor: BlobJanitor,
    tracing: BusinessTracingMiddleware,
}

impl ZoneService {
    pub fn new(
        store: Arc<dyn RecordStore<Zone>>,
        blobs: Arc<dyn BlobStore>,
        janitor: BlobJanitor,
        tracing: BusinessTracingMiddleware,
    ) -> Self {
        Self {
            store,
            blobs,
            janitor,
            tracing,
        }
    }

    #[instrument(skip(self))]
    pub async fn list_zones(&self) -> ServiceResult<Vec<Zone>> {
        Ok(self.store.find_all(RecordFilter::all()).await?)
    }

    #[instrument(skip(self), fields(id = %id))]
    pub async fn get_zone(&self, id: &str) -> ServiceResult<Zone> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(Zone::ENTITY, id))
    }

    /// Create a zone; the name must be unique and the image is required
    #[instrument(skip(self, new, image), fields(zone_name = %new.zone_name))]
    pub async fn create_zone(&self, new: NewZone, image: Option<Upload>) -> ServiceResult<Zone> {
        self.tracing
            .trace_entity_operation(Zone::ENTITY, "create", async {
                new.validate()?;
                let image = image
                    .ok_or_else(|| ServiceError::validation("Zone name and image are required"))?;

                let mut stager = UploadStager::new(self.blobs.clone(), self.tracing.metrics().clone());
                let zone_image = match stager.store(&image).await {
                    Ok(blob) => blob,
                    Err(e) => {
                        stager.rollback(&self.janitor);
                        return Err(e);
                    }
                };

                let zone = Zone::new(
                    new.zone_name.trim().to_string(),
                    zone_image,
                    new.uploaded_by.trim().to_string(),
                );

                match self.store.create(zone).await {
                    Ok(zone) => {
                        crate::info_with_trace!(zone_id = %zone.id, "Zone created");
                        Ok(zone)
                    }
                    Err(e) => {
                        stager.rollback(&self.janitor);
                        Err(e.into())
                    }
                }
            })
            .await
    }

    /// Merge the supplied fields; a new image replaces the old one
    #[instrument(skip(self, patch, image), fields(id = %id))]
    pub async fn update_zone(
        &self,
        id: &str,
        patch: ZonePatch,
        image: Option<Upload>,
    ) -> ServiceResult<Zone> {
        self.tracing
            .trace_entity_operation(Zone::ENTITY, "update", async {
                validate_optional_text("zoneName", &patch.zone_name, MAX_NAME_LENGTH)?;
                validate_optional_text("uploadedBy", &patch.uploaded_by, MAX_NAME_LENGTH)?;

                let mut zone = self.get_zone(id).await?;

                let mut stager = UploadStager::new(self.blobs.clone(), self.tracing.metrics().clone());
                let mut replaced: Option<BlobRef> = None;
                if let Some(image) = &image {
                    match stager.store(image).await {
                        Ok(blob) => replaced = Some(std::mem::replace(&mut zone.zone_image, blob)),
                        Err(e) => {
                            stager.rollback(&self.janitor);
                            return Err(e);
                        }
                    }
                }

                if let Some(name) = non_blank(patch.zone_name) {
                    zone.zone_name = name;
                }
                if let Some(uploaded_by) = non_blank(patch.uploaded_by) {
                    zone.uploaded_by = uploaded_by;
                }

                let zone = match self.store.update(zone).await {
                    Ok(zone) => zone,
                    Err(e) => {
                        stager.rollback(&self.janitor);
                        return Err(match e {
                            RepositoryError::NotFound => ServiceError::not_found(Zone::ENTITY, id),
                            other => other.into(),
                        });
                    }
                };

                if let Some(old) = replaced {
                    self.janitor.schedule(vec![old], "zone image replaced");
                }
                crate::info_with_trace!(zone_id = %zone.id, "Zone updated");
                Ok(zone)
            })
            .await
    }

    #[instrument(skip(self), fields(id = %id))]
    pub async fn delete_zone(&self, id: &str) -> ServiceResult<()> {
        self.tracing
            .trace_entity_operation(Zone::ENTITY, "delete", async {
                let zone = self.get_zone(id).await?;
                if !self.store.delete(id).await? {
                    return Err(ServiceError::not_found(Zone::ENTITY, id));
                }
                self.janitor.schedule(vec![zone.zone_image], "zone delete");
                crate::info_with_trace!(zone_id = %id, "Zone deleted");
                Ok(())
            })
            .await
    }

    pub fn url_for(&self, blob: &BlobRef) -> String {
        self.blobs.url_for(blob)
    }
}
