use std::collections::HashSet;
use std::sync::Arc;
use tracing::instrument;

use crate::models::{
    BlobRef, Garage, GaragePatch, GarageUploads, NewGarage, Record, RepositoryError, ServiceError,
    ServiceResult, Validate,
};
use crate::observability::BusinessTracingMiddleware;
use crate::repositories::{RecordFilter, RecordStore};
use crate::services::reconcile::{assemble_garage, reconcile_update, Reconciliation, StoredBlobs};
use crate::services::UploadStager;
use crate::storage::{BlobJanitor, BlobStore};

/// Garage lifecycle: keeps the stored garage record and its image files in step.
///
/// Every write follows the same order: validate, store the uploads, reconcile,
/// persist the record, then hand now-unreferenced blobs to the janitor. When a
/// request fails after some of its uploads were stored, those uploads are
/// scheduled for deletion as well.
pub struct GarageService {
    store: Arc<dyn RecordStore<Garage>>,
    blobs: Arc<dyn BlobStore>,
    janitor: BlobJanitor,
    tracing: BusinessTracingMiddleware,
}

impl GarageService {
    pub fn new(
        store: Arc<dyn RecordStore<Garage>>,
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

    /// List every garage, newest first
    #[instrument(skip(self))]
    pub async fn list_garages(&self) -> ServiceResult<Vec<Garage>> {
        let garages = self.store.find_all(RecordFilter::all()).await?;
        crate::info_with_trace!("Found {} garages", garages.len());
        Ok(garages)
    }

    /// List the garages of one zone; an empty zone is reported as not found
    #[instrument(skip(self), fields(zone = %zone))]
    pub async fn list_garages_by_zone(&self, zone: &str) -> ServiceResult<Vec<Garage>> {
        let garages = self
            .store
            .find_all(RecordFilter::field("zone", zone.trim()))
            .await?;

        if garages.is_empty() {
            return Err(ServiceError::NoResults {
                message: "No garages found for this zone".to_string(),
            });
        }

        crate::info_with_trace!("Found {} garages in zone", garages.len());
        Ok(garages)
    }

    #[instrument(skip(self), fields(id = %id))]
    pub async fn get_garage(&self, id: &str) -> ServiceResult<Garage> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(Garage::ENTITY, id))
    }

    /// Create a garage. Service image `i` belongs to service descriptor `i`.
    #[instrument(skip(self, new, uploads), fields(services = new.services.len()))]
    pub async fn create_garage(&self, new: NewGarage, uploads: GarageUploads) -> ServiceResult<Garage> {
        self.tracing
            .trace_garage_operation("create", self.create_inner(new, uploads))
            .await
    }

    async fn create_inner(&self, mut new: NewGarage, uploads: GarageUploads) -> ServiceResult<Garage> {
        new.validate()?;
        check_service_images(uploads.service_images.len(), Some(new.services.len()))?;

        self.screen_descriptor_images(&mut new).await?;

        let mut stager = UploadStager::new(self.blobs.clone(), self.tracing.metrics().clone());
        let stored = match stage(&mut stager, &uploads).await {
            Ok(stored) => stored,
            Err(e) => {
                stager.rollback(&self.janitor);
                return Err(e);
            }
        };

        let Reconciliation { garage, orphans, .. } = assemble_garage(new, stored);

        match self.store.create(garage).await {
            Ok(garage) => {
                self.janitor.schedule(orphans, "unmatched service image");
                crate::info_with_trace!(garage_id = %garage.id, "Garage created");
                Ok(garage)
            }
            Err(e) => {
                stager.rollback(&self.janitor);
                Err(e.into())
            }
        }
    }

    /// Update a garage: merge scalars, replace the main image, append to the gallery,
    /// and replace the service list when one is supplied.
    #[instrument(skip(self, patch, uploads), fields(id = %id))]
    pub async fn update_garage(
        &self,
        id: &str,
        patch: GaragePatch,
        uploads: GarageUploads,
    ) -> ServiceResult<Garage> {
        self.tracing
            .trace_garage_operation("update", self.update_inner(id, patch, uploads))
            .await
    }

    async fn update_inner(
        &self,
        id: &str,
        mut patch: GaragePatch,
        uploads: GarageUploads,
    ) -> ServiceResult<Garage> {
        patch.validate()?;
        check_service_images(
            uploads.service_images.len(),
            patch.services.as_ref().map(Vec::len),
        )?;

        // Image association on update is positional only
        if let Some(services) = patch.services.as_mut() {
            for descriptor in services {
                descriptor.image = None;
            }
        }

        let existing = self.get_garage(id).await?;

        let mut stager = UploadStager::new(self.blobs.clone(), self.tracing.metrics().clone());
        let stored = match stage(&mut stager, &uploads).await {
            Ok(stored) => stored,
            Err(e) => {
                stager.rollback(&self.janitor);
                return Err(e);
            }
        };

        let Reconciliation {
            garage,
            orphans,
            leaked,
        } = reconcile_update(existing, patch, stored, chrono::Utc::now());

        let garage = match self.store.update(garage).await {
            Ok(garage) => garage,
            Err(e) => {
                stager.rollback(&self.janitor);
                return Err(match e {
                    RepositoryError::NotFound => ServiceError::not_found(Garage::ENTITY, id),
                    other => other.into(),
                });
            }
        };

        if !leaked.is_empty() {
            crate::warn_with_trace!(
                garage_id = %garage.id,
                leaked = ?leaked,
                "Service list shrank; images of removed positions are kept on disk"
            );
        }
        self.janitor.schedule(orphans, "garage update");

        crate::info_with_trace!(garage_id = %garage.id, "Garage updated");
        Ok(garage)
    }

    /// Delete a garage and schedule deletion of every blob it referenced
    #[instrument(skip(self), fields(id = %id))]
    pub async fn delete_garage(&self, id: &str) -> ServiceResult<()> {
        self.tracing
            .trace_garage_operation("delete", async {
                let garage = self.get_garage(id).await?;

                if !self.store.delete(id).await? {
                    return Err(ServiceError::not_found(Garage::ENTITY, id));
                }

                self.janitor.schedule(garage.blob_refs(), "garage delete");
                crate::info_with_trace!(garage_id = %id, "Garage deleted");
                Ok(())
            })
            .await
    }

    /// Keep a client-supplied descriptor image only if the blob exists and no garage,
    /// including this one at another position, already references it.
    async fn screen_descriptor_images(&self, new: &mut NewGarage) -> ServiceResult<()> {
        if new.services.iter().all(|d| d.image.is_none()) {
            return Ok(());
        }

        let mut claimed: HashSet<BlobRef> = self
            .store
            .find_all(RecordFilter::all())
            .await?
            .iter()
            .flat_map(Garage::blob_refs)
            .collect();

        for descriptor in &mut new.services {
            let Some(image) = descriptor.image.take() else {
                continue;
            };
            if claimed.contains(&image) {
                crate::warn_with_trace!(image = %image, "Ignoring reference to blob already in use");
            } else if !self.blobs.exists(&image).await {
                crate::warn_with_trace!(image = %image, "Ignoring reference to missing blob");
            } else {
                claimed.insert(image.clone());
                descriptor.image = Some(image);
            }
        }

        Ok(())
    }

    pub fn url_for(&self, blob: &BlobRef) -> String {
        self.blobs.url_for(blob)
    }
}

/// Service images are matched to descriptors by position, so there can never be more
/// images than descriptors, and none at all without a descriptor list.
fn check_service_images(images: usize, descriptors: Option<usize>) -> ServiceResult<()> {
    match descriptors {
        _ if images == 0 => Ok(()),
        None => Err(ServiceError::validation(
            "ServiceImages were uploaded without GarageServices",
        )),
        Some(count) if images > count => Err(ServiceError::validation(format!(
            "{} ServiceImages uploaded for {} GarageServices",
            images, count
        ))),
        Some(_) => Ok(()),
    }
}

async fn stage(stager: &mut UploadStager, uploads: &GarageUploads) -> ServiceResult<StoredBlobs> {
    let main_image = match &uploads.main_image {
        Some(upload) => Some(stager.store(upload).await?),
        None => None,
    };
    let gallery = stager.store_all(&uploads.gallery).await?;
    let service_images = stager.store_all(&uploads.service_images).await?;

    Ok(StoredBlobs {
        main_image,
        gallery,
        service_images,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BlobError, RepositoryResult, Service, ServiceDescriptor, Upload};
    use crate::observability::Metrics;
    use crate::repositories::InMemoryRecordStore;
    use crate::storage::LocalBlobStore;
    use async_trait::async_trait;
    use mockall::mock;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    mock! {
        TestGarageStore {}

        #[async_trait]
        impl RecordStore<Garage> for TestGarageStore {
            async fn create(&self, record: Garage) -> RepositoryResult<Garage>;
            async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Garage>>;
            async fn find_all(&self, filter: RecordFilter) -> RepositoryResult<Vec<Garage>>;
            async fn update(&self, record: Garage) -> RepositoryResult<Garage>;
            async fn delete(&self, id: &str) -> RepositoryResult<bool>;
        }
    }

    struct Fixture {
        _dir: TempDir,
        blobs: Arc<dyn BlobStore>,
        janitor: BlobJanitor,
        service: GarageService,
    }

    fn fixture_with(store: Arc<dyn RecordStore<Garage>>) -> Fixture {
        let dir = TempDir::new().unwrap();
        let blobs: Arc<dyn BlobStore> =
            Arc::new(LocalBlobStore::new(dir.path(), "", "/uploads", 1024));
        let metrics = Arc::new(Metrics::new().unwrap());
        let janitor = BlobJanitor::new(blobs.clone(), metrics.clone());
        let service = GarageService::new(
            store,
            blobs.clone(),
            janitor.clone(),
            BusinessTracingMiddleware::new(metrics),
        );
        Fixture {
            _dir: dir,
            blobs,
            janitor,
            service,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Arc::new(InMemoryRecordStore::<Garage>::new()))
    }

    fn new_garage(services: Vec<ServiceDescriptor>) -> NewGarage {
        NewGarage {
            zone: "north".into(),
            name: "Joe's".into(),
            location: "Main St".into(),
            services,
        }
    }

    fn image(field: &str) -> Upload {
        Upload::new(field, "photo.jpg", b"jpeg".to_vec())
    }

    #[tokio::test]
    async fn test_create_then_update_carries_service_image_forward() {
        let f = fixture();

        let created = f
            .service
            .create_garage(
                new_garage(vec![ServiceDescriptor::new("Oil Change", dec!(29.99))]),
                GarageUploads {
                    service_images: vec![image("ServiceImages")],
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let service_image = created.services[0].image.clone().unwrap();
        assert!(!service_image.is_empty());
        assert_eq!(created.services[0].name, "Oil Change");
        assert_eq!(created.services[0].price, dec!(29.99));

        let updated = f
            .service
            .update_garage(
                &created.id,
                GaragePatch {
                    services: Some(vec![ServiceDescriptor::new("Oil Change", dec!(34.99))]),
                    ..Default::default()
                },
                GarageUploads::default(),
            )
            .await
            .unwrap();

        assert_eq!(updated.services[0].image, Some(service_image.clone()));
        assert_eq!(updated.services[0].price, dec!(34.99));

        f.janitor.drain().await;
        assert!(f.blobs.exists(&service_image).await);
    }

    #[tokio::test]
    async fn test_update_main_image_deletes_old_file() {
        let f = fixture();
        let created = f
            .service
            .create_garage(
                new_garage(Vec::new()),
                GarageUploads {
                    main_image: Some(image("GarageMainImage")),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let old_main = created.main_image.clone().unwrap();

        let updated = f
            .service
            .update_garage(
                &created.id,
                GaragePatch::default(),
                GarageUploads {
                    main_image: Some(image("GarageMainImage")),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        f.janitor.drain().await;

        let new_main = updated.main_image.clone().unwrap();
        assert_ne!(new_main, old_main);
        assert!(!f.blobs.exists(&old_main).await);
        assert!(f.blobs.exists(&new_main).await);

        let fetched = f.service.get_garage(&created.id).await.unwrap();
        assert_eq!(fetched.main_image, Some(new_main));
    }

    #[tokio::test]
    async fn test_delete_removes_record_and_every_blob() {
        let f = fixture();
        let created = f
            .service
            .create_garage(
                new_garage(vec![ServiceDescriptor::new("Wash", dec!(10))]),
                GarageUploads {
                    main_image: Some(image("GarageMainImage")),
                    gallery: vec![image("GarageImage"), image("GarageImage")],
                    service_images: vec![image("ServiceImages")],
                },
            )
            .await
            .unwrap();
        let refs = created.blob_refs();
        assert_eq!(refs.len(), 4);

        f.service.delete_garage(&created.id).await.unwrap();
        f.janitor.drain().await;

        for blob in &refs {
            assert!(!f.blobs.exists(blob).await);
        }
        assert!(matches!(
            f.service.get_garage(&created.id).await,
            Err(ServiceError::NotFound { .. })
        ));
        assert!(matches!(
            f.service.delete_garage(&created.id).await,
            Err(ServiceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_service_images_without_descriptors_are_rejected_before_storing() {
        let f = fixture();
        let result = f
            .service
            .create_garage(
                new_garage(Vec::new()),
                GarageUploads {
                    service_images: vec![image("ServiceImages")],
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(ServiceError::ValidationError { .. })));
        assert_eq!(std::fs::read_dir(f._dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_update_missing_garage_is_not_found() {
        let f = fixture();
        let result = f
            .service
            .update_garage("G404", GaragePatch::default(), GarageUploads::default())
            .await;
        assert!(matches!(result, Err(ServiceError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_failed_create_rolls_back_uploads() {
        let mut store = MockTestGarageStore::new();
        store.expect_create().times(1).returning(|_| {
            Err(RepositoryError::AwsSdk {
                message: "throttled".into(),
            })
        });
        let f = fixture_with(Arc::new(store));

        let result = f
            .service
            .create_garage(
                new_garage(Vec::new()),
                GarageUploads {
                    main_image: Some(image("GarageMainImage")),
                    gallery: vec![image("GarageImage")],
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(ServiceError::Repository { .. })));

        f.janitor.drain().await;
        let remaining = std::fs::read_dir(f._dir.path()).unwrap().count();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn test_failed_upload_rolls_back_earlier_uploads() {
        let f = fixture();
        let result = f
            .service
            .create_garage(
                new_garage(Vec::new()),
                GarageUploads {
                    main_image: Some(image("GarageMainImage")),
                    gallery: vec![Upload::new("GarageImage", "huge.jpg", vec![0u8; 4096])],
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(
            result,
            Err(ServiceError::Storage {
                source: BlobError::TooLarge { .. }
            })
        ));
        f.janitor.drain().await;
        assert_eq!(std::fs::read_dir(f._dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_list_by_zone_reports_empty_zone() {
        let f = fixture();
        f.service
            .create_garage(new_garage(Vec::new()), GarageUploads::default())
            .await
            .unwrap();

        assert_eq!(f.service.list_garages_by_zone("north").await.unwrap().len(), 1);
        assert!(matches!(
            f.service.list_garages_by_zone("south").await,
            Err(ServiceError::NoResults { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_refuses_descriptor_image_owned_elsewhere() {
        let f = fixture();
        let first = f
            .service
            .create_garage(
                new_garage(vec![ServiceDescriptor::new("Oil Change", dec!(29.99))]),
                GarageUploads {
                    service_images: vec![image("ServiceImages")],
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let owned = first.services[0].image.clone().unwrap();

        let mut borrowed = ServiceDescriptor::new("Oil Change", dec!(25));
        borrowed.image = Some(owned.clone());
        let second = f
            .service
            .create_garage(new_garage(vec![borrowed]), GarageUploads::default())
            .await
            .unwrap();
        assert_eq!(second.services[0].image, None);

        // Replacing the image of the second garage must leave the first one's file alone
        f.service
            .update_garage(
                &second.id,
                GaragePatch {
                    services: Some(vec![ServiceDescriptor::new("Oil Change", dec!(25))]),
                    ..Default::default()
                },
                GarageUploads {
                    service_images: vec![image("ServiceImages")],
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        f.janitor.drain().await;
        assert!(f.blobs.exists(&owned).await);
    }

    #[tokio::test]
    async fn test_create_keeps_one_copy_of_repeated_descriptor_image() {
        let f = fixture();
        let existing = f.blobs.store(&image("ServiceImages")).await.unwrap();

        let mut first = ServiceDescriptor::new("Wash", dec!(10));
        first.image = Some(existing.clone());
        let mut second = ServiceDescriptor::new("Polish", dec!(15));
        second.image = Some(existing.clone());

        let created = f
            .service
            .create_garage(new_garage(vec![first, second]), GarageUploads::default())
            .await
            .unwrap();

        assert_eq!(created.services[0].image, Some(existing));
        assert_eq!(created.services[1].image, None);
    }

    #[tokio::test]
    async fn test_create_drops_dangling_descriptor_image() {
        let f = fixture();
        let mut descriptor = ServiceDescriptor::new("Wash", dec!(10));
        descriptor.image = Some("uploads/never-stored.png".into());

        let created = f
            .service
            .create_garage(new_garage(vec![descriptor]), GarageUploads::default())
            .await
            .unwrap();
        assert_eq!(
            created.services,
            vec![Service {
                name: "Wash".into(),
                price: dec!(10),
                image: None
            }]
        );
    }
}
