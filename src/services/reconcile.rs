//! Garage reconciliation.
//!
//! Pure functions that turn the stored garage plus an incoming request (whose
//! uploads have already been written to the blob store) into the next garage
//! state and the list of blob references that state no longer needs. No I/O
//! happens here; callers persist the record and only then schedule deletion of
//! the orphans.
//!
//! Service images are correlated with service descriptors by position only.
//! Reordering services between requests therefore moves images between
//! services as seen by the client.

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::models::{BlobRef, Garage, GaragePatch, NewGarage, Service, ServiceDescriptor};

/// References of blobs already written for one request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredBlobs {
    pub main_image: Option<BlobRef>,
    pub gallery: Vec<BlobRef>,
    /// Positionally correlated with the request's service descriptors
    pub service_images: Vec<BlobRef>,
}

impl StoredBlobs {
    pub fn is_empty(&self) -> bool {
        self.main_image.is_none() && self.gallery.is_empty() && self.service_images.is_empty()
    }

    /// Every reference, for rolling back a failed request
    pub fn into_all(self) -> Vec<BlobRef> {
        self.main_image
            .into_iter()
            .chain(self.gallery)
            .chain(self.service_images)
            .collect()
    }
}

/// Outcome of reconciling a service list
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceReconciliation {
    pub services: Vec<Service>,
    /// Blobs replaced by a new upload at the same position; safe to delete after commit
    pub orphans: Vec<BlobRef>,
    /// Images of old positions past the end of a shorter new list. They drop out of the
    /// record but are kept on disk.
    pub leaked: Vec<BlobRef>,
}

/// Outcome of reconciling a whole garage
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub garage: Garage,
    pub orphans: Vec<BlobRef>,
    pub leaked: Vec<BlobRef>,
}

/// Zip descriptors with uploaded images by index against the old service list.
///
/// For position `i` the image is, in order of preference: the `i`-th uploaded
/// image (the old image at `i` becomes an orphan), the old image at `i`, or the
/// image the descriptor already carried. Uploads with no descriptor are orphans.
pub fn reconcile_services(
    old: &[Service],
    descriptors: Vec<ServiceDescriptor>,
    uploaded: Vec<BlobRef>,
) -> ServiceReconciliation {
    let new_len = descriptors.len();
    let mut orphans = Vec::new();
    let mut uploaded = uploaded.into_iter();

    let services = descriptors
        .into_iter()
        .enumerate()
        .map(|(i, descriptor)| {
            let old_image = old.get(i).and_then(|service| service.image.clone());
            let image = match uploaded.next() {
                Some(new_image) => {
                    orphans.extend(old_image);
                    Some(new_image)
                }
                None => old_image.or(descriptor.image),
            };

            Service {
                name: descriptor.name,
                price: descriptor.price,
                image,
            }
        })
        .collect();

    orphans.extend(uploaded);

    let leaked = old
        .iter()
        .skip(new_len)
        .filter_map(|service| service.image.clone())
        .collect();

    ServiceReconciliation {
        services,
        orphans,
        leaked,
    }
}

/// Assemble a brand-new garage from validated fields and the blobs stored for it
pub fn assemble_garage(new: NewGarage, stored: StoredBlobs) -> Reconciliation {
    let services = reconcile_services(&[], new.services, stored.service_images);

    let mut garage = Garage::new(
        new.zone.trim().to_string(),
        new.name.trim().to_string(),
        new.location.trim().to_string(),
    );
    garage.main_image = stored.main_image;
    garage.gallery_images = stored.gallery;
    garage.services = services.services;

    Reconciliation {
        garage,
        orphans: services.orphans,
        leaked: services.leaked,
    }
}

/// Apply a patch and freshly stored blobs to an existing garage.
///
/// Scalars merge (blank keeps the stored value), a new main image replaces the
/// old one, gallery uploads append, and a supplied service list replaces the old
/// list wholesale. Without a service list the services are untouched.
pub fn reconcile_update(
    existing: Garage,
    patch: GaragePatch,
    stored: StoredBlobs,
    now: DateTime<Utc>,
) -> Reconciliation {
    let mut garage = existing;
    let mut orphans = Vec::new();
    let mut leaked = Vec::new();

    merge_field(&mut garage.zone, patch.zone);
    merge_field(&mut garage.name, patch.name);
    merge_field(&mut garage.location, patch.location);

    if let Some(new_main) = stored.main_image {
        if let Some(old_main) = garage.main_image.replace(new_main) {
            orphans.push(old_main);
        }
    }

    garage.gallery_images.extend(stored.gallery);

    match patch.services {
        Some(descriptors) => {
            let services = reconcile_services(&garage.services, descriptors, stored.service_images);
            garage.services = services.services;
            orphans.extend(services.orphans);
            leaked.extend(services.leaked);
        }
        None => orphans.extend(stored.service_images),
    }

    // A blob still referenced anywhere in the new garage is never cleaned up
    let referenced: HashSet<BlobRef> = garage.blob_refs().into_iter().collect();
    orphans.retain(|blob| !referenced.contains(blob));
    leaked.retain(|blob| !referenced.contains(blob));

    garage.updated_at = now;

    Reconciliation {
        garage,
        orphans,
        leaked,
    }
}

fn merge_field(target: &mut String, value: Option<String>) {
    if let Some(value) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        *target = value;
    }
}
