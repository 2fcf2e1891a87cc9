use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

use garagehub_rs::models::{BlobRef, Garage, GaragePatch, Service, ServiceDescriptor};
use garagehub_rs::observability::{BusinessTracingMiddleware, Metrics};
use garagehub_rs::repositories::{InMemoryRecordStore, RecordStore};
use garagehub_rs::services::reconcile::{reconcile_services, reconcile_update, StoredBlobs};
use garagehub_rs::services::GarageService;
use garagehub_rs::storage::{BlobJanitor, BlobStore, LocalBlobStore};
use rust_decimal_macros::dec;

fn old_services(size: usize) -> Vec<Service> {
    (0..size)
        .map(|i| Service {
            name: format!("Service {}", i),
            price: dec!(49.99),
            image: Some(BlobRef::new(format!("uploads/ServiceImages-{}.png", i))),
        })
        .collect()
}

fn descriptors(size: usize) -> Vec<ServiceDescriptor> {
    (0..size)
        .map(|i| ServiceDescriptor::new(format!("Service {}", i), dec!(59.99)))
        .collect()
}

fn uploads(size: usize) -> Vec<BlobRef> {
    (0..size)
        .map(|i| BlobRef::new(format!("uploads/ServiceImages-new-{}.png", i)))
        .collect()
}

fn bench_reconcile_services(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_services");

    for size in [5, 20, 100].iter() {
        let old = old_services(*size);

        group.bench_with_input(BenchmarkId::new("price_only", size), size, |b, &size| {
            b.iter(|| {
                black_box(reconcile_services(
                    black_box(&old),
                    descriptors(size),
                    Vec::new(),
                ))
            })
        });

        group.bench_with_input(BenchmarkId::new("half_replaced", size), size, |b, &size| {
            b.iter(|| {
                black_box(reconcile_services(
                    black_box(&old),
                    descriptors(size),
                    uploads(size / 2),
                ))
            })
        });

        group.bench_with_input(BenchmarkId::new("shrink", size), size, |b, &size| {
            b.iter(|| {
                black_box(reconcile_services(
                    black_box(&old),
                    descriptors(size / 2),
                    Vec::new(),
                ))
            })
        });
    }

    group.finish();
}

fn bench_reconcile_update(c: &mut Criterion) {
    let mut garage = Garage::new(
        "north".to_string(),
        "Benchmark Garage".to_string(),
        "1 Bench Rd".to_string(),
    );
    garage.main_image = Some(BlobRef::new("uploads/GarageMainImage-bench.png"));
    garage.gallery_images = (0..10)
        .map(|i| BlobRef::new(format!("uploads/GarageImage-{}.png", i)))
        .collect();
    garage.services = old_services(20);

    c.bench_function("reconcile_update_full_patch", |b| {
        b.iter(|| {
            let patch = GaragePatch {
                name: Some("Renamed Garage".to_string()),
                services: Some(descriptors(20)),
                ..Default::default()
            };
            let stored = StoredBlobs {
                main_image: Some(BlobRef::new("uploads/GarageMainImage-new.png")),
                gallery: uploads(2),
                service_images: uploads(5),
            };
            black_box(reconcile_update(
                garage.clone(),
                patch,
                stored,
                chrono::Utc::now(),
            ))
        })
    });
}

fn bench_list_by_zone(c: &mut Criterion) {
    let rt = Runtime::new().expect("Failed to create runtime");
    let mut group = c.benchmark_group("list_garages_by_zone");
    group.measurement_time(Duration::from_secs(5));

    for size in [100, 1000].iter() {
        let store = Arc::new(InMemoryRecordStore::<Garage>::new());
        rt.block_on(async {
            for i in 0..*size {
                let mut garage = Garage::new(
                    format!("zone-{}", i % 10),
                    format!("Garage {}", i),
                    format!("{} Bench Rd", i),
                );
                garage.services = old_services(3);
                store.create(garage).await.expect("Failed to seed garage");
            }
        });

        let metrics = Arc::new(Metrics::new().expect("Failed to create metrics"));
        let blobs: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(
            std::env::temp_dir(),
            "",
            "/uploads",
            1024,
        ));
        let service = GarageService::new(
            store,
            blobs.clone(),
            BlobJanitor::new(blobs, metrics.clone()),
            BusinessTracingMiddleware::new(metrics),
        );

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                rt.block_on(async {
                    black_box(
                        service
                            .list_garages_by_zone(black_box("zone-3"))
                            .await
                            .expect("zone has garages"),
                    )
                })
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_reconcile_services,
    bench_reconcile_update,
    bench_list_by_zone
);
criterion_main!(benches);
