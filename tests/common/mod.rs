#![allow(dead_code)]

use std::sync::Arc;

use garagehub_rs::{
    config::AuthConfig,
    create_app,
    repositories::RecordStores,
    services::LogOtpNotifier,
    storage::{BlobJanitor, BlobStore, LocalBlobStore},
    AppState, HttpSettings, Metrics,
};
use reqwest::{multipart, Client};
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const MAX_FILE_SIZE: usize = 64 * 1024;

/// The full router on in-memory stores and a temporary upload directory,
/// served on an ephemeral local port.
pub struct TestEnvironment {
    pub client: Client,
    pub base_url: String,
    pub upload_dir: TempDir,
    pub janitor: BlobJanitor,
    pub blobs: Arc<dyn BlobStore>,
}

impl TestEnvironment {
    pub async fn new() -> Self {
        let upload_dir = TempDir::new().expect("Failed to create upload dir");
        let metrics = Arc::new(Metrics::new().expect("Failed to create metrics"));
        let blobs: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(
            upload_dir.path(),
            "",
            "/uploads",
            MAX_FILE_SIZE,
        ));
        let janitor = BlobJanitor::new(blobs.clone(), metrics.clone());

        let state = AppState::new(
            RecordStores::in_memory().metered(&metrics),
            blobs.clone(),
            janitor.clone(),
            metrics.clone(),
            Arc::new(LogOtpNotifier::new("test@garagehub.local")),
            AuthConfig::default(),
            MAX_FILE_SIZE,
        );
        let app = create_app(
            state,
            metrics,
            HttpSettings {
                max_request_size: 4 * MAX_FILE_SIZE,
                public_path: "/uploads".to_string(),
                upload_dir: upload_dir.path().to_path_buf(),
            },
        );

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("No local address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server failed");
        });

        Self {
            client: Client::new(),
            base_url: format!("http://{}", addr),
            upload_dir,
            janitor,
            blobs,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Files currently in the upload directory
    pub fn stored_file_count(&self) -> usize {
        std::fs::read_dir(self.upload_dir.path())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    /// Wait for scheduled blob deletions to finish
    pub async fn settle(&self) {
        self.janitor.drain().await;
    }

    pub async fn blob_exists(&self, reference: &str) -> bool {
        self.blobs.exists(&reference.into()).await
    }
}

pub fn image_part(name: &str) -> multipart::Part {
    multipart::Part::bytes(b"\x89PNG fake image bytes".to_vec())
        .file_name(name.to_string())
        .mime_str("image/png")
        .expect("valid mime")
}

pub fn garage_form(zone: &str, name: &str, services: Option<&str>) -> multipart::Form {
    let form = multipart::Form::new()
        .text("zone", zone.to_string())
        .text("GarageName", name.to_string())
        .text("GarageLocation", "12 Main St".to_string());
    match services {
        Some(services) => form.text("GarageServices", services.to_string()),
        None => form,
    }
}

pub async fn json_body(response: reqwest::Response) -> Value {
    response.json().await.expect("Failed to parse response")
}
