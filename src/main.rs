use anyhow::Context;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use garagehub_rs::{
    config::StorageBackend,
    create_app, init_observability,
    observability::{Metrics, ObservabilitySettings},
    repositories::{RecordStores, TableManager},
    services::LogOtpNotifier,
    shutdown_observability,
    storage::{BlobJanitor, BlobStore, LocalBlobStore},
    AppState, Config, HttpSettings,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first (basic logging only)
    let config = Config::from_environment().context("Failed to load configuration")?;
    println!("Configuration loaded successfully");

    init_observability(&ObservabilitySettings {
        service_name: &config.observability.service_name,
        service_version: &config.observability.service_version,
        otlp_endpoint: config.observability.otlp_endpoint.as_deref(),
        log_level: &config.observability.log_level,
        json_logging: config.observability.enable_json_logging,
    })?;

    info!(
        "Starting {} v{}",
        config.observability.service_name, config.observability.service_version
    );

    let metrics = Arc::new(Metrics::new()?);
    info!("Metrics initialized successfully");

    let stores = match config.database.backend {
        StorageBackend::Memory => {
            warn!("Using the in-memory record store; data is lost on restart");
            RecordStores::in_memory()
        }
        StorageBackend::Dynamodb => {
            let client = Arc::new(config.database.dynamodb_client().await);
            info!(
                region = %config.database.region,
                table_prefix = %config.database.table_prefix,
                "Using DynamoDB record store"
            );

            if config.database.create_tables {
                TableManager::new(client.clone())
                    .create_all_tables(&config.database.table_prefix)
                    .await
                    .context("Failed to create DynamoDB tables")?;
            }

            RecordStores::dynamodb(
                client,
                &config.database.table_prefix,
                &config.database.region,
            )
        }
    }
    .metered(&metrics);
    info!("Record stores initialized successfully");

    let blobs: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(
        &config.storage.upload_dir,
        &config.storage.public_base_url,
        &config.storage.public_path,
        config.storage.max_file_size,
    ));
    tokio::fs::create_dir_all(&config.storage.upload_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create upload directory {}",
                config.storage.upload_dir.display()
            )
        })?;
    let janitor = BlobJanitor::new(blobs.clone(), metrics.clone());

    let state = AppState::new(
        stores,
        blobs,
        janitor.clone(),
        metrics.clone(),
        Arc::new(LogOtpNotifier::new(config.auth.otp_sender.clone())),
        config.auth.clone(),
        config.storage.max_file_size,
    );
    info!("Services initialized successfully");

    let app = create_app(state, metrics, HttpSettings::from(&config));

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    let listener = TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
        }
        info!("Shutdown signal received");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!(pending = janitor.pending(), "Waiting for blob cleanup to finish");
    janitor.drain().await;
    shutdown_observability().await;

    info!("Server shutdown complete");
    Ok(())
}
