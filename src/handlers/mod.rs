pub mod contacts;
pub mod error;
pub mod garages;
pub mod health;
pub mod metrics;
pub mod middleware;
pub mod multipart;
pub mod payments;
pub mod users;
pub mod zones;

pub use error::{service_error_to_response, ApiError};
pub use health::*;
pub use metrics::*;
pub use middleware::*;
pub use multipart::MultipartForm;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::config::{AuthConfig, Config};
use crate::observability::{observability_middleware, BusinessTracingMiddleware, Metrics};
use crate::repositories::RecordStores;
use crate::services::{
    ContactService, GarageService, OtpNotifier, PaymentService, UserService, ZoneService,
};
use crate::storage::{BlobJanitor, BlobStore};

/// Shared application state containing all services
#[derive(Clone)]
pub struct AppState {
    pub garages: Arc<GarageService>,
    pub zones: Arc<ZoneService>,
    pub payments: Arc<PaymentService>,
    pub users: Arc<UserService>,
    pub contacts: Arc<ContactService>,
    pub max_file_size: usize,
}

impl AppState {
    /// Wire every service onto the given stores. Blob cleanup goes through `janitor`.
    pub fn new(
        stores: RecordStores,
        blobs: Arc<dyn BlobStore>,
        janitor: BlobJanitor,
        metrics: Arc<Metrics>,
        notifier: Arc<dyn OtpNotifier>,
        auth: AuthConfig,
        max_file_size: usize,
    ) -> Self {
        let tracing = BusinessTracingMiddleware::new(metrics);
        Self {
            garages: Arc::new(GarageService::new(
                stores.garages,
                blobs.clone(),
                janitor.clone(),
                tracing.clone(),
            )),
            zones: Arc::new(ZoneService::new(
                stores.zones,
                blobs.clone(),
                janitor.clone(),
                tracing.clone(),
            )),
            payments: Arc::new(PaymentService::new(
                stores.payments,
                blobs,
                janitor,
                tracing.clone(),
            )),
            users: Arc::new(UserService::new(
                stores.users,
                notifier,
                auth,
                tracing.clone(),
            )),
            contacts: Arc::new(ContactService::new(stores.contacts, tracing)),
            max_file_size,
        }
    }
}

/// HTTP-level settings the router needs
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub max_request_size: usize,
    pub public_path: String,
    pub upload_dir: PathBuf,
}

impl From<&Config> for HttpSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_request_size: config.server.max_request_size,
            public_path: config.storage.public_path.clone(),
            upload_dir: config.storage.upload_dir.clone(),
        }
    }
}

/// Build the application router
pub fn create_app(state: AppState, metrics: Arc<Metrics>, settings: HttpSettings) -> Router {
    let metrics_for_middleware = metrics.clone();
    let max_request_size = settings.max_request_size;
    let public_path = format!("/{}", settings.public_path.trim_matches('/'));

    let operational = Router::new()
        .route("/health/status", get(health_check))
        .route("/metrics", get(metrics_handler))
        .with_state(metrics);

    let api = Router::new()
        .route(
            "/api/garages",
            get(garages::list_garages).post(garages::create_garage),
        )
        .route("/api/garages/zone/:zone", get(garages::list_garages_by_zone))
        .route(
            "/api/garages/:id",
            get(garages::get_garage)
                .put(garages::update_garage)
                .delete(garages::delete_garage),
        )
        .route("/api/zones", get(zones::list_zones).post(zones::create_zone))
        .route(
            "/api/zones/:id",
            get(zones::get_zone)
                .put(zones::update_zone)
                .delete(zones::delete_zone),
        )
        .nest("/api/payments", payment_routes())
        .nest("/api/payment", payment_routes())
        .route("/api/users", get(users::list_users).post(users::create_user))
        .route("/api/users/login", post(users::login))
        .route("/api/users/forgot-password", post(users::forgot_password))
        .route("/api/users/reset-password", post(users::reset_password))
        .route(
            "/api/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route(
            "/api/contacts",
            get(contacts::list_contacts).post(contacts::create_contact),
        )
        .route(
            "/api/contacts/:id",
            get(contacts::get_contact)
                .put(contacts::update_contact)
                .delete(contacts::delete_contact),
        )
        .with_state(state);

    Router::new()
        .merge(operational)
        .merge(api)
        .nest_service(&public_path, ServeDir::new(&settings.upload_dir))
        // Add middleware layers (order matters - outer to inner)
        .layer(DefaultBodyLimit::max(max_request_size))
        .layer(axum_middleware::from_fn(move |req, next| {
            request_validation_middleware(max_request_size, req, next)
        }))
        .layer(axum_middleware::from_fn(security_headers_middleware))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .layer(axum_middleware::from_fn(move |req, next| {
            observability_middleware(metrics_for_middleware.clone(), req, next)
        }))
}

fn payment_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(payments::list_payments).post(payments::create_payment),
        )
        .route("/email/:email", get(payments::list_payments_by_email))
        .route(
            "/:id",
            get(payments::get_payment)
                .put(payments::update_payment)
                .delete(payments::delete_payment),
        )
}
