// Services module - business logic layer

pub mod contact_service;
pub mod garage_service;
pub mod payment_service;
pub mod reconcile;
pub mod uploads;
pub mod user_service;
pub mod zone_service;

pub use contact_service::ContactService;
pub use garage_service::GarageService;
pub use payment_service::PaymentService;
pub use uploads::UploadStager;
pub use user_service::{LogOtpNotifier, OtpNotifier, UserService};
pub use zone_service::ZoneService;

/// Trimmed value, or `None` when absent or blank
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
