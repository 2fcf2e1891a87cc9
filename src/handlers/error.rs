use axum::{http::StatusCode, response::Json};
use serde_json::{json, Value};

use crate::models::{BlobError, RepositoryError, ServiceError};

/// Error half of every handler result
pub type ApiError = (StatusCode, Json<Value>);

pub fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(json!({
            "error": message.into(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}

/// Convert ServiceError to HTTP response
pub fn service_error_to_response(err: ServiceError) -> ApiError {
    let (status, message) = match err {
        ServiceError::NotFound { .. } | ServiceError::NoResults { .. } => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        ServiceError::ValidationError { .. } | ServiceError::InvalidCredentials => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        ServiceError::Repository {
            source: RepositoryError::ConstraintViolation { ref message },
        } => (StatusCode::BAD_REQUEST, message.clone()),
        ServiceError::Repository {
            source: RepositoryError::NotFound,
        } => (StatusCode::NOT_FOUND, "Resource not found".to_string()),
        ServiceError::Storage {
            source: BlobError::TooLarge { .. },
        } => (StatusCode::PAYLOAD_TOO_LARGE, err.to_string()),
        ServiceError::ExternalService { ref message, .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, message.clone())
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    };

    error_response(status, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ServiceError) -> StatusCode {
        service_error_to_response(err).0
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_of(ServiceError::not_found("Garage", "G1")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ServiceError::NoResults {
                message: "No garages found for this zone".into()
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ServiceError::validation("bad")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ServiceError::InvalidCredentials),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(
                RepositoryError::ConstraintViolation {
                    message: "Zone with zoneName 'North' already exists".into()
                }
                .into()
            ),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(RepositoryError::Timeout.into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_body_carries_message_and_timestamp() {
        let (_, Json(body)) = service_error_to_response(ServiceError::ExternalService {
            service: "otp-notifier".into(),
            message: "Failed to send OTP".into(),
        });
        assert_eq!(body["error"], "Failed to send OTP");
        assert!(body["timestamp"].is_string());
    }
}
