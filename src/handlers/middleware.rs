use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{Json, Response},
};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, warn};

const ACCEPTED_CONTENT_TYPES: [&str; 2] = ["application/json", "multipart/form-data"];

/// Request validation middleware: body-carrying requests must be JSON or
/// multipart, and must not declare more than `max_request_size` bytes.
pub async fn request_validation_middleware(
    max_request_size: usize,
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<Value>)> {
    validate_content_type(&request)?;
    validate_request_size(&request, max_request_size)?;

    Ok(next.run(request).await)
}

/// Validate content type for requests with body
fn validate_content_type(request: &Request<Body>) -> Result<(), (StatusCode, Json<Value>)> {
    let method = request.method();
    if method != Method::POST && method != Method::PUT && method != Method::PATCH {
        return Ok(());
    }

    match request.headers().get(header::CONTENT_TYPE) {
        Some(content_type) => {
            let content_type_str = content_type.to_str().unwrap_or("");
            if ACCEPTED_CONTENT_TYPES
                .iter()
                .any(|accepted| content_type_str.starts_with(accepted))
            {
                Ok(())
            } else {
                warn!("Invalid content type: {}", content_type_str);
                Err((
                    StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    Json(json!({
                        "error": "Unsupported media type",
                        "message": "Content-Type must be application/json or multipart/form-data",
                        "timestamp": chrono::Utc::now().to_rfc3339(),
                    })),
                ))
            }
        }
        None => {
            warn!("Missing content type header");
            Err((
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Missing content type",
                    "message": "Content-Type header is required for requests with body",
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                })),
            ))
        }
    }
}

/// Reject requests whose declared length exceeds the configured maximum
fn validate_request_size(
    request: &Request<Body>,
    max_request_size: usize,
) -> Result<(), (StatusCode, Json<Value>)> {
    let declared = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());

    if let Some(length) = declared {
        if length > max_request_size as u64 {
            error!("Request too large: {} bytes", length);
            return Err((
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(json!({
                    "error": "Request too large",
                    "message": format!("Request size {} bytes exceeds maximum of {} bytes", length, max_request_size),
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                })),
            ));
        }
    }

    Ok(())
}

/// Any origin; the methods and headers the API uses
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(std::time::Duration::from_secs(86400))
}

/// Security headers middleware
pub async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    response
}
