use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Json,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::{error, instrument};

use super::error::{error_response, service_error_to_response, ApiError};
use super::multipart::MultipartForm;
use super::AppState;
use crate::models::{PaymentFields, PaymentResponse};

#[instrument(name = "list_payments", skip(state))]
pub async fn list_payments(
    State(state): State<AppState>,
) -> Result<Json<Vec<PaymentResponse>>, ApiError> {
    let payments = state
        .payments
        .list_payments()
        .await
        .map_err(service_error_to_response)?;
    Ok(Json(
        payments
            .iter()
            .map(|p| p.to_response(|b| state.payments.url_for(b)))
            .collect(),
    ))
}

#[instrument(name = "list_payments_by_email", skip(state), fields(email = %email))]
pub async fn list_payments_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Vec<PaymentResponse>>, ApiError> {
    let payments = state
        .payments
        .list_payments_by_email(&email)
        .await
        .map_err(service_error_to_response)?;
    Ok(Json(
        payments
            .iter()
            .map(|p| p.to_response(|b| state.payments.url_for(b)))
            .collect(),
    ))
}

#[instrument(name = "get_payment", skip(state), fields(payment_id = %id))]
pub async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let payment = state
        .payments
        .get_payment(&id)
        .await
        .map_err(service_error_to_response)?;
    Ok(Json(payment.to_response(|b| state.payments.url_for(b))))
}

#[instrument(name = "create_payment", skip(state, multipart))]
pub async fn create_payment(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<PaymentResponse>), ApiError> {
    let mut form = MultipartForm::read(multipart, state.max_file_size).await?;
    let qr_code_image = form.take_file("qrCodeImage")?;
    form.reject_unexpected_files()?;
    let fields = payment_fields(&form)?;

    match state.payments.create_payment(fields, qr_code_image).await {
        Ok(payment) => Ok((
            StatusCode::CREATED,
            Json(payment.to_response(|b| state.payments.url_for(b))),
        )),
        Err(err) => {
            error!("Failed to create payment: {}", err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "update_payment", skip(state, multipart), fields(payment_id = %id))]
pub async fn update_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<PaymentResponse>, ApiError> {
    let mut form = MultipartForm::read(multipart, state.max_file_size).await?;
    let qr_code_image = form.take_file("qrCodeImage")?;
    form.reject_unexpected_files()?;
    let fields = payment_fields(&form)?;

    let payment = state
        .payments
        .update_payment(&id, fields, qr_code_image)
        .await
        .map_err(service_error_to_response)?;
    Ok(Json(payment.to_response(|b| state.payments.url_for(b))))
}

#[instrument(name = "delete_payment", skip(state), fields(payment_id = %id))]
pub async fn delete_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .payments
        .delete_payment(&id)
        .await
        .map_err(service_error_to_response)?;
    Ok(Json(json!({ "message": "Payment deleted successfully" })))
}

fn payment_fields(form: &MultipartForm) -> Result<PaymentFields, ApiError> {
    let price = match form.text(&["price"]).filter(|p| !p.trim().is_empty()) {
        Some(raw) => Some(raw.trim().parse::<Decimal>().map_err(|_| {
            error_response(
                StatusCode::BAD_REQUEST,
                format!("Invalid price: {}", raw),
            )
        })?),
        None => None,
    };

    Ok(PaymentFields {
        name: form.text(&["name"]),
        email: form.text(&["email"]),
        car_model: form.text(&["carModel"]),
        garage: form.text(&["garage"]),
        garage_id: form.text(&["garageId"]),
        service: form.text(&["service"]),
        price,
        transaction_id: form.text(&["transactionId"]),
        status: form.text(&["status"]),
    })
}
