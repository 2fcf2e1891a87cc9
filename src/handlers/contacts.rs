use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};
use tracing::instrument;

use super::error::{service_error_to_response, ApiError};
use super::AppState;
use crate::models::{Contact, ContactRequest};

#[instrument(name = "list_contacts", skip(state))]
pub async fn list_contacts(State(state): State<AppState>) -> Result<Json<Vec<Contact>>, ApiError> {
    state
        .contacts
        .list_contacts()
        .await
        .map(Json)
        .map_err(service_error_to_response)
}

#[instrument(name = "get_contact", skip(state), fields(contact_id = %id))]
pub async fn get_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Contact>, ApiError> {
    state
        .contacts
        .get_contact(&id)
        .await
        .map(Json)
        .map_err(service_error_to_response)
}

#[instrument(name = "create_contact", skip(state, request))]
pub async fn create_contact(
    State(state): State<AppState>,
    Json(request): Json<ContactRequest>,
) -> Result<(StatusCode, Json<Contact>), ApiError> {
    let contact = state
        .contacts
        .create_contact(request)
        .await
        .map_err(service_error_to_response)?;
    Ok((StatusCode::CREATED, Json(contact)))
}

#[instrument(name = "update_contact", skip(state, request), fields(contact_id = %id))]
pub async fn update_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ContactRequest>,
) -> Result<Json<Contact>, ApiError> {
    state
        .contacts
        .update_contact(&id, request)
        .await
        .map(Json)
        .map_err(service_error_to_response)
}

#[instrument(name = "delete_contact", skip(state), fields(contact_id = %id))]
pub async fn delete_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .contacts
        .delete_contact(&id)
        .await
        .map_err(service_error_to_response)?;
    Ok(Json(json!({ "message": "Contact entry deleted successfully" })))
}
