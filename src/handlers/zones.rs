use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};
use tracing::{error, instrument};

use super::error::{service_error_to_response, ApiError};
use super::multipart::MultipartForm;
use super::AppState;
use crate::models::{NewZone, ZonePatch, ZoneResponse};

#[instrument(name = "list_zones", skip(state))]
pub async fn list_zones(State(state): State<AppState>) -> Result<Json<Vec<ZoneResponse>>, ApiError> {
    let zones = state
        .zones
        .list_zones()
        .await
        .map_err(service_error_to_response)?;
    Ok(Json(
        zones
            .iter()
            .map(|z| z.to_response(|b| state.zones.url_for(b)))
            .collect(),
    ))
}

#[instrument(name = "get_zone", skip(state), fields(zone_id = %id))]
pub async fn get_zone(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ZoneResponse>, ApiError> {
    let zone = state
        .zones
        .get_zone(&id)
        .await
        .map_err(service_error_to_response)?;
    Ok(Json(zone.to_response(|b| state.zones.url_for(b))))
}

#[instrument(name = "create_zone", skip(state, multipart))]
pub async fn create_zone(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ZoneResponse>), ApiError> {
    let mut form = MultipartForm::read(multipart, state.max_file_size).await?;
    let image = form.take_file("zoneImage")?;
    form.reject_unexpected_files()?;

    let new = NewZone {
        zone_name: form.text(&["zoneName"]).unwrap_or_default(),
        uploaded_by: form.text(&["uploadedBy"]).unwrap_or_default(),
    };

    match state.zones.create_zone(new, image).await {
        Ok(zone) => Ok((
            StatusCode::CREATED,
            Json(zone.to_response(|b| state.zones.url_for(b))),
        )),
        Err(err) => {
            error!("Failed to create zone: {}", err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "update_zone", skip(state, multipart), fields(zone_id = %id))]
pub async fn update_zone(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<ZoneResponse>, ApiError> {
    let mut form = MultipartForm::read(multipart, state.max_file_size).await?;
    let image = form.take_file("zoneImage")?;
    form.reject_unexpected_files()?;

    let patch = ZonePatch {
        zone_name: form.text(&["zoneName"]),
        uploaded_by: form.text(&["uploadedBy"]),
    };

    let zone = state
        .zones
        .update_zone(&id, patch, image)
        .await
        .map_err(service_error_to_response)?;
    Ok(Json(zone.to_response(|b| state.zones.url_for(b))))
}

#[instrument(name = "delete_zone", skip(state), fields(zone_id = %id))]
pub async fn delete_zone(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .zones
        .delete_zone(&id)
        .await
        .map_err(service_error_to_response)?;
    Ok(Json(json!({ "message": "Zone deleted successfully" })))
}
