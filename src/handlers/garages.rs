use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};
use tracing::{error, info, instrument};

use super::error::{service_error_to_response, ApiError};
use super::multipart::MultipartForm;
use super::AppState;
use crate::models::{GaragePatch, GarageResponse, GarageUploads, NewGarage, ServiceDescriptor};

pub const MAX_MAIN_IMAGES: usize = 1;
pub const MAX_GALLERY_IMAGES: usize = 10;
pub const MAX_SERVICE_IMAGES: usize = 20;

#[instrument(name = "list_garages", skip(state))]
pub async fn list_garages(
    State(state): State<AppState>,
) -> Result<Json<Vec<GarageResponse>>, ApiError> {
    match state.garages.list_garages().await {
        Ok(garages) => Ok(Json(
            garages
                .iter()
                .map(|g| g.to_response(|b| state.garages.url_for(b)))
                .collect(),
        )),
        Err(err) => {
            error!("Failed to list garages: {}", err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "list_garages_by_zone", skip(state), fields(zone = %zone))]
pub async fn list_garages_by_zone(
    State(state): State<AppState>,
    Path(zone): Path<String>,
) -> Result<Json<Vec<GarageResponse>>, ApiError> {
    let garages = state
        .garages
        .list_garages_by_zone(&zone)
        .await
        .map_err(service_error_to_response)?;

    Ok(Json(
        garages
            .iter()
            .map(|g| g.to_response(|b| state.garages.url_for(b)))
            .collect(),
    ))
}

#[instrument(name = "get_garage", skip(state), fields(garage_id = %id))]
pub async fn get_garage(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<GarageResponse>, ApiError> {
    let garage = state
        .garages
        .get_garage(&id)
        .await
        .map_err(service_error_to_response)?;
    Ok(Json(garage.to_response(|b| state.garages.url_for(b))))
}

/// Create a garage from a multipart form
#[instrument(name = "create_garage", skip(state, multipart))]
pub async fn create_garage(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<GarageResponse>), ApiError> {
    let mut form = MultipartForm::read(multipart, state.max_file_size).await?;
    let uploads = take_uploads(&mut form)?;

    let services = ServiceDescriptor::parse_list(form.text(&["GarageServices"]).as_deref())
        .map_err(|e| service_error_to_response(e.into()))?;
    let new = NewGarage {
        zone: form.text(&["zone"]).unwrap_or_default(),
        name: form.text(&["GarageName", "name"]).unwrap_or_default(),
        location: form.text(&["GarageLocation", "location"]).unwrap_or_default(),
        services,
    };

    match state.garages.create_garage(new, uploads).await {
        Ok(garage) => {
            crate::info_with_trace!(garage_id = %garage.id, "Garage created via API");
            Ok((
                StatusCode::CREATED,
                Json(garage.to_response(|b| state.garages.url_for(b))),
            ))
        }
        Err(err) => {
            error!("Failed to create garage: {}", err);
            Err(service_error_to_response(err))
        }
    }
}

/// Update a garage from a multipart form; absent fields keep their stored values
#[instrument(name = "update_garage", skip(state, multipart), fields(garage_id = %id))]
pub async fn update_garage(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<GarageResponse>, ApiError> {
    let mut form = MultipartForm::read(multipart, state.max_file_size).await?;
    let uploads = take_uploads(&mut form)?;

    let services = match form
        .text(&["GarageServices"])
        .filter(|raw| !raw.trim().is_empty())
    {
        Some(raw) => Some(
            ServiceDescriptor::parse_list(Some(&raw))
                .map_err(|e| service_error_to_response(e.into()))?,
        ),
        None => None,
    };
    let patch = GaragePatch {
        zone: form.text(&["zone"]),
        name: form.text(&["GarageName", "name"]),
        location: form.text(&["GarageLocation", "location"]),
        services,
    };

    match state.garages.update_garage(&id, patch, uploads).await {
        Ok(garage) => {
            info!("Garage {} updated", garage.id);
            Ok(Json(garage.to_response(|b| state.garages.url_for(b))))
        }
        Err(err) => {
            error!("Failed to update garage {}: {}", id, err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "delete_garage", skip(state), fields(garage_id = %id))]
pub async fn delete_garage(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .garages
        .delete_garage(&id)
        .await
        .map_err(service_error_to_response)?;
    Ok(Json(json!({ "message": "Garage deleted successfully" })))
}

fn take_uploads(form: &mut MultipartForm) -> Result<GarageUploads, ApiError> {
    let main_image = form
        .take_files("GarageMainImage", MAX_MAIN_IMAGES)?
        .pop();
    let gallery = form.take_files("GarageImage", MAX_GALLERY_IMAGES)?;
    let service_images = form.take_files("ServiceImages", MAX_SERVICE_IMAGES)?;
    form.reject_unexpected_files()?;

    Ok(GarageUploads {
        main_image,
        gallery,
        service_images,
    })
}
