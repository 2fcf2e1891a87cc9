use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};
use tracing::{error, instrument};

use super::error::{service_error_to_response, ApiError};
use super::AppState;
use crate::models::{
    CreateUserRequest, ForgotPasswordRequest, LoginRequest, ResetPasswordRequest,
    UpdateUserRequest, UserResponse,
};

#[instrument(name = "list_users", skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state
        .users
        .list_users()
        .await
        .map_err(service_error_to_response)?;
    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

#[instrument(name = "get_user", skip(state), fields(user_id = %id))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .users
        .get_user(&id)
        .await
        .map_err(service_error_to_response)?;
    Ok(Json(UserResponse::from(&user)))
}

#[instrument(name = "create_user", skip(state, request))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    match state.users.create_user(request).await {
        Ok(user) => Ok((
            StatusCode::CREATED,
            Json(json!({
                "message": "User created successfully",
                "user": UserResponse::from(&user),
            })),
        )),
        Err(err) => {
            error!("Failed to create user: {}", err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "update_user", skip(state, request), fields(user_id = %id))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<Value>, ApiError> {
    let user = state
        .users
        .update_user(&id, request)
        .await
        .map_err(service_error_to_response)?;
    Ok(Json(json!({
        "message": "User updated successfully",
        "user": UserResponse::from(&user),
    })))
}

#[instrument(name = "delete_user", skip(state), fields(user_id = %id))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .users
        .delete_user(&id)
        .await
        .map_err(service_error_to_response)?;
    Ok(Json(json!({ "message": "User deleted successfully" })))
}

#[instrument(name = "login", skip(state, request))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let user = state
        .users
        .login(request)
        .await
        .map_err(service_error_to_response)?;
    Ok(Json(json!({
        "message": "Login successful",
        "user": UserResponse::from(&user),
    })))
}

#[instrument(name = "forgot_password", skip(state, request))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    state
        .users
        .forgot_password(request)
        .await
        .map_err(service_error_to_response)?;
    Ok(Json(json!({ "message": "OTP sent successfully" })))
}

#[instrument(name = "reset_password", skip(state, request))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    state
        .users
        .reset_password(request)
        .await
        .map_err(service_error_to_response)?;
    Ok(Json(json!({ "message": "Password updated successfully" })))
}
