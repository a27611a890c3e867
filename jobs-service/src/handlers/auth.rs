//! Registration and login.

use axum::{extract::State, http::StatusCode, Json};
use service_core::error::AppError;

use crate::dtos::auth::{AuthResponse, LoginRequest, RegisterRequest};
use crate::utils::ValidatedJson;
use crate::AppState;

pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let response = state.auth_service.register(req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let response = state.auth_service.login(req).await?;
    Ok(Json(response))
}
