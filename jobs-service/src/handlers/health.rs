use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use service_core::error::AppError;

use crate::AppState;

/// Liveness plus a store ping.
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let store = match state.store.health_check().await {
        Ok(()) => "up",
        Err(e) => {
            tracing::error!(error = %e, "Store health check failed");
            "down"
        }
    };

    let status = if store == "up" { "healthy" } else { "unhealthy" };
    let body = json!({
        "status": status,
        "service": state.config.service_name,
        "version": env!("CARGO_PKG_VERSION"),
        "checks": { "store": store },
    });

    if store == "up" {
        Ok(Json(body))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(body)))
    }
}

/// Readiness: 200 once the store answers.
pub async fn readiness_check(State(state): State<AppState>) -> Result<StatusCode, StatusCode> {
    state
        .store
        .health_check()
        .await
        .map(|()| StatusCode::OK)
        .map_err(|e| {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        })
}

/// Fallback for unknown routes.
pub async fn not_found() -> AppError {
    AppError::RouteNotFound
}
