use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Message returned for every 5xx response. Causes are logged, never sent.
pub const INTERNAL_ERROR_MESSAGE: &str = "Something went wrong, try again later";

/// Message shared by every token/authentication failure.
pub const UNAUTHENTICATED_MESSAGE: &str = "Authentication invalid";

/// A single field-level validation failure.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation failed: {0:?}")]
    ValidationError(Vec<FieldError>),

    #[error("Duplicate identity: {0}")]
    DuplicateIdentity(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("Invalid token: {0}")]
    InvalidToken(jsonwebtoken::errors::Error),

    #[error("Token expired")]
    ExpiredToken,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Route does not exist")]
    RouteNotFound,

    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Too many requests: {0}")]
    RateLimited(String, Option<u64>),

    #[error("Database error: {0}")]
    DatabaseError(anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for a validation failure on a single field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::ValidationError(vec![FieldError::new(field, message)])
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::DuplicateIdentity(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::InvalidCredentials
            | AppError::Unauthenticated
            | AppError::InvalidToken(_)
            | AppError::ExpiredToken => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) | AppError::RouteNotFound => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::RateLimited(..) => StatusCode::TOO_MANY_REQUESTS,
            AppError::DatabaseError(_) | AppError::ConfigError(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = field.to_string();
                errs.iter().map(move |err| {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", err.code));
                    FieldError::new(field.clone(), message)
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        AppError::ValidationError(fields)
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
            _ => AppError::InvalidToken(err),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        AppError::DatabaseError(anyhow::Error::new(err))
    }
}

/// Uniform error body: `{ "message": ..., "errors": [...] }`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let (message, errors, retry_after) = match self {
            AppError::ValidationError(fields) => {
                ("Validation failed".to_string(), Some(fields), None)
            }
            AppError::DuplicateIdentity(msg) | AppError::NotFound(msg) => (msg, None, None),
            AppError::InvalidCredentials => ("Invalid credentials".to_string(), None, None),
            AppError::Unauthenticated | AppError::InvalidToken(_) | AppError::ExpiredToken => {
                (UNAUTHENTICATED_MESSAGE.to_string(), None, None)
            }
            AppError::RouteNotFound => ("Route does not exist".to_string(), None, None),
            AppError::PayloadTooLarge(_) => ("Request body too large".to_string(), None, None),
            AppError::RateLimited(msg, retry) => (msg, None, retry),
            AppError::DatabaseError(err)
            | AppError::ConfigError(err)
            | AppError::InternalError(err) => {
                tracing::error!(error = ?err, "Request failed with internal error");
                (INTERNAL_ERROR_MESSAGE.to_string(), None, None)
            }
        };

        let mut res = (status, Json(ErrorResponse { message, errors })).into_response();

        if let Some(retry) = retry_after {
            res.headers_mut()
                .insert(axum::http::header::RETRY_AFTER, retry.into());
        }

        res
    }
}
