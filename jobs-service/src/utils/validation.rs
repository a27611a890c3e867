use axum::{
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use service_core::error::AppError;
use validator::Validate;

/// JSON body that has been decoded and passed its `validator` rules.
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::validation("body", e.body_text()))?;

        value.validate()?;

        Ok(ValidatedJson(value))
    }
}

/// Query string counterpart of [`ValidatedJson`].
pub struct ValidatedQuery<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::validation("query", e.body_text()))?;

        value.validate()?;

        Ok(ValidatedQuery(value))
    }
}

/// Path parameters whose rejections render like every other `AppError`.
pub struct ValidatedPath<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for ValidatedPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::validation("path", e.body_text()))?;

        Ok(ValidatedPath(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, response::IntoResponse, routing::get, Router};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn echo_id(ValidatedPath(id): ValidatedPath<String>) -> String {
        id
    }

    async fn send(uri: &str) -> (StatusCode, Vec<u8>) {
        let app = Router::new().route("/items/:id", get(echo_id));
        let response = app
            .oneshot(axum::http::Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .into_response();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn path_parameter_is_extracted() {
        let (status, body) = send("/items/abc-123").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"abc-123");
    }

    #[tokio::test]
    async fn invalid_utf8_is_a_validation_error() {
        let (status, body) = send("/items/%FF").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Validation failed");
        assert_eq!(json["errors"][0]["field"], "path");
    }
}
