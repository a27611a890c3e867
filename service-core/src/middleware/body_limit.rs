use crate::error::AppError;
use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use http_body_util::LengthLimitError;
use std::error::Error as _;

/// Default cap on buffered request bodies (100 KiB).
pub const DEFAULT_BODY_LIMIT: usize = 100 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct BodyLimit(pub usize);

impl Default for BodyLimit {
    fn default() -> Self {
        Self(DEFAULT_BODY_LIMIT)
    }
}

/// Buffers the request body up to the configured limit.
///
/// Downstream stages see a fully buffered body, so later re-reads (sanitizer,
/// JSON extractor) are cheap and never exceed the limit.
pub async fn body_limit_middleware(
    State(BodyLimit(limit)): State<BodyLimit>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let declared = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());

    if declared.is_some_and(|len| len > limit) {
        return Err(AppError::PayloadTooLarge(limit));
    }

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, limit).await.map_err(|err| {
        let inner = err.into_inner();
        let first: &(dyn std::error::Error + 'static) = &*inner;
        let mut source = Some(first);
        while let Some(e) = source {
            if e.is::<LengthLimitError>() {
                return AppError::PayloadTooLarge(limit);
            }
            source = e.source();
        }
        tracing::debug!(error = %inner, "Failed to read request body");
        AppError::validation("body", "Unable to read request body")
    })?;

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}
