//! Input sanitizer: neutralises HTML in JSON bodies and query strings.
//!
//! Every string value (object keys are left alone) has `<` and `>` replaced by
//! their HTML entities before handlers see the request. Bodies that are not
//! JSON, or fail to parse, pass through untouched; the JSON extractor rejects
//! them later.

use crate::error::AppError;
use axum::{
    body::{to_bytes, Body, Bytes},
    extract::Request,
    http::{header, uri::PathAndQuery, HeaderValue, Uri},
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use std::borrow::Cow;

/// Escape the characters that can open or close an HTML tag.
pub fn escape_html(input: &str) -> Cow<'_, str> {
    if !input.contains(['<', '>']) {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len() + 8);
    for c in input.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Recursively escape every string inside a JSON value.
pub fn sanitize_value(value: &mut Value) {
    match value {
        Value::String(s) => {
            if let Cow::Owned(escaped) = escape_html(s) {
                *s = escaped;
            }
        }
        Value::Array(items) => items.iter_mut().for_each(sanitize_value),
        Value::Object(map) => map.values_mut().for_each(sanitize_value),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

fn is_json(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"))
}

fn sanitize_query(uri: &Uri) -> Option<Uri> {
    let query = uri.query()?;
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).ok()?;
    if !pairs.iter().any(|(_, v)| v.contains(['<', '>'])) {
        return None;
    }

    let cleaned: Vec<(String, String)> = pairs
        .into_iter()
        .map(|(k, v)| (k, escape_html(&v).into_owned()))
        .collect();
    let encoded = serde_urlencoded::to_string(&cleaned).ok()?;

    let mut parts = uri.clone().into_parts();
    parts.path_and_query =
        Some(PathAndQuery::try_from(format!("{}?{}", uri.path(), encoded)).ok()?);
    Uri::from_parts(parts).ok()
}

fn sanitize_body(bytes: Bytes) -> Bytes {
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(mut value) => {
            sanitize_value(&mut value);
            match serde_json::to_vec(&value) {
                Ok(cleaned) => Bytes::from(cleaned),
                Err(_) => bytes,
            }
        }
        Err(_) => bytes,
    }
}

pub async fn sanitize_middleware(request: Request, next: Next) -> Result<Response, AppError> {
    let json = is_json(&request);
    let (mut parts, body) = request.into_parts();

    if let Some(uri) = sanitize_query(&parts.uri) {
        parts.uri = uri;
    }

    if !json {
        return Ok(next.run(Request::from_parts(parts, body)).await);
    }

    // Already bounded by the body-limit stage.
    let bytes = to_bytes(body, usize::MAX).await.map_err(|err| {
        tracing::debug!(error = %err, "Failed to read request body for sanitizing");
        AppError::validation("body", "Unable to read request body")
    })?;
    let cleaned = sanitize_body(bytes);

    parts.headers.insert(header::CONTENT_LENGTH, HeaderValue::from(cleaned.len()));

    Ok(next.run(Request::from_parts(parts, Body::from(cleaned))).await)
}
