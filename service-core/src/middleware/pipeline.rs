//! Global request pipeline.
//!
//! Stages run in a fixed order for every request, routed or not:
//!
//! 1. rate limiter
//! 2. body parser (buffering + size limit)
//! 3. security headers
//! 4. cross-origin policy
//! 5. input sanitizer
//!
//! Route dispatch and the not-found fallback sit inside the stack. Every
//! stage reports failures as [`AppError`](crate::error::AppError), whose
//! `IntoResponse` impl is the single error translator; handler panics are
//! routed to the same translator by the innermost stage.
//!
//! Request id, tracing span and metrics wrap the stack so that rejected
//! requests are observed too.

use super::{
    body_limit::{body_limit_middleware, BodyLimit},
    metrics::metrics_middleware,
    panic::catch_panic_layer,
    rate_limit::{ip_rate_limit_middleware, IpRateLimit},
    sanitize::sanitize_middleware,
    security_headers::security_headers_middleware,
    tracing::{request_id_middleware, trace_layer, REQUEST_ID_HEADER},
};
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Process-wide pipeline state, built once at startup.
#[derive(Clone)]
pub struct PipelineConfig {
    pub rate_limit: IpRateLimit,
    pub body_limit: BodyLimit,
    pub allowed_origins: Vec<String>,
    /// Take the client IP from `x-forwarded-for` rather than the socket peer.
    pub trust_proxy: bool,
}

/// CORS policy. An empty list or a `*` entry allows any origin.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allow_origin = if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed_origins.iter().filter_map(|o| {
            o.parse::<HeaderValue>()
                .map_err(|e| tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e))
                .ok()
        }))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
}

/// Wrap `router` (routes + fallback) in the global pipeline.
pub fn apply_pipeline(router: Router, config: PipelineConfig) -> Router {
    let stages = ServiceBuilder::new()
        .layer(from_fn(request_id_middleware))
        .layer(trace_layer())
        .layer(from_fn(metrics_middleware))
        .layer(from_fn_with_state(
            config.rate_limit.trust_proxy(config.trust_proxy),
            ip_rate_limit_middleware,
        ))
        .layer(from_fn_with_state(config.body_limit, body_limit_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&config.allowed_origins))
        .layer(from_fn(sanitize_middleware))
        .layer(catch_panic_layer());

    router.layer(stages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use axum::{
        body::{to_bytes, Body},
        extract::ConnectInfo,
        http::{Request, StatusCode},
        routing::{get, post},
        Json,
    };
    use std::{net::SocketAddr, time::Duration};
    use tower::ServiceExt;

    async fn panicking() -> &'static str {
        panic!("kaboom")
    }

    fn app(max_requests: u32) -> Router {
        app_with_proxy(max_requests, true)
    }

    fn app_with_proxy(max_requests: u32, trust_proxy: bool) -> Router {
        let router = Router::new()
            .route("/echo", post(|Json(v): Json<serde_json::Value>| async move { Json(v) }))
            .route("/boom", get(|| async { Result::<(), _>::Err(AppError::Unauthenticated) }))
            .route("/panic", get(panicking))
            .fallback(|| async { AppError::RouteNotFound });

        apply_pipeline(
            router,
            PipelineConfig {
                rate_limit: IpRateLimit::new(max_requests, Duration::from_secs(900), "slow down"),
                body_limit: BodyLimit(1024),
                allowed_origins: vec!["*".to_string()],
                trust_proxy,
            },
        )
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("x-forwarded-for", "198.51.100.1")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn sanitizes_before_handler() {
        let response = app(10)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/echo")
                    .header("content-type", "application/json")
                    .header("x-forwarded-for", "198.51.100.1")
                    .body(Body::from(r#"{"title":"<b>x</b>"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["title"], "&lt;b&gt;x&lt;/b&gt;");
    }

    #[tokio::test]
    async fn errors_carry_security_headers() {
        let response = app(10).oneshot(get_req("/boom")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn fallback_is_not_found() {
        let response = app(10).oneshot(get_req("/nowhere")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Route does not exist");
    }

    #[tokio::test]
    async fn panics_become_internal_errors() {
        let response = app(10).oneshot(get_req("/panic")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()["x-frame-options"], "DENY");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(!String::from_utf8_lossy(&body).contains("kaboom"));
    }

    #[tokio::test]
    async fn rate_limit_runs_before_routing() {
        let app = app(1);
        let first = app.clone().oneshot(get_req("/nowhere")).await.unwrap();
        assert_eq!(first.status(), StatusCode::NOT_FOUND);

        let second = app.oneshot(get_req("/nowhere")).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        let retry: u64 = second.headers()["retry-after"].to_str().unwrap().parse().unwrap();
        assert!(retry >= 1);
    }

    #[tokio::test]
    async fn spoofed_forwarded_header_does_not_reset_quota() {
        let app = app_with_proxy(1, false);
        let from_peer = |forwarded: &str| {
            let mut request = get_req("/nowhere");
            request
                .headers_mut()
                .insert("x-forwarded-for", forwarded.parse().unwrap());
            request
                .extensions_mut()
                .insert(ConnectInfo::<SocketAddr>("192.0.2.10:5000".parse().unwrap()));
            request
        };

        let first = app.clone().oneshot(from_peer("10.0.0.1")).await.unwrap();
        assert_eq!(first.status(), StatusCode::NOT_FOUND);

        let second = app.oneshot(from_peer("10.0.0.2")).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
