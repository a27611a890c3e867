//! Shared setup for jobs-service integration tests.
//!
//! Drives the full router in-process with `oneshot` against the memory store.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use jobs_service::{
    build_router,
    config::{
        Environment, JobsConfig, JwtConfig, MongoConfig, RateLimitConfig, SecurityConfig,
        StoreBackend,
    },
    services::MemoryStore,
    AppState,
};
use secrecy::Secret;
use serde_json::{json, Value};
use service_core::middleware::rate_limit::DEFAULT_RATE_LIMIT_MESSAGE;
use std::sync::Arc;
use tower::ServiceExt;

pub const TEST_JWT_SECRET: &str = "integration-test-secret";
pub const TEST_CLIENT_IP: &str = "203.0.113.7";

pub fn test_config() -> JobsConfig {
    JobsConfig {
        common: service_core::config::Config { port: 0 },
        environment: Environment::Dev,
        service_name: "jobs-service-test".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        store: StoreBackend::Memory,
        mongodb: MongoConfig {
            uri: None,
            database: "jobs_test".to_string(),
        },
        jwt: JwtConfig {
            secret: Secret::new(TEST_JWT_SECRET.to_string()),
            expiry_minutes: 60,
        },
        security: SecurityConfig {
            allowed_origins: vec!["*".to_string()],
            body_limit_bytes: 100 * 1024,
        },
        rate_limit: RateLimitConfig {
            window_ms: 900_000,
            max_requests: 10_000,
            message: DEFAULT_RATE_LIMIT_MESSAGE.to_string(),
            trust_proxy: true,
        },
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn spawn() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: JobsConfig) -> Self {
        let state = AppState::new(config, Arc::new(MemoryStore::new()));
        let router = build_router(state.clone());
        Self { router, state }
    }

    /// Send a raw request; the client IP header is added when absent.
    pub async fn send(&self, mut request: Request<Body>) -> TestResponse {
        if !request.headers().contains_key("x-forwarded-for") {
            request.headers_mut().insert(
                "x-forwarded-for",
                TEST_CLIENT_IP.parse().expect("valid header value"),
            );
        }

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).expect("Failed to build request"))
            .await
    }

    /// Register a user and return `(token, user_id)`.
    pub async fn register(&self, handle: &str, secret: &str, name: &str) -> (String, String) {
        let res = self
            .request(
                Method::POST,
                "/api/v1/auth/register",
                None,
                Some(json!({ "handle": handle, "secret": secret, "displayName": name })),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "register failed: {}", res.body);
        (
            res.body["token"].as_str().expect("token").to_string(),
            res.body["identity"]["id"].as_str().expect("id").to_string(),
        )
    }

    /// Create a job and return its id.
    pub async fn create_job(&self, token: &str, body: Value) -> String {
        let res = self
            .request(Method::POST, "/api/v1/jobs", Some(token), Some(body))
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "create failed: {}", res.body);
        res.body["id"].as_str().expect("id").to_string()
    }
}
