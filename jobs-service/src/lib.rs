pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post, MethodRouter},
    Router,
};
use service_core::middleware::{
    apply_pipeline, body_limit::BodyLimit, rate_limit::IpRateLimit, PipelineConfig,
};
use std::sync::Arc;

use crate::config::JobsConfig;
use crate::services::{AuthService, JwtService, Store};

/// Process-wide state, built once in `main` (or by test harnesses).
#[derive(Clone)]
pub struct AppState {
    pub config: JobsConfig,
    pub store: Arc<dyn Store>,
    pub jwt: JwtService,
    pub auth_service: AuthService,
}

impl AppState {
    pub fn new(config: JobsConfig, store: Arc<dyn Store>) -> Self {
        let jwt = JwtService::new(&config.jwt);
        let auth_service = AuthService::new(store.clone(), jwt.clone());
        Self {
            config,
            store,
            jwt,
            auth_service,
        }
    }

    fn pipeline_config(&self) -> PipelineConfig {
        let rate_limit = &self.config.rate_limit;
        PipelineConfig {
            rate_limit: IpRateLimit::new(
                rate_limit.max_requests,
                rate_limit.window(),
                rate_limit.message.clone(),
            ),
            body_limit: BodyLimit(self.config.security.body_limit_bytes),
            allowed_origins: self.config.security.allowed_origins.clone(),
            trust_proxy: rate_limit.trust_proxy,
        }
    }
}

/// Wrong methods on a known path get the same 404 as unknown paths.
fn with_not_found(routes: MethodRouter<AppState>) -> MethodRouter<AppState> {
    routes.fallback(handlers::health::not_found)
}

pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route(
            "/register",
            with_not_found(post(handlers::auth::register)),
        )
        .route("/login", with_not_found(post(handlers::auth::login)));

    let require_auth = from_fn_with_state(state.clone(), middleware::auth_middleware);

    let job_routes = Router::new()
        .route(
            "/",
            with_not_found(
                get(handlers::jobs::list_jobs)
                    .post(handlers::jobs::create_job)
                    .route_layer(require_auth.clone()),
            ),
        )
        .route(
            "/:id",
            with_not_found(
                get(handlers::jobs::get_job)
                    .patch(handlers::jobs::update_job)
                    .delete(handlers::jobs::delete_job)
                    .route_layer(require_auth),
            ),
        );

    let pipeline = state.pipeline_config();

    let app = Router::new()
        .route("/health", with_not_found(get(handlers::health::health_check)))
        .route("/ready", with_not_found(get(handlers::health::readiness_check)))
        .route("/metrics", with_not_found(get(handlers::metrics::metrics)))
        .nest("/api/v1/auth", auth_routes)
        .nest("/api/v1/jobs", job_routes)
        .fallback(handlers::health::not_found)
        .with_state(state);

    apply_pipeline(app, pipeline)
}
