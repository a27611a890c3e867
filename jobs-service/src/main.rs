use jobs_service::{
    build_router,
    config::{JobsConfig, StoreBackend},
    services::{MemoryStore, MongoDb, Store},
    AppState,
};
use service_core::error::AppError;
use service_core::observability::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load configuration - fail fast if invalid
    let config = JobsConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );

    jobs_service::services::metrics::init_metrics()?;

    tracing::info!(
        service = %config.service_name,
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.environment,
        store = ?config.store,
        "Starting jobs service"
    );

    let store: Arc<dyn Store> = match config.store {
        StoreBackend::Mongo => {
            let uri = config.mongodb.uri.as_deref().ok_or_else(|| {
                AppError::ConfigError(anyhow::anyhow!("MONGODB_URI is not set"))
            })?;
            let db = MongoDb::connect(uri, &config.mongodb.database).await?;
            db.initialize_indexes().await?;
            tracing::info!("Database initialized successfully");
            Arc::new(db)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
    let app = build_router(AppState::new(config, store));

    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
