use portfolio_service::{
    build_router,
    config::{PortfolioConfig, StorageBackend},
    db,
    services::{
        seed_admin, Database, EmailProvider, EmailService, LocalStorage, MockEmailService,
        Storage, Store, SupabaseStorage,
    },
    AppState,
};
use service_core::error::AppError;
use service_core::observability::{init_metrics, init_tracing};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

const STORAGE_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const TOKEN_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

async fn build_storage(config: &PortfolioConfig) -> Result<Arc<dyn Storage>, AppError> {
    match config.storage.backend {
        StorageBackend::Local => {
            let storage =
                LocalStorage::new(&config.storage.local_path, &config.storage.public_base_url)
                    .await?;
            tracing::info!(path = %config.storage.local_path.display(), "Using local object storage");
            Ok(Arc::new(storage))
        }
        StorageBackend::Supabase => {
            let (Some(url), Some(key)) = (
                config.storage.supabase_url.as_deref(),
                config.storage.supabase_service_role_key.clone(),
            ) else {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY are required"
                )));
            };
            let storage =
                SupabaseStorage::new(url, key, &config.storage.bucket, STORAGE_HTTP_TIMEOUT)?;
            tracing::info!(bucket = %config.storage.bucket, "Using Supabase object storage");
            Ok(Arc::new(storage))
        }
    }
}

fn build_email(config: &PortfolioConfig) -> Result<Arc<dyn EmailProvider>, AppError> {
    match EmailService::new(&config.smtp) {
        Ok(service) => Ok(Arc::new(service)),
        // Codes are only mailed when 2FA is on
        Err(e) if !config.two_factor.enabled => {
            tracing::warn!(error = %e, "SMTP not configured; verification emails disabled");
            Ok(Arc::new(MockEmailService::new()))
        }
        Err(e) => Err(e),
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = PortfolioConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );
    init_metrics();
    service_core::error::expose_internal_details(!config.is_prod());

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting portfolio service"
    );

    let pool = db::create_pool(&config.database)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;
    db::run_migrations(&pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
    let store: Arc<dyn Store> = Arc::new(Database::new(pool));
    tracing::info!("Database initialized successfully");

    seed_admin(store.as_ref(), &config.seed).await?;

    let storage = build_storage(&config).await?;
    let email = build_email(&config)?;

    let state = AppState::new(config.clone(), store, storage, email).await?;

    let tokens = state.tokens.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TOKEN_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match tokens.purge_expired().await {
                Ok(removed) if removed > 0 => {
                    tracing::info!(removed, "Purged expired refresh tokens")
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Failed to purge expired refresh tokens"),
            }
        }
    });

    let app = build_router(state)?;

    let addr = config.common.listen_addr()?;

    let service_span = tracing::info_span!(
        "service",
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
    );
    let _guard = service_span.enter();

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
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
