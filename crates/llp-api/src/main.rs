//! # llp-api: Binary Entry Point
//!
//! Starts the Axum HTTP server for the download portal.
//! Binds to configurable port (default 8080).

use std::net::SocketAddr;
use std::sync::Arc;

use llp_api::{AppConfig, AppState, Backend};
use llp_store::{LicenseStore, MemoryLicenseStore, PgLicenseStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(?config, "configuration loaded");

    let store: Arc<dyn LicenseStore> = match &config.database_url {
        Some(url) => Arc::new(PgLicenseStore::connect(url).await.map_err(|e| {
            tracing::error!("Database initialization failed: {e}");
            e
        })?),
        None => {
            tracing::warn!(
                "DATABASE_URL not set; accepted license texts are kept in memory only \
                 and will not survive restarts."
            );
            Arc::new(MemoryLicenseStore::new())
        }
    };

    for path in &config.served_paths {
        if !path.is_dir() {
            tracing::warn!(path = %path.display(), "served path is not a directory");
        }
    }

    let port = config.port;
    let backend = Backend::local(config.served_paths.clone());
    let state = AppState::new(config, backend, store).map_err(|e| {
        tracing::error!("Group auth initialization failed: {e}");
        e
    })?;

    let app = llp_api::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("llp-api listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
