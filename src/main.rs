/// Main application entry point with clean architecture
mod catalog;
mod clients;
mod config;
mod domain;
mod errors;
mod figure;
mod handlers;
mod routes;
mod services;
mod utils;

use crate::catalog::ProductCatalog;
use crate::clients::EarthEngineClient;
use crate::config::AppConfig;
use crate::handlers::AppState;
use crate::routes::build_router;
use crate::services::DroughtService;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    // Load configuration
    let config = AppConfig::from_env()?;
    info!("Configuration loaded successfully");

    // Product catalog is built once and shared read-only
    let catalog = match &config.catalog_path {
        Some(path) => {
            info!("Loading product catalog from {}", path.display());
            ProductCatalog::from_json_file(path)?
        }
        None => ProductCatalog::builtin(),
    };
    info!(
        "Product catalog ready ({} products)",
        catalog.iter().count()
    );

    // Initialize clients
    let query_client = EarthEngineClient::new(config.query_service_url.clone(), config.query_timeout)?;
    info!("Query service at {}", query_client.base_url());

    // Initialize services
    let service = Arc::new(DroughtService::new(Arc::new(catalog), Arc::new(query_client)));

    // Initialize application state
    let bind_addr = config.bind_addr;
    let root_url = config.root_url.clone();
    let state = AppState {
        config: Arc::new(config),
        service,
    };

    // Build router
    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("drought_watch listening on {}{}/", bind_addr, root_url);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
