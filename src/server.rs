//! HTTP server initialization and runtime setup.
//!
//! Handles storage selection, pipeline spawning, and Axum server lifecycle.

use crate::application::services::{IdentityService, LinkService};
use crate::config::Config;
use crate::domain::deletion_pipeline::DeletionPipeline;
use crate::domain::repositories::LinkRepository;
use crate::infrastructure::persistence::{MemoryLinkRepository, PgLinkRepository};
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use std::sync::Arc;

/// Picks the storage backend.
///
/// PostgreSQL is used when a DSN is configured and reachable; otherwise the
/// memory backend, persisted to the snapshot file when one is configured.
pub async fn open_repository(config: &Config) -> Arc<dyn LinkRepository> {
    if let Some(dsn) = &config.database_dsn {
        match PgLinkRepository::connect(
            dsn,
            config.db_max_connections,
            config.db_connect_timeout(),
        )
        .await
        {
            Ok(repository) => {
                tracing::info!("Storage: PostgreSQL");
                return Arc::new(repository);
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to open PostgreSQL, falling back to memory storage");
            }
        }
    }

    let repository =
        MemoryLinkRepository::open(config.file_storage_path.clone(), config.snapshot_debounce())
            .await;
    tracing::info!("Storage: memory");
    Arc::new(repository)
}

/// Builds the services and state shared by all handlers.
pub fn build_state(config: &Config, repository: Arc<dyn LinkRepository>) -> AppState {
    let pipeline = Arc::new(DeletionPipeline::spawn(
        repository.clone(),
        config.pipeline_settings(),
    ));

    let link_service = Arc::new(LinkService::new(
        repository,
        pipeline,
        config.base_url.clone(),
        config.request_timeout(),
    ));
    let identity_service = Arc::new(IdentityService::new(config.secret_key.clone()));

    AppState::new(link_service, identity_service)
}

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - Storage backend (PostgreSQL with migrations, or memory)
/// - Deletion pipeline workers
/// - Axum HTTP server
///
/// On Ctrl+C or SIGTERM the server stops accepting connections, drains the
/// deletion pipeline and releases the storage backend before returning.
///
/// # Errors
///
/// Returns an error if:
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let repository = open_repository(&config).await;
    let state = build_state(&config, repository);
    let link_service = state.link_service.clone();

    let app = app_router(state);

    let address = listen_address(&config.server_address);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    let served = axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    tracing::info!("Shutting down");
    link_service.shutdown().await;
    tracing::info!("Shutdown complete");

    served.context("Server error")
}

/// `:8080` means every interface.
fn listen_address(server_address: &str) -> String {
    if server_address.starts_with(':') {
        format!("0.0.0.0{server_address}")
    } else {
        server_address.to_string()
    }
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
