//! HTTP server initialization and runtime setup.
//!
//! Handles backend selection, worker spawning, and the Axum server lifecycle.

use crate::application::services::{IdentityService, MappingService};
use crate::config::Config;
use crate::infrastructure::persistence::{Backend, MemoryStore, PgUrlRepository};
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::time::timeout;

/// Upper bound on draining queued deletes after the server stops.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the storage backend selected by `config`.
///
/// PostgreSQL when a DSN is configured (migrations are applied), otherwise
/// the in-memory store, replayed from the recovery log if one is configured.
///
/// # Errors
///
/// Returns an error if the database is unreachable, migrations fail, or the
/// recovery log cannot be opened.
pub async fn build_backend(config: &Config) -> Result<Backend> {
    if let Some(dsn) = &config.database_dsn {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .min_connections(config.db_min_connections)
            .acquire_timeout(config.connect_timeout())
            .idle_timeout(config.idle_timeout())
            .max_lifetime(config.max_lifetime())
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;
        tracing::info!("Connected to database");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to migrate")?;

        return Ok(Backend::Relational(PgUrlRepository::new(Arc::new(pool))));
    }

    let store = match config.storage_path() {
        Some(path) => MemoryStore::open(path)
            .await
            .with_context(|| format!("Failed to open recovery log {}", path.display()))?,
        None => MemoryStore::new(),
    };

    Ok(Backend::Memory(store))
}

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - Storage backend
/// - Mapping engine and its delete workers
/// - Axum HTTP server
///
/// On Ctrl-C or SIGTERM the server stops accepting connections, finishes
/// in-flight requests, then drains queued deletes.
///
/// # Errors
///
/// Returns an error if:
/// - Backend initialization fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let backend = build_backend(&config).await?;
    tracing::info!(backend = backend.kind(), "Storage backend ready");

    let mapping = Arc::new(MappingService::new(
        Arc::new(backend),
        config.base_url.clone(),
        config.delete_pipeline(),
    ));
    tracing::info!(workers = config.delete_workers, "Delete workers started");

    let identity = Arc::new(match &config.identity_secret {
        Some(secret) => IdentityService::new(secret),
        None => {
            tracing::warn!("IDENTITY_SECRET not set, identities will not survive a restart");
            IdentityService::ephemeral()
        }
    });

    let state = AppState::new(mapping.clone(), identity);

    let app = app_router(state);

    let addr: SocketAddr = config
        .server_address
        .parse()
        .with_context(|| format!("Invalid listen address '{}'", config.server_address))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped, draining delete queue");
    if timeout(DRAIN_TIMEOUT, mapping.shutdown()).await.is_err() {
        tracing::error!(
            "Delete queue drain timed out after {} seconds",
            DRAIN_TIMEOUT.as_secs()
        );
    }

    Ok(())
}

/// Completes on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serial_test::serial;
    use tempfile::tempdir;

    fn config(args: &[&str]) -> Config {
        let argv = std::iter::once("url-mapper").chain(args.iter().copied());
        let mut config = Config::try_parse_from(argv).unwrap();
        config.database_dsn = None;
        config
    }

    #[tokio::test]
    #[serial]
    async fn test_memory_backend_without_log() {
        let backend = build_backend(&config(&["-f", ""])).await.unwrap();
        assert_eq!(backend.kind(), "memory");
    }

    #[tokio::test]
    #[serial]
    async fn test_memory_backend_with_log() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        let path = path.to_str().unwrap();

        let backend = build_backend(&config(&["-f", path])).await.unwrap();

        assert_eq!(backend.kind(), "memory");
        assert!(std::path::Path::new(path).exists());
    }
}
