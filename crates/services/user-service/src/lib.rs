//! User Service Library
//!
//! User CRUD over HTTP. Records live in PostgreSQL, MongoDB or process
//! memory depending on `DB_TYPE` and what is reachable at startup, with an
//! optional Redis cache in front of the chosen store.

pub mod api;
pub mod backend;
pub mod cache;
pub mod config;
pub mod infra;
pub mod repository;
pub mod service;

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use common::DatabaseConfig;

use crate::api::{create_router, AppState};
use crate::backend::{PostgresStartup, StoreHandles};
use crate::cache::{CachedUserRepository, RedisUserCache};
use crate::config::{BackendKind, UserServiceConfig};
use crate::infra::{Database, DocumentStore};
use crate::repository::UserRepository;
use crate::service::UserManager;

/// Run the HTTP server with configuration from the environment.
///
/// `host` and `port` override `SERVER_HOST` / `SERVER_PORT` when given.
pub async fn run(host: Option<String>, port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = UserServiceConfig::from_env();
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    run_server_with_config(config).await
}

/// Run migrations (for CLI commands).
pub async fn run_migrations(action: MigrateAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = UserServiceConfig::from_env();
    let db = Database::connect_without_migrations(&config.database).await?;

    match action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            for (name, applied) in status {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, name);
            }
        }
        MigrateAction::Fresh => {
            db.fresh_migrations().await?;
            info!("Database reset and migrations applied");
        }
    }

    Ok(())
}

/// Migration action type.
#[derive(Debug, Clone, Copy)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}

/// Open the stores the requested backend may use. Failures are logged and
/// leave the handle empty so selection can fall back.
async fn open_stores(config: &UserServiceConfig) -> (StoreHandles, Option<DocumentStore>) {
    let mut handles = StoreHandles::default();
    let mut document_store = None;

    match config.backend {
        BackendKind::Memory => {}
        BackendKind::Auto | BackendKind::Postgres => {
            handles.postgres = start_postgres(&config.database).await.into_handle();
        }
        BackendKind::MongoDb => match DocumentStore::connect(&config.document_store).await {
            Ok(store) => {
                handles.mongodb = Some(store.database());
                document_store = Some(store);
            }
            Err(e) => warn!(error = %e, "MongoDB unavailable"),
        },
    }

    (handles, document_store)
}

/// Connect, then apply migrations. A reachable server stays usable even
/// when migrating fails.
async fn start_postgres(config: &DatabaseConfig) -> PostgresStartup {
    let db = match Database::connect(config).await {
        Ok(db) => db,
        Err(e) => return PostgresStartup::Unreachable(e),
    };

    match db.run_migrations().await {
        Ok(()) => PostgresStartup::Ready(db.get_connection()),
        Err(e) => PostgresStartup::MigrationFailed(db.get_connection(), e),
    }
}

/// Wrap `repository` in the cache-aside decorator when caching is enabled
/// and Redis answers.
async fn with_cache(
    repository: Arc<dyn UserRepository>,
    config: &UserServiceConfig,
) -> Arc<dyn UserRepository> {
    if !config.cache.enabled {
        return repository;
    }

    let connected = match RedisUserCache::connect(&config.cache.url).await {
        Ok(cache) => cache.ping().await.map(|_| cache),
        Err(e) => Err(e),
    };

    match connected {
        Ok(cache) => {
            info!(ttl_seconds = config.cache.default_ttl_seconds, "Redis cache enabled");
            Arc::new(CachedUserRepository::new(
                repository,
                Arc::new(cache),
                Duration::from_secs(config.cache.default_ttl_seconds),
            ))
        }
        Err(e) => {
            warn!(error = %e, "Redis unavailable, serving without cache");
            repository
        }
    }
}

/// Run the HTTP server with the given configuration.
async fn run_server_with_config(config: UserServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(service = %config.server.service_name, ?config, "Starting");

    // Pick the repository
    let (handles, document_store) = open_stores(&config).await;
    let (repository, backend) = handles.into_repository(config.backend).await;
    let repository = with_cache(repository, &config).await;

    // Create service and router
    let user_service = Arc::new(UserManager::new(repository));
    let app = create_router(AppState::new(user_service));

    // Build address
    let addr = config.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        service = %config.server.service_name,
        backend = %backend,
        "Listening on http://{}",
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(store) = document_store {
        store.shutdown().await;
    }
    info!("User service stopped");

    Ok(())
}

/// Resolve on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
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
                warn!(error = %e, "Failed to listen for SIGTERM");
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

    info!("Received shutdown signal");
}
