//! Storage backend selection.
//!
//! The requested [`BackendKind`] and the set of stores that actually came up
//! at startup decide which [`UserRepository`] serves the process. The policy
//! is a pure function so the fallback table can be tested without servers.

use std::fmt;
use std::sync::Arc;

use sea_orm::{DatabaseConnection, DbErr};
use tracing::{info, warn};

use crate::config::BackendKind;
use crate::repository::{MemoryUserStore, MongoUserStore, PostgresUserStore, UserRepository};

/// Backend actually serving requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedBackend {
    Memory,
    Postgres,
    MongoDb,
}

impl fmt::Display for ResolvedBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedBackend::Memory => write!(f, "memory"),
            ResolvedBackend::Postgres => write!(f, "postgres"),
            ResolvedBackend::MongoDb => write!(f, "mongodb"),
        }
    }
}

/// Which external stores are reachable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Availability {
    pub postgres: bool,
    pub mongodb: bool,
}

/// Outcome of backend resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendSelection {
    pub requested: BackendKind,
    pub resolved: ResolvedBackend,
    /// True when the requested external store was unavailable
    pub fell_back: bool,
}

/// Apply the fallback policy.
///
/// - `postgres` / `mongodb`: that store if reachable, else in-memory.
/// - `memory`: always in-memory.
/// - `auto`: PostgreSQL if reachable, else in-memory.
pub fn resolve_backend(requested: BackendKind, available: Availability) -> BackendSelection {
    let (resolved, fell_back) = match requested {
        BackendKind::Memory => (ResolvedBackend::Memory, false),
        BackendKind::Postgres if available.postgres => (ResolvedBackend::Postgres, false),
        BackendKind::Postgres => (ResolvedBackend::Memory, true),
        BackendKind::MongoDb if available.mongodb => (ResolvedBackend::MongoDb, false),
        BackendKind::MongoDb => (ResolvedBackend::Memory, true),
        BackendKind::Auto if available.postgres => (ResolvedBackend::Postgres, false),
        BackendKind::Auto => (ResolvedBackend::Memory, false),
    };

    BackendSelection {
        requested,
        resolved,
        fell_back,
    }
}

/// How bringing up PostgreSQL went at startup.
pub enum PostgresStartup {
    /// Connect or ping failed
    Unreachable(DbErr),
    /// Connected and migrated
    Ready(DatabaseConnection),
    /// Connected, but applying migrations failed
    MigrationFailed(DatabaseConnection, DbErr),
}

impl PostgresStartup {
    /// Handle to offer for selection. Only an unreachable server makes
    /// PostgreSQL unavailable; a failed migration is logged and the
    /// connection is still used.
    pub fn into_handle(self) -> Option<DatabaseConnection> {
        match self {
            PostgresStartup::Unreachable(e) => {
                warn!(error = %e, "PostgreSQL unavailable");
                None
            }
            PostgresStartup::Ready(db) => {
                info!("PostgreSQL migrations applied");
                Some(db)
            }
            PostgresStartup::MigrationFailed(db, e) => {
                warn!(error = %e, "PostgreSQL migrations failed, continuing with existing schema");
                Some(db)
            }
        }
    }
}

/// Connection handles opened at startup. `None` means the store is unavailable.
#[derive(Default)]
pub struct StoreHandles {
    pub postgres: Option<DatabaseConnection>,
    pub mongodb: Option<mongodb::Database>,
}

impl StoreHandles {
    pub fn availability(&self) -> Availability {
        Availability {
            postgres: self.postgres.is_some(),
            mongodb: self.mongodb.is_some(),
        }
    }

    /// Build the repository for `requested`, falling back to in-memory when
    /// the chosen store is unavailable or its adapter cannot be initialised.
    pub async fn into_repository(
        self,
        requested: BackendKind,
    ) -> (Arc<dyn UserRepository>, ResolvedBackend) {
        let selection = resolve_backend(requested, self.availability());
        if selection.fell_back {
            warn!(
                requested = %selection.requested,
                "Requested store unavailable, falling back to in-memory storage"
            );
        }

        let repository: Arc<dyn UserRepository> = match (selection.resolved, self) {
            (
                ResolvedBackend::Postgres,
                StoreHandles {
                    postgres: Some(db), ..
                },
            ) => Arc::new(PostgresUserStore::new(db)),
            (
                ResolvedBackend::MongoDb,
                StoreHandles {
                    mongodb: Some(database),
                    ..
                },
            ) => match MongoUserStore::new(&database).await {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    warn!(error = %e, "MongoDB adapter init failed, falling back to in-memory storage");
                    return (Arc::new(MemoryUserStore::new()), ResolvedBackend::Memory);
                }
            },
            _ => Arc::new(MemoryUserStore::new()),
        };

        let resolved = selection.resolved;
        info!(backend = %resolved, "User repository selected");

        (repository, resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: Availability = Availability {
        postgres: false,
        mongodb: false,
    };
    const BOTH: Availability = Availability {
        postgres: true,
        mongodb: true,
    };

    #[test]
    fn test_explicit_store_is_used_when_available() {
        let pg = resolve_backend(BackendKind::Postgres, BOTH);
        assert_eq!(pg.resolved, ResolvedBackend::Postgres);
        assert!(!pg.fell_back);

        let mongo = resolve_backend(BackendKind::MongoDb, BOTH);
        assert_eq!(mongo.resolved, ResolvedBackend::MongoDb);
        assert!(!mongo.fell_back);
    }

    #[test]
    fn test_unavailable_store_falls_back_to_memory() {
        for requested in [BackendKind::Postgres, BackendKind::MongoDb] {
            let selection = resolve_backend(requested, NONE);
            assert_eq!(selection.resolved, ResolvedBackend::Memory);
            assert!(selection.fell_back);
        }
    }

    #[test]
    fn test_auto_prefers_postgres() {
        let selection = resolve_backend(BackendKind::Auto, BOTH);
        assert_eq!(selection.resolved, ResolvedBackend::Postgres);
    }

    #[test]
    fn test_auto_never_picks_mongodb() {
        let selection = resolve_backend(
            BackendKind::Auto,
            Availability {
                postgres: false,
                mongodb: true,
            },
        );
        assert_eq!(selection.resolved, ResolvedBackend::Memory);
        assert!(!selection.fell_back);
    }

    #[test]
    fn test_memory_ignores_available_stores() {
        let selection = resolve_backend(BackendKind::Memory, BOTH);
        assert_eq!(selection.resolved, ResolvedBackend::Memory);
        assert!(!selection.fell_back);
    }

    fn mock_connection() -> DatabaseConnection {
        sea_orm::MockDatabase::new(sea_orm::DatabaseBackend::Postgres).into_connection()
    }

    #[test]
    fn test_migration_failure_keeps_postgres_available() {
        let startup =
            PostgresStartup::MigrationFailed(mock_connection(), DbErr::Custom("boom".to_string()));

        assert!(startup.into_handle().is_some());
    }

    #[test]
    fn test_unreachable_postgres_has_no_handle() {
        let startup = PostgresStartup::Unreachable(DbErr::Custom("refused".to_string()));

        assert!(startup.into_handle().is_none());
    }

    #[tokio::test]
    async fn test_migration_failure_still_selects_postgres() {
        let handles = StoreHandles {
            postgres: PostgresStartup::MigrationFailed(
                mock_connection(),
                DbErr::Migration("users table".to_string()),
            )
            .into_handle(),
            mongodb: None,
        };

        let (_, resolved) = handles.into_repository(BackendKind::Postgres).await;

        assert_eq!(resolved, ResolvedBackend::Postgres);
    }

    #[tokio::test]
    async fn test_no_handles_yields_memory_repository() {
        let (repo, resolved) = StoreHandles::default()
            .into_repository(BackendKind::Postgres)
            .await;

        assert_eq!(resolved, ResolvedBackend::Memory);
        assert!(repo.get_all().await.unwrap().is_empty());
    }
}
