mod error;
pub mod memory;
pub mod repos;
#[cfg(feature = "database-sqlite")]
pub mod sqlite;

#[cfg(test)]
pub mod tests;

use std::sync::Arc;

pub use error::{DbError, DbResult};
pub use repos::*;

use crate::config::DatabaseConfig;

enum PoolStorage {
    Memory,
    #[cfg(feature = "database-sqlite")]
    Sqlite(sqlx::SqlitePool),
}

/// Borrowed view of the underlying connection pool.
pub enum DbPoolRef<'a> {
    Memory,
    #[cfg(feature = "database-sqlite")]
    Sqlite(&'a sqlx::SqlitePool),
    #[cfg(not(feature = "database-sqlite"))]
    _Phantom(std::marker::PhantomData<&'a ()>),
}

/// Storage handle shared by the services.
///
/// Repository trait objects are created once and cloned out on demand.
pub struct DbPool {
    inner: PoolStorage,
    robots: Arc<dyn RobotRepo>,
}

impl DbPool {
    /// Process-local storage, used by default and in tests.
    pub fn in_memory() -> Self {
        Self {
            inner: PoolStorage::Memory,
            robots: Arc::new(memory::MemoryRobotRepo::new()),
        }
    }

    /// Wrap an existing SQLite pool. Migrations are not run.
    #[cfg(feature = "database-sqlite")]
    pub fn from_sqlite(pool: sqlx::SqlitePool) -> Self {
        Self {
            robots: Arc::new(sqlite::SqliteRobotRepo::new(pool.clone())),
            inner: PoolStorage::Sqlite(pool),
        }
    }

    /// Open the configured backend, running migrations when asked to.
    pub async fn from_config(config: &DatabaseConfig) -> DbResult<Self> {
        match config {
            DatabaseConfig::Memory => {
                tracing::info!("Using in-memory robot storage");
                Ok(Self::in_memory())
            }
            #[cfg(feature = "database-sqlite")]
            DatabaseConfig::Sqlite(cfg) => {
                let pool = sqlx::sqlite::SqlitePoolOptions::new()
                    .max_connections(cfg.max_connections)
                    .connect_with(
                        sqlx::sqlite::SqliteConnectOptions::new()
                            .filename(&cfg.path)
                            .create_if_missing(cfg.create_if_missing)
                            .journal_mode(if cfg.wal_mode {
                                sqlx::sqlite::SqliteJournalMode::Wal
                            } else {
                                sqlx::sqlite::SqliteJournalMode::Delete
                            })
                            .busy_timeout(std::time::Duration::from_millis(cfg.busy_timeout_ms)),
                    )
                    .await?;
                tracing::info!(path = %cfg.path, "Opened SQLite robot storage");

                let db = Self::from_sqlite(pool);
                if cfg.run_migrations {
                    db.run_migrations().await?;
                }
                Ok(db)
            }
        }
    }

    /// Run database migrations using sqlx's migration runner.
    /// This automatically creates and manages a _sqlx_migrations table.
    pub async fn run_migrations(&self) -> DbResult<()> {
        match &self.inner {
            PoolStorage::Memory => Ok(()),
            #[cfg(feature = "database-sqlite")]
            PoolStorage::Sqlite(pool) => {
                tracing::info!("Running SQLite migrations");
                sqlx::migrate!("./migrations_sqlx/sqlite").run(pool).await?;
                tracing::info!("SQLite migrations completed successfully");
                Ok(())
            }
        }
    }

    pub fn pool(&self) -> DbPoolRef<'_> {
        match &self.inner {
            PoolStorage::Memory => DbPoolRef::Memory,
            #[cfg(feature = "database-sqlite")]
            PoolStorage::Sqlite(pool) => DbPoolRef::Sqlite(pool),
        }
    }

    /// Get robot repository
    pub fn robots(&self) -> Arc<dyn RobotRepo> {
        Arc::clone(&self.robots)
    }
}
