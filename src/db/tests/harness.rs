//! Test harness for database repository testing
//!
//! SQLite tests use fast in-memory databases with the real migrations applied.

#[cfg(feature = "database-sqlite")]
use sqlx::SqlitePool;

/// Create an in-memory SQLite pool for testing
#[cfg(feature = "database-sqlite")]
pub async fn create_sqlite_pool() -> SqlitePool {
    sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory SQLite pool")
}

/// Run SQLite migrations on the pool
///
/// Uses the actual migration files to ensure tests match production schema
#[cfg(feature = "database-sqlite")]
pub async fn run_sqlite_migrations(pool: &SqlitePool) {
    sqlx::migrate!("./migrations_sqlx/sqlite")
        .run(pool)
        .await
        .expect("Failed to run SQLite migrations");
}

/// Fresh migrated in-memory SQLite pool.
#[cfg(feature = "database-sqlite")]
pub async fn migrated_sqlite_pool() -> SqlitePool {
    let pool = create_sqlite_pool().await;
    run_sqlite_migrations(&pool).await;
    pool
}
