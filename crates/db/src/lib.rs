//! SQLite persistence for the job event log and the user registry.
//!
//! Repositories are stateless unit structs whose associated functions take
//! the pool explicitly, so callers own the pool's lifetime.

pub mod models;
pub mod repositories;

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};

pub type DbPool = sqlx::SqlitePool;

/// Default connection pool size.
const DEFAULT_POOL_SIZE: u32 = 8;

/// How long a writer waits on the database lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Open (creating if needed) the database file at `path`.
///
/// WAL mode lets dashboard readers run while the producer appends.
pub async fn create_pool(path: impl AsRef<Path>) -> Result<DbPool, sqlx::Error> {
    if let Some(parent) = path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path.as_ref())
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(BUSY_TIMEOUT)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(DEFAULT_POOL_SIZE)
        .acquire_timeout(Duration::from_secs(30))
        .connect_with(options)
        .await?;

    tracing::info!(
        path = %path.as_ref().display(),
        max_connections = DEFAULT_POOL_SIZE,
        "SQLite pool initialized",
    );
    Ok(pool)
}

/// Single-connection in-memory database, migrated and ready.
///
/// The connection is never recycled; an in-memory database lives exactly
/// as long as its connection.
pub async fn create_memory_pool() -> Result<DbPool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

/// Apply embedded migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Round-trip a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}
