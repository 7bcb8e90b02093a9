use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime, Timeouts};
use tokio_postgres::{NoTls, Row, types::FromSql};
use crate::error::{StoreError, StoreResult};
use std::time::Duration;

const SCHEMA: &str = include_str!("../migrations/001_init.sql");

/// Creates a new database connection pool.
///
/// No connection is opened until the first checkout.
///
/// # Arguments
///
/// * `database_url` - The PostgreSQL connection string.
/// * `max_size` - The maximum number of pooled connections.
///
/// # Returns
///
/// A `StoreResult` containing the pool.
pub fn create_pool(database_url: &str, max_size: usize) -> StoreResult<Pool> {
    let mut cfg = Config::new();
    cfg.url = Some(database_url.to_string());

    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });

    let mut timeouts = Timeouts::default();
    timeouts.wait = Some(Duration::from_secs(5));
    timeouts.create = Some(Duration::from_secs(2));
    timeouts.recycle = Some(Duration::from_secs(1));

    let mut pool_cfg = PoolConfig::new(max_size);
    pool_cfg.timeouts = timeouts;
    cfg.pool = Some(pool_cfg);

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(StoreError::from)
}

/// Applies the schema. Every statement in it is idempotent.
pub async fn run_migrations(pool: &Pool) -> StoreResult<()> {
    let client = pool.get().await?;
    client.batch_execute(SCHEMA).await?;
    tracing::info!("✅ Database schema is up to date");
    Ok(())
}

/// Reads a column, reporting a missing or mistyped column as a store error.
pub(crate) fn column<'a, T: FromSql<'a>>(row: &'a Row, name: &str) -> StoreResult<T> {
    row.try_get(name)
        .map_err(|e| StoreError::Unknown(format!("column {}: {}", name, e)))
}
