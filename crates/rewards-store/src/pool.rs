use rewards_core::error::RewardsError;
use sqlx::postgres::{PgPoolOptions, PgConnectOptions};
use sqlx::{PgPool, Pool, Postgres};
use std::str::FromStr;
use tracing::info;

/// Open the shared application connection pool and run pending migrations.
///
/// This pool is used for ordinary reads/writes (state store, query port).
/// Leader election deliberately uses a *separate*, dedicated connection
/// — see `crate::advisory_lock` — so a pooled connection's lifecycle never
/// accidentally drops the cluster-wide lock.
pub async fn connect(database_url: &str) -> Result<PgPool, RewardsError> {
    let opts =
        PgConnectOptions::from_str(database_url).map_err(|e| RewardsError::Database(e.to_string()))?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect_with(opts)
        .await?;

    info!("connected to state database");
    Ok(pool)
}

/// Run embedded migrations against `pool`. Idempotent — safe to call on
/// every startup.
pub async fn migrate(pool: &Pool<Postgres>) -> Result<(), RewardsError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| RewardsError::Migration(e.to_string()))?;
    info!("migrations applied");
    Ok(())
}
