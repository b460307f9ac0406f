//! regmap-db
//!
//! Postgres adapters: `PgMap` (map backend) and `PgLog` (log source).
//! Connection URL always comes from an env var; it is never a config literal.

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;

mod log;
mod map;

pub use log::PgLog;
pub use map::PgMap;
pub use sqlx::PgPool;

/// Connect to Postgres using the URL in env var `url_env`.
pub async fn connect(url_env: &str) -> Result<PgPool> {
    let url = std::env::var(url_env).with_context(|| format!("missing env var {url_env}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Connectivity + schema presence.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    Ok(DbStatus {
        ok: one == 1,
        has_map_table: table_exists(pool, "map_leaves").await?,
        has_log_table: table_exists(pool, "log_leaves").await?,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_map_table: bool,
    pub has_log_table: bool,
}

async fn table_exists(pool: &PgPool, table: &str) -> Result<bool> {
    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name=$1
        )
        "#,
    )
    .bind(table)
    .fetch_one(pool)
    .await
    .with_context(|| format!("status table-exists query failed: {table}"))?;
    Ok(exists)
}
