use anyhow::{Context, Result};
use regmap_config::{LogSourceKind, MapBackendKind, MapperSettings};
use regmap_db::{PgLog, PgMap};
use regmap_log::{JsonlLog, LogSource};
use regmap_store::{FileMap, MapBackend, MemoryMap, RecordStore};
use std::sync::Arc;
use tracing::info;

use crate::{Mapper, MapperOptions};

/// Open the log source and map backend named by `settings`.
///
/// A Postgres pool is opened once and shared when both sides use it.
pub async fn build_mapper(settings: &MapperSettings) -> Result<Mapper> {
    let pool = if settings.needs_database() {
        let pool = regmap_db::connect(&settings.database.url_env)
            .await
            .context("mapper database connect failed")?;
        Some(pool)
    } else {
        None
    };

    let log: Arc<dyn LogSource> = match settings.log.source {
        LogSourceKind::Jsonl => {
            let dir = settings
                .log
                .path
                .as_ref()
                .context("log.path is required for source=jsonl")?;
            Arc::new(JsonlLog::new(dir))
        }
        LogSourceKind::Postgres => {
            let pool = pool.clone().context("postgres log requires a database pool")?;
            Arc::new(PgLog::new(pool))
        }
    };

    let backend: Arc<dyn MapBackend> = match settings.map.backend {
        MapBackendKind::File => {
            let root = settings
                .map
                .path
                .as_ref()
                .context("map.path is required for backend=file")?;
            Arc::new(FileMap::new(root))
        }
        MapBackendKind::Memory => Arc::new(MemoryMap::new()),
        MapBackendKind::Postgres => {
            let pool = pool.context("postgres map requires a database pool")?;
            Arc::new(PgMap::new(pool))
        }
    };

    let store = RecordStore::new(backend, settings.map.map_id)
        .with_empty_leaf_policy(settings.map.empty_leaf);

    info!(
        source = log.source_name(),
        backend = store.backend_name(),
        log_id = settings.log.log_id,
        map_id = settings.map.map_id,
        batch_size = settings.log.batch_size,
        empty_leaf = %settings.map.empty_leaf,
        "mapper wired"
    );

    Ok(Mapper::new(
        log,
        store,
        MapperOptions {
            log_id: settings.log.log_id,
            batch_size: settings.log.batch_size,
        },
    ))
}
