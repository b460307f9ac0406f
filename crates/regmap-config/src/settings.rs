use anyhow::{anyhow, bail, Context, Result};
use regmap_store::EmptyLeafPolicy;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

/// Log leaves fetched per range request when `log.batch_size` is unset.
pub const DEFAULT_BATCH_SIZE: u64 = 256;

/// Env var holding the database URL when `database.url_env` is unset.
const DEFAULT_URL_ENV: &str = "REGMAP_DATABASE_URL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSourceKind {
    Jsonl,
    Postgres,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MapBackendKind {
    File,
    /// Dry run: the map lives in process memory and is dropped when the
    /// process exits. A scan still decodes and reconciles every leaf, but
    /// nothing it writes can be read back by a later command.
    Memory,
    Postgres,
}

impl MapBackendKind {
    /// False for the in-process map, which does not outlive the process.
    pub fn is_persistent(&self) -> bool {
        !matches!(self, MapBackendKind::Memory)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogSettings {
    pub source: LogSourceKind,
    /// Directory of `<log_id>.jsonl` files. Set iff `source == Jsonl`.
    pub path: Option<PathBuf>,
    pub log_id: i64,
    pub batch_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapSettings {
    pub backend: MapBackendKind,
    /// Root directory of the file map. Set iff `backend == File`.
    pub path: Option<PathBuf>,
    pub map_id: i64,
    pub empty_leaf: EmptyLeafPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseSettings {
    /// Name of the env var holding the Postgres URL (never the URL itself).
    pub url_env: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url_env: DEFAULT_URL_ENV.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapperSettings {
    pub log: LogSettings,
    pub map: MapSettings,
    pub database: DatabaseSettings,
}

impl MapperSettings {
    /// Extract and validate mapper settings from the merged config JSON.
    ///
    /// Every pointer read here must be listed in `CONSUMED_POINTERS`.
    pub fn from_config_json(config: &Value) -> Result<Self> {
        let log = LogSettings {
            source: match required_str(config, "/log/source")? {
                "jsonl" => LogSourceKind::Jsonl,
                "postgres" => LogSourceKind::Postgres,
                other => bail!("CONFIG_INVALID /log/source='{other}': expected jsonl | postgres"),
            },
            path: optional_str(config, "/log/path")?.map(PathBuf::from),
            log_id: required_i64(config, "/log/log_id")?,
            batch_size: optional_u64(config, "/log/batch_size")?.unwrap_or(DEFAULT_BATCH_SIZE),
        };
        if log.batch_size == 0 {
            bail!("CONFIG_INVALID /log/batch_size must be > 0");
        }
        match (log.source, &log.path) {
            (LogSourceKind::Jsonl, None) => bail!("CONFIG_INVALID /log/path is required for source=jsonl"),
            (LogSourceKind::Postgres, Some(_)) => {
                bail!("CONFIG_INVALID /log/path is only valid for source=jsonl")
            }
            _ => {}
        }

        let map = MapSettings {
            backend: match required_str(config, "/map/backend")? {
                "file" => MapBackendKind::File,
                "memory" => MapBackendKind::Memory,
                "postgres" => MapBackendKind::Postgres,
                other => bail!(
                    "CONFIG_INVALID /map/backend='{other}': expected file | memory | postgres"
                ),
            },
            path: optional_str(config, "/map/path")?.map(PathBuf::from),
            map_id: required_i64(config, "/map/map_id")?,
            empty_leaf: match optional_str(config, "/map/empty_leaf")? {
                Some(s) => s
                    .parse::<EmptyLeafPolicy>()
                    .map_err(|e| anyhow!("CONFIG_INVALID /map/empty_leaf: {e}"))?,
                None => EmptyLeafPolicy::default(),
            },
        };
        match (map.backend, &map.path) {
            (MapBackendKind::File, None) => bail!("CONFIG_INVALID /map/path is required for backend=file"),
            (MapBackendKind::Memory | MapBackendKind::Postgres, Some(_)) => {
                bail!("CONFIG_INVALID /map/path is only valid for backend=file")
            }
            _ => {}
        }

        let database = match optional_str(config, "/database/url_env")? {
            Some(name) if name.trim().is_empty() => {
                bail!("CONFIG_INVALID /database/url_env must not be empty")
            }
            Some(name) => DatabaseSettings {
                url_env: name.trim().to_string(),
            },
            None => DatabaseSettings::default(),
        };

        Ok(Self { log, map, database })
    }

    /// True if either side of the mapper talks to Postgres.
    pub fn needs_database(&self) -> bool {
        self.log.source == LogSourceKind::Postgres || self.map.backend == MapBackendKind::Postgres
    }
}

fn lookup<'a>(config: &'a Value, ptr: &str) -> Option<&'a Value> {
    config.pointer(ptr).filter(|v| !v.is_null())
}

fn required_str<'a>(config: &'a Value, ptr: &str) -> Result<&'a str> {
    optional_str(config, ptr)?.ok_or_else(|| anyhow!("CONFIG_MISSING {ptr}"))
}

fn optional_str<'a>(config: &'a Value, ptr: &str) -> Result<Option<&'a str>> {
    lookup(config, ptr)
        .map(|v| {
            v.as_str()
                .ok_or_else(|| anyhow!("CONFIG_INVALID {ptr}: expected a string"))
        })
        .transpose()
}

fn required_i64(config: &Value, ptr: &str) -> Result<i64> {
    lookup(config, ptr)
        .ok_or_else(|| anyhow!("CONFIG_MISSING {ptr}"))?
        .as_i64()
        .with_context(|| format!("CONFIG_INVALID {ptr}: expected an integer"))
}

fn optional_u64(config: &Value, ptr: &str) -> Result<Option<u64>> {
    lookup(config, ptr)
        .map(|v| {
            v.as_u64()
                .with_context(|| format!("CONFIG_INVALID {ptr}: expected a non-negative integer"))
        })
        .transpose()
}
