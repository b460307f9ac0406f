//! Command handler modules for the regmap CLI.
//!
//! Shared utilities used by multiple command paths live here.

pub mod log;
pub mod map;
pub mod record;

use anyhow::{Context, Result};
use regmap_config::{LoadedConfig, MapperSettings};
use serde_json::Value;
use std::fs;

/// Load layered config and extract the mapper settings from it.
pub fn load_settings(config_paths: &[String]) -> Result<(LoadedConfig, MapperSettings)> {
    let loaded = regmap_config::load_layered_yaml(config_paths)?;
    let settings = MapperSettings::from_config_json(&loaded.config_json)
        .context("invalid mapper settings")?;
    Ok((loaded, settings))
}

/// Connect to the database named by `database.url_env` and nothing else.
pub async fn connect_db(config_paths: &[String]) -> Result<regmap_db::PgPool> {
    let (_, settings) = load_settings(config_paths)?;
    regmap_db::connect(&settings.database.url_env).await
}

/// Load a JSON payload from either an inline string or a file path.
pub fn load_payload(payload: Option<String>, payload_file: Option<String>) -> Result<Value> {
    if let Some(p) = payload_file {
        let bytes = fs::read(&p).with_context(|| format!("read payload-file failed: {}", p))?;
        let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(&bytes);
        let raw = std::str::from_utf8(bytes).context("payload-file must be UTF-8 text")?;
        return serde_json::from_str(raw.trim()).context("payload-file must contain valid JSON");
    }

    let raw = payload.context("must provide --payload or --payload-file")?;
    serde_json::from_str(raw.trim()).context("--payload must be valid JSON")
}
