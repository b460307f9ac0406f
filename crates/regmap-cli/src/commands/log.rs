use anyhow::{Context, Result};
use regmap_config::LogSourceKind;
use regmap_log::LeafWriter;
use regmap_schemas::LeafPayload;
use serde_json::Value;

use super::load_settings;

/// Append `payload` to the configured log after validating it as a leaf.
pub async fn append(config_paths: &[String], payload: &Value) -> Result<()> {
    let (_, settings) = load_settings(config_paths)?;
    let raw = serde_json::to_vec(payload).context("payload encode failed")?;

    let leaf_index = match settings.log.source {
        LogSourceKind::Jsonl => {
            let dir = settings
                .log
                .path
                .as_ref()
                .context("log.path is required for source=jsonl")?;
            let mut writer = LeafWriter::open(dir, settings.log.log_id)?;
            writer.append_raw(&raw)?
        }
        LogSourceKind::Postgres => {
            let leaf = LeafPayload::decode(&raw).context("payload is not a valid leaf")?;
            let pool = regmap_db::connect(&settings.database.url_env).await?;
            let bytes = leaf.encode().context("leaf encode failed")?;
            regmap_db::PgLog::new(pool)
                .append(settings.log.log_id, &bytes)
                .await?
        }
    };

    println!("log_id={}", settings.log.log_id);
    println!("leaf_index={}", leaf_index);
    Ok(())
}
