use anyhow::{Context, Result};
use regmap_config::{report_unused_keys, UnusedKeyPolicy};
use tracing::warn;

use super::load_settings;

pub async fn run(config_paths: &[String], fail_on_unused_keys: bool) -> Result<()> {
    let (loaded, settings) = load_settings(config_paths)?;

    let policy = if fail_on_unused_keys {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    let unused = report_unused_keys(&loaded.config_json, policy)?;
    for pointer in &unused.unused_leaf_pointers {
        warn!(%pointer, "unused config key");
    }

    if !settings.map.backend.is_persistent() {
        warn!("map.backend=memory: dry run, records are discarded on exit");
    }

    let mapper = regmap_runtime::build_mapper(&settings).await?;
    let report = mapper.run().await.context("scan failed")?;

    println!("config_hash={}", loaded.config_hash);
    println!("scan_id={}", report.scan_id);
    println!("log_id={}", report.log_id);
    println!("map_id={}", settings.map.map_id);
    println!("leaves={}", report.leaves);
    println!("created={}", report.created);
    println!("replaced={}", report.replaced);
    println!("merged={}", report.merged);
    println!("duplicates={}", report.duplicates);
    println!("stale={}", report.stale);
    Ok(())
}
