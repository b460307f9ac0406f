use anyhow::{bail, Context, Result};

use super::load_settings;

pub async fn get(config_paths: &[String], key: &str) -> Result<()> {
    let (_, settings) = load_settings(config_paths)?;
    if !settings.map.backend.is_persistent() {
        bail!("map.backend=memory keeps no records between commands; nothing to read");
    }
    let mapper = regmap_runtime::build_mapper(&settings).await?;

    match mapper.store().get(key).await? {
        Some(record) => {
            let bytes = record.to_json_bytes().context("record encode failed")?;
            println!("{}", String::from_utf8_lossy(&bytes));
        }
        None => println!("absent"),
    }
    Ok(())
}
