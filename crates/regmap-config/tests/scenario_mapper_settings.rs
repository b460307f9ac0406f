//! Scenario: typed mapper settings and the unused-key guard
//!
//! # Invariants under test
//!
//! 1. A complete config parses into the expected settings.
//! 2. Required keys missing or mistyped => CONFIG_MISSING / CONFIG_INVALID naming the pointer.
//! 3. `batch_size` must be > 0; paths must match the chosen source/backend.
//! 4. Every key the settings parser reads is in the consumed registry (clean report).
//! 5. Unknown keys warn under `Warn` and fail under `Fail`, in sorted order.

use regmap_config::{
    load_layered_yaml_from_strings, report_unused_keys, LogSourceKind, MapBackendKind,
    MapperSettings, UnusedKeyPolicy,
};
use regmap_store::EmptyLeafPolicy;
use std::path::PathBuf;

const FULL_YAML: &str = r#"
log:
  source: jsonl
  path: ./var/log
  log_id: 12
  batch_size: 64
map:
  backend: file
  path: ./var/map
  map_id: 34
  empty_leaf: absent
database:
  url_env: MY_DB_URL
"#;

fn settings(yaml: &str) -> anyhow::Result<MapperSettings> {
    let loaded = load_layered_yaml_from_strings(&[yaml])?;
    MapperSettings::from_config_json(&loaded.config_json)
}

fn err_of(yaml: &str) -> String {
    format!("{:#}", settings(yaml).unwrap_err())
}

#[test]
fn full_config_parses() {
    let s = settings(FULL_YAML).unwrap();
    assert_eq!(s.log.source, LogSourceKind::Jsonl);
    assert_eq!(s.log.path, Some(PathBuf::from("./var/log")));
    assert_eq!(s.log.log_id, 12);
    assert_eq!(s.log.batch_size, 64);
    assert_eq!(s.map.backend, MapBackendKind::File);
    assert_eq!(s.map.map_id, 34);
    assert_eq!(s.map.empty_leaf, EmptyLeafPolicy::Absent);
    assert_eq!(s.database.url_env, "MY_DB_URL");
}

#[test]
fn missing_and_mistyped_keys_are_named() {
    let no_log_id = "log: {source: postgres}\nmap: {backend: memory, map_id: 1}\n";
    assert!(err_of(no_log_id).contains("CONFIG_MISSING /log/log_id"));

    let str_map_id = "log: {source: postgres, log_id: 1}\nmap: {backend: memory, map_id: \"x\"}\n";
    assert!(err_of(str_map_id).contains("CONFIG_INVALID /map/map_id"));

    let bad_backend = "log: {source: postgres, log_id: 1}\nmap: {backend: redis, map_id: 1}\n";
    assert!(err_of(bad_backend).contains("/map/backend='redis'"));

    let bad_policy =
        "log: {source: postgres, log_id: 1}\nmap: {backend: memory, map_id: 1, empty_leaf: maybe}\n";
    assert!(err_of(bad_policy).contains("/map/empty_leaf"));
}

#[test]
fn zero_batch_size_is_rejected() {
    let yaml = "log: {source: postgres, log_id: 1, batch_size: 0}\nmap: {backend: memory, map_id: 1}\n";
    assert!(err_of(yaml).contains("batch_size must be > 0"));
}

#[test]
fn paths_must_match_kind() {
    let jsonl_without_path = "log: {source: jsonl, log_id: 1}\nmap: {backend: memory, map_id: 1}\n";
    assert!(err_of(jsonl_without_path).contains("/log/path is required"));

    let file_without_path = "log: {source: postgres, log_id: 1}\nmap: {backend: file, map_id: 1}\n";
    assert!(err_of(file_without_path).contains("/map/path is required"));

    let memory_with_path =
        "log: {source: postgres, log_id: 1}\nmap: {backend: memory, map_id: 1, path: ./x}\n";
    assert!(err_of(memory_with_path).contains("only valid for backend=file"));
}

#[test]
fn consumed_registry_covers_the_full_config() {
    let loaded = load_layered_yaml_from_strings(&[FULL_YAML]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap();
    assert!(report.is_clean(), "{:?}", report.unused_leaf_pointers);
}

#[test]
fn unknown_keys_warn_or_fail() {
    let extra = "map:\n  mapid: 3\nzz:\n  b: 1\n  a: 2\n";
    let loaded = load_layered_yaml_from_strings(&[FULL_YAML, extra]).unwrap();

    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn).unwrap();
    assert_eq!(
        report.unused_leaf_pointers,
        vec!["/map/mapid", "/zz/a", "/zz/b"]
    );

    let err = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap_err();
    assert!(err.to_string().contains("CONFIG_UNUSED_KEYS"));
    assert!(err.to_string().contains("3 unused"));
}
