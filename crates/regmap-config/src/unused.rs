//! Unused-key guard.
//!
//! "Consumed pointers" are JSON Pointer prefixes. A leaf under any consumed
//! prefix is consumed; every other leaf is reported as unused. Callers pick
//! whether unused keys warn or fail.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Pointers read by `MapperSettings::from_config_json`.
/// Keep in sync with what the settings parser actually reads.
pub const CONSUMED_POINTERS: &[&str] = &[
    "/log/source",
    "/log/path",
    "/log/log_id",
    "/log/batch_size",
    "/map/backend",
    "/map/path",
    "/map/map_id",
    "/map/empty_leaf",
    "/database/url_env",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    /// Consumed JSON-pointer prefixes used for this analysis (sorted, unique)
    pub consumed_prefixes: Vec<String>,
    /// Unused leaf pointers (sorted)
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// Report leaves of `config_json` not covered by [`CONSUMED_POINTERS`].
/// With `UnusedKeyPolicy::Fail`, unused keys are an error.
pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    report_unused_keys_against(CONSUMED_POINTERS, config_json, policy)
}

pub(crate) fn report_unused_keys_against(
    consumed_pointers: &[&str],
    config_json: &Value,
    policy: UnusedKeyPolicy,
) -> Result<UnusedKeyReport> {
    let consumed: BTreeSet<String> = consumed_pointers
        .iter()
        .map(|p| normalize_pointer(p))
        .collect();
    let consumed_prefixes: Vec<String> = consumed.into_iter().collect();

    let mut leaves: Vec<String> = Vec::new();
    collect_leaf_pointers(config_json, "", &mut leaves);

    let mut unused: Vec<String> = leaves
        .into_iter()
        .filter(|lp| !consumed_prefixes.iter().any(|cp| is_prefix_pointer(cp, lp)))
        .collect();
    unused.sort();
    unused.dedup();

    let report = UnusedKeyReport {
        consumed_prefixes,
        unused_leaf_pointers: unused,
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        bail!(
            "CONFIG_UNUSED_KEYS: {} unused config leaf key(s) detected. \
            Remove them or update the consumed registry. First few: {}",
            report.unused_leaf_pointers.len(),
            preview_list(&report.unused_leaf_pointers, 12)
        );
    }

    Ok(report)
}

/// Leading "/", no trailing "/" unless the pointer is just "/".
fn normalize_pointer(p: &str) -> String {
    let mut s = p.trim().to_string();
    if s.is_empty() {
        return "/".to_string();
    }
    if !s.starts_with('/') {
        s.insert(0, '/');
    }
    while s.ends_with('/') && s.len() > 1 {
        s.pop();
    }
    s
}

/// "/a/b" consumes "/a/b" and "/a/b/c" but not "/a/bc". "/" consumes everything.
fn is_prefix_pointer(prefix: &str, leaf: &str) -> bool {
    if prefix == "/" || leaf == prefix {
        return true;
    }
    leaf.strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('/'))
}

pub(crate) fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, vv) in map {
                let next = format!("{}/{}", prefix, escape_pointer_token(k));
                collect_leaf_pointers(vv, &next, out);
            }
        }
        Value::Array(arr) => {
            for (i, vv) in arr.iter().enumerate() {
                collect_leaf_pointers(vv, &format!("{prefix}/{i}"), out);
            }
        }
        _ => out.push(if prefix.is_empty() {
            "/".to_string()
        } else {
            prefix.to_string()
        }),
    }
}

fn escape_pointer_token(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}

fn preview_list(items: &[String], n: usize) -> String {
    format!("{:?}", items.iter().take(n).collect::<Vec<_>>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prefix_respects_token_boundary() {
        assert!(is_prefix_pointer("/map", "/map/map_id"));
        assert!(is_prefix_pointer("/map/map_id", "/map/map_id"));
        assert!(!is_prefix_pointer("/map", "/mapping/x"));
        assert!(is_prefix_pointer("/", "/anything"));
    }

    #[test]
    fn pointer_tokens_are_escaped() {
        let mut out = Vec::new();
        collect_leaf_pointers(&json!({"a/b": {"c~d": 1}}), "", &mut out);
        assert_eq!(out, vec!["/a~1b/c~0d".to_string()]);
    }

    #[test]
    fn custom_registry_consumes_subtrees() {
        let cfg = json!({"x": {"y": 1, "z": 2}, "w": 3});
        let r = report_unused_keys_against(&["x/"], &cfg, UnusedKeyPolicy::Warn).unwrap();
        assert_eq!(r.consumed_prefixes, vec!["/x".to_string()]);
        assert_eq!(r.unused_leaf_pointers, vec!["/w".to_string()]);
    }
}
