use regmap_schemas::Record;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::{BackendError, MapBackend, MapLeaf, StoreIndex};

// ---------------------------------------------------------------------------
// Empty-leaf policy
// ---------------------------------------------------------------------------

/// How a written-but-empty leaf is interpreted on read.
///
/// A never-written leaf is always "no record". An empty leaf is ambiguous:
/// some map services return an empty value for indices they have never seen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyLeafPolicy {
    /// Empty payload is a corrupt record (hard error).
    #[default]
    Reject,
    /// Empty payload means "no record", for backends without an existence signal.
    Absent,
}

impl EmptyLeafPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmptyLeafPolicy::Reject => "reject",
            EmptyLeafPolicy::Absent => "absent",
        }
    }
}

impl FromStr for EmptyLeafPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(EmptyLeafPolicy::Reject),
            "absent" => Ok(EmptyLeafPolicy::Absent),
            other => Err(format!(
                "invalid empty_leaf policy '{other}'. expected one of: reject | absent"
            )),
        }
    }
}

impl fmt::Display for EmptyLeafPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("record encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("stored record at index {index} is undecodable: {source}")]
    Decode {
        index: StoreIndex,
        #[source]
        source: serde_json::Error,
    },

    #[error("stored record at index {index} is empty")]
    EmptyLeaf { index: StoreIndex },

    /// The record's own key differs from the key it is addressed by.
    #[error("record for key {record_key:?} does not belong under key {key:?}")]
    KeyMismatch { key: String, record_key: String },

    #[error("map protocol error: {0}")]
    Protocol(String),
}

// ---------------------------------------------------------------------------
// Record store
// ---------------------------------------------------------------------------

/// One Record per key, addressed by `StoreIndex::for_key(key)`.
///
/// Stateless facade over a [`MapBackend`]: each `get`/`set` is exactly one
/// backend round trip and nothing is cached between calls. Not retried.
#[derive(Clone)]
pub struct RecordStore {
    backend: Arc<dyn MapBackend>,
    map_id: i64,
    empty_leaf: EmptyLeafPolicy,
}

impl RecordStore {
    pub fn new(backend: Arc<dyn MapBackend>, map_id: i64) -> Self {
        Self {
            backend,
            map_id,
            empty_leaf: EmptyLeafPolicy::default(),
        }
    }

    pub fn with_empty_leaf_policy(mut self, policy: EmptyLeafPolicy) -> Self {
        self.empty_leaf = policy;
        self
    }

    pub fn map_id(&self) -> i64 {
        self.map_id
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    /// Current record for `key`, or `None` if nothing was ever stored.
    /// A stored record carrying a different key is refused.
    pub async fn get(&self, key: &str) -> Result<Option<Record>, StoreError> {
        let index = StoreIndex::for_key(key);
        let mut resp = self.backend.get_leaves(self.map_id, &[index]).await?;

        if resp.len() != 1 {
            return Err(StoreError::Protocol(format!(
                "asked for 1 leaf at {index}, got {}",
                resp.len()
            )));
        }
        let inclusion = resp.remove(0);
        if inclusion.index != index {
            return Err(StoreError::Protocol(format!(
                "asked for leaf {index}, got {}",
                inclusion.index
            )));
        }

        let Some(bytes) = inclusion.leaf_value else {
            debug!(key, %index, "no leaf");
            return Ok(None);
        };
        debug!(key, %index, leaf = %String::from_utf8_lossy(&bytes), "read leaf");

        if bytes.is_empty() {
            return match self.empty_leaf {
                EmptyLeafPolicy::Absent => Ok(None),
                EmptyLeafPolicy::Reject => Err(StoreError::EmptyLeaf { index }),
            };
        }

        let record = Record::from_json_bytes(&bytes)
            .map_err(|source| StoreError::Decode { index, source })?;
        if record.key() != key {
            return Err(StoreError::KeyMismatch {
                key: key.to_string(),
                record_key: record.key().to_string(),
            });
        }
        Ok(Some(record))
    }

    /// Unconditional upsert of `record` under `key`. Returns the index written.
    pub async fn set(&self, key: &str, record: &Record) -> Result<StoreIndex, StoreError> {
        if record.key() != key {
            return Err(StoreError::KeyMismatch {
                key: key.to_string(),
                record_key: record.key().to_string(),
            });
        }

        let index = StoreIndex::for_key(key);
        let leaf_value = record.to_json_bytes().map_err(StoreError::Encode)?;
        debug!(key, %index, items = record.items().len(), "writing record");

        self.backend
            .set_leaves(self.map_id, vec![MapLeaf { index, leaf_value }])
            .await?;
        Ok(index)
    }
}

impl fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordStore")
            .field("backend", &self.backend.backend_name())
            .field("map_id", &self.map_id)
            .field("empty_leaf", &self.empty_leaf)
            .finish()
    }
}
