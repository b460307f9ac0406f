use regmap_log::LogError;
use regmap_schemas::DecodeError;
use regmap_store::StoreError;
use std::fmt;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreOp {
    Get,
    Set,
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StoreOp::Get => "get",
            StoreOp::Set => "set",
        })
    }
}

/// Fatal scan failure. The scan stops at the first one; nothing is retried.
#[derive(Debug, Error)]
pub enum MapperError {
    #[error("log read failed: {0}")]
    Log(#[from] LogError),

    #[error("leaf {leaf_index} is undecodable: {source}")]
    Decode {
        leaf_index: u64,
        #[source]
        source: DecodeError,
    },

    #[error("store {op} failed for key {key:?}: {source}")]
    Store {
        key: String,
        op: StoreOp,
        #[source]
        source: StoreError,
    },
}

impl MapperError {
    /// Index of the offending leaf, when the failure is tied to one.
    pub fn leaf_index(&self) -> Option<u64> {
        match self {
            MapperError::Decode { leaf_index, .. } => Some(*leaf_index),
            _ => None,
        }
    }
}
