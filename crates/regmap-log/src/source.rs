use async_trait::async_trait;
use thiserror::Error;

/// One immutable element of a log: its position and raw payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLeaf {
    pub leaf_index: u64,
    pub leaf_value: Vec<u8>,
}

impl LogLeaf {
    pub fn new(leaf_index: u64, leaf_value: impl Into<Vec<u8>>) -> Self {
        Self {
            leaf_index,
            leaf_value: leaf_value.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LogError {
    #[error("log io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("log transport error: {0}")]
    Transport(String),

    /// The source answered with leaves that do not match the request
    /// (gaps, reordering, wrong count).
    #[error("log protocol error: {0}")]
    Protocol(String),

    /// Refused to append a payload that would not decode as a leaf.
    #[error("invalid leaf payload: {0}")]
    InvalidPayload(#[from] regmap_schemas::DecodeError),
}

/// Ordered, read-only view of one or more append-only logs.
///
/// Leaves are addressed by a dense, zero-based index. Implementations must
/// return the requested range in ascending index order; they may return fewer
/// leaves than asked for only at the end of the log.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Human-readable source name (e.g. `"jsonl"`, `"postgres"`).
    fn source_name(&self) -> &'static str;

    /// Number of leaves currently in the log.
    async fn tree_size(&self, log_id: i64) -> Result<u64, LogError>;

    /// Leaves `[start, start + count)`, in order.
    async fn get_leaves_by_range(
        &self,
        log_id: i64,
        start: u64,
        count: u64,
    ) -> Result<Vec<LogLeaf>, LogError>;
}
