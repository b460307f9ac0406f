use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::{LogError, LogLeaf, LogSource};

/// In-process log, one leaf vector per log id.
#[derive(Debug, Default)]
pub struct MemoryLog {
    logs: RwLock<BTreeMap<i64, Vec<Vec<u8>>>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log pre-filled with `payloads` under `log_id`.
    pub fn with_leaves<I, P>(log_id: i64, payloads: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Vec<u8>>,
    {
        let mut logs = BTreeMap::new();
        logs.insert(log_id, payloads.into_iter().map(Into::into).collect());
        Self {
            logs: RwLock::new(logs),
        }
    }

    /// Append one payload and return its leaf index.
    pub async fn append(&self, log_id: i64, payload: impl Into<Vec<u8>>) -> u64 {
        let mut logs = self.logs.write().await;
        let leaves = logs.entry(log_id).or_default();
        leaves.push(payload.into());
        (leaves.len() - 1) as u64
    }
}

#[async_trait]
impl LogSource for MemoryLog {
    fn source_name(&self) -> &'static str {
        "memory"
    }

    async fn tree_size(&self, log_id: i64) -> Result<u64, LogError> {
        Ok(self
            .logs
            .read()
            .await
            .get(&log_id)
            .map_or(0, |l| l.len() as u64))
    }

    async fn get_leaves_by_range(
        &self,
        log_id: i64,
        start: u64,
        count: u64,
    ) -> Result<Vec<LogLeaf>, LogError> {
        let logs = self.logs.read().await;
        let Some(leaves) = logs.get(&log_id) else {
            return Ok(Vec::new());
        };
        Ok(leaves
            .iter()
            .enumerate()
            .skip(start as usize)
            .take(count as usize)
            .map(|(i, v)| LogLeaf::new(i as u64, v.clone()))
            .collect())
    }
}
