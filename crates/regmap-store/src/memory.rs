use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

use crate::{BackendError, MapBackend, MapLeaf, MapLeafInclusion, StoreIndex};

/// In-process map. Counts round trips so tests can assert on write traffic.
#[derive(Debug, Default)]
pub struct MemoryMap {
    leaves: RwLock<BTreeMap<(i64, StoreIndex), Vec<u8>>>,
    get_calls: AtomicU64,
    set_calls: AtomicU64,
    empty_for_missing: bool,
}

impl MemoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer never-written indices with an empty value instead of `None`,
    /// like map services that have no existence signal.
    pub fn without_existence_signal() -> Self {
        Self {
            empty_for_missing: true,
            ..Self::default()
        }
    }

    /// Raw write that bypasses the call counters (test setup).
    pub async fn insert_raw(&self, map_id: i64, index: StoreIndex, value: Vec<u8>) {
        self.leaves.write().await.insert((map_id, index), value);
    }

    pub async fn leaf(&self, map_id: i64, index: StoreIndex) -> Option<Vec<u8>> {
        self.leaves.read().await.get(&(map_id, index)).cloned()
    }

    pub fn get_calls(&self) -> u64 {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn set_calls(&self) -> u64 {
        self.set_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MapBackend for MemoryMap {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get_leaves(
        &self,
        map_id: i64,
        indices: &[StoreIndex],
    ) -> Result<Vec<MapLeafInclusion>, BackendError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let leaves = self.leaves.read().await;
        Ok(indices
            .iter()
            .map(|index| {
                let stored = leaves.get(&(map_id, *index)).cloned();
                MapLeafInclusion {
                    index: *index,
                    leaf_value: match stored {
                        None if self.empty_for_missing => Some(Vec::new()),
                        other => other,
                    },
                }
            })
            .collect())
    }

    async fn set_leaves(&self, map_id: i64, leaves: Vec<MapLeaf>) -> Result<(), BackendError> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        let mut map = self.leaves.write().await;
        for leaf in leaves {
            map.insert((map_id, leaf.index), leaf.leaf_value);
        }
        Ok(())
    }
}
