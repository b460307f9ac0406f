use async_trait::async_trait;
use thiserror::Error;

use crate::StoreIndex;

/// One index -> value pair to upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapLeaf {
    pub index: StoreIndex,
    pub leaf_value: Vec<u8>,
}

/// Answer for one requested index.
///
/// `leaf_value == None` means nothing was ever written at this index.
/// `Some(vec![])` means a zero-length value was written. Backends that cannot
/// tell the two apart report `Some(vec![])` for both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapLeafInclusion {
    pub index: StoreIndex,
    pub leaf_value: Option<Vec<u8>>,
}

#[derive(Debug, Error)]
pub enum BackendError {
    /// The map service could not be reached or failed the call.
    #[error("map transport error: {0}")]
    Transport(String),

    /// Local storage failure (file-backed maps).
    #[error("map io error: {0}")]
    Io(#[from] std::io::Error),

    /// The service answered, but not with what was asked for.
    #[error("map protocol error: {0}")]
    Protocol(String),
}

/// Key-value map service addressed by [`StoreIndex`].
///
/// Object-safe so callers can hold an `Arc<dyn MapBackend>` without knowing
/// the concrete type. Writes are unconditional upserts (last write wins); no
/// revision token is exchanged.
#[async_trait]
pub trait MapBackend: Send + Sync {
    /// Human-readable backend name (e.g. `"memory"`, `"postgres"`).
    fn backend_name(&self) -> &'static str;

    /// Fetch the current value for each index, in request order.
    async fn get_leaves(
        &self,
        map_id: i64,
        indices: &[StoreIndex],
    ) -> Result<Vec<MapLeafInclusion>, BackendError>;

    /// Upsert all `leaves`. Either every leaf is written or the call fails.
    async fn set_leaves(&self, map_id: i64, leaves: Vec<MapLeaf>) -> Result<(), BackendError>;
}
