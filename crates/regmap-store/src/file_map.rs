use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::{BackendError, MapBackend, MapLeaf, MapLeafInclusion, StoreIndex};

/// Directory-backed map: `<root>/<map_id>/<index hex>.json`.
///
/// File presence is the existence signal, so a zero-length file reads back as
/// an empty value rather than as "never written". Each leaf is written to a
/// temp file and renamed into place, so readers never see a torn value.
#[derive(Debug, Clone)]
pub struct FileMap {
    root: PathBuf,
}

impl FileMap {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn map_dir(&self, map_id: i64) -> PathBuf {
        self.root.join(map_id.to_string())
    }

    pub fn leaf_path(&self, map_id: i64, index: &StoreIndex) -> PathBuf {
        self.map_dir(map_id).join(format!("{}.json", index.to_hex()))
    }
}

#[async_trait]
impl MapBackend for FileMap {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    async fn get_leaves(
        &self,
        map_id: i64,
        indices: &[StoreIndex],
    ) -> Result<Vec<MapLeafInclusion>, BackendError> {
        let mut out = Vec::with_capacity(indices.len());
        for index in indices {
            let leaf_value = match tokio::fs::read(self.leaf_path(map_id, index)).await {
                Ok(bytes) => Some(bytes),
                Err(e) if e.kind() == ErrorKind::NotFound => None,
                Err(e) => return Err(e.into()),
            };
            out.push(MapLeafInclusion {
                index: *index,
                leaf_value,
            });
        }
        Ok(out)
    }

    async fn set_leaves(&self, map_id: i64, leaves: Vec<MapLeaf>) -> Result<(), BackendError> {
        let dir = self.map_dir(map_id);
        tokio::fs::create_dir_all(&dir).await?;

        for leaf in leaves {
            let path = self.leaf_path(map_id, &leaf.index);
            let tmp = path.with_extension("json.tmp");
            tokio::fs::write(&tmp, &leaf.leaf_value).await?;
            tokio::fs::rename(&tmp, &path).await?;
        }
        Ok(())
    }
}
