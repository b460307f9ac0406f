use regmap_log::{LogError, LogLeaf, LogSource};
use regmap_reconcile::{reconcile, Outcome, OutcomeKind};
use regmap_schemas::LeafPayload;
use regmap_store::RecordStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::{MapperError, StoreOp};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MapperOptions {
    pub log_id: i64,
    /// Leaves per range request. Delivery batching only; processing is per leaf.
    pub batch_size: u64,
}

/// Counters for one completed scan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub scan_id: Uuid,
    pub log_id: i64,
    pub leaves: u64,
    pub created: u64,
    pub replaced: u64,
    pub merged: u64,
    /// Merges whose item was already present.
    pub duplicates: u64,
    pub stale: u64,
}

impl ScanReport {
    fn new(scan_id: Uuid, log_id: i64) -> Self {
        Self {
            scan_id,
            log_id,
            leaves: 0,
            created: 0,
            replaced: 0,
            merged: 0,
            duplicates: 0,
            stale: 0,
        }
    }

    fn count(&mut self, kind: OutcomeKind) {
        self.leaves += 1;
        let slot = match kind {
            OutcomeKind::Created => &mut self.created,
            OutcomeKind::Replaced => &mut self.replaced,
            OutcomeKind::Merged => &mut self.merged,
            OutcomeKind::Duplicate => &mut self.duplicates,
            OutcomeKind::Stale => &mut self.stale,
        };
        *slot += 1;
    }

    /// Leaves that caused a store write.
    pub fn writes(&self) -> u64 {
        self.leaves - self.stale
    }
}

pub struct Mapper {
    log: Arc<dyn LogSource>,
    store: RecordStore,
    options: MapperOptions,
}

impl Mapper {
    pub fn new(log: Arc<dyn LogSource>, store: RecordStore, options: MapperOptions) -> Self {
        Self {
            log,
            store,
            options,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Scan the whole log from index 0, applying every leaf in order.
    pub async fn run(&self) -> Result<ScanReport, MapperError> {
        let scan_id = Uuid::new_v4();
        let span = info_span!("scan", %scan_id, log_id = self.options.log_id);
        self.scan(scan_id).instrument(span).await
    }

    async fn scan(&self, scan_id: Uuid) -> Result<ScanReport, MapperError> {
        let log_id = self.options.log_id;
        let batch_size = self.options.batch_size.max(1);
        let size = self.log.tree_size(log_id).await?;
        info!(
            source = self.log.source_name(),
            backend = self.store.backend_name(),
            map_id = self.store.map_id(),
            tree_size = size,
            "scan start"
        );

        let mut report = ScanReport::new(scan_id, log_id);
        let mut next: u64 = 0;
        while next < size {
            let want = batch_size.min(size - next);
            let batch = self.log.get_leaves_by_range(log_id, next, want).await?;
            if batch.is_empty() || batch.len() as u64 > want {
                return Err(LogError::Protocol(format!(
                    "asked for {want} leaves at {next}, got {}",
                    batch.len()
                ))
                .into());
            }

            for leaf in &batch {
                if leaf.leaf_index != next {
                    return Err(LogError::Protocol(format!(
                        "out-of-order delivery: expected leaf {next}, got {}",
                        leaf.leaf_index
                    ))
                    .into());
                }
                report.count(self.apply_leaf(leaf).await?);
                next += 1;
            }
        }

        info!(
            leaves = report.leaves,
            created = report.created,
            replaced = report.replaced,
            merged = report.merged,
            duplicates = report.duplicates,
            stale = report.stale,
            "scan complete"
        );
        Ok(report)
    }

    /// Decode one leaf, read the current record, reconcile, and write back.
    pub async fn apply_leaf(&self, leaf: &LogLeaf) -> Result<OutcomeKind, MapperError> {
        let leaf_index = leaf.leaf_index;
        let payload =
            LeafPayload::decode(&leaf.leaf_value).map_err(|source| MapperError::Decode {
                leaf_index,
                source,
            })?;
        let (entry, item) = payload.into_parts();
        let key = entry.key().to_string();
        debug!(leaf_index, key = %key, ts = %entry.timestamp(), "leaf");

        let current = self
            .store
            .get(&key)
            .await
            .map_err(|source| MapperError::Store {
                key: key.clone(),
                op: StoreOp::Get,
                source,
            })?;

        let outcome = reconcile(current, entry, item);
        let kind = outcome.kind();

        match &outcome {
            Outcome::Stale { stored, observed } => {
                debug!(leaf_index, key = %key, %stored, %observed, outcome = %kind, "stale entry");
            }
            Outcome::Replaced { discarded, .. } => {
                debug!(leaf_index, key = %key, discarded, outcome = %kind, "newer entry");
            }
            _ => debug!(leaf_index, key = %key, outcome = %kind, "apply"),
        }

        if let Some(record) = outcome.record_to_write() {
            self.store
                .set(&key, record)
                .await
                .map_err(|source| MapperError::Store {
                    key: key.clone(),
                    op: StoreOp::Set,
                    source,
                })?;
        }

        Ok(kind)
    }
}
