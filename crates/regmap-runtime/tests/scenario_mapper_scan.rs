//! Scenario: end-to-end scans over a log
//!
//! # Invariants under test
//!
//! 1. Scanning the example log settles "k1" on the newest entry with only its item.
//! 2. A stale leaf reads the store but never writes it.
//! 3. An undecodable leaf aborts the scan naming its index; earlier writes stand,
//!    later leaves are not applied.
//! 4. Re-running a scan over the same log leaves the store unchanged.
//! 5. Gaps or reordering from the log source abort the scan as a log error.
//! 6. `batch_size` changes how leaves are fetched, never the result.
//! 7. Store failures name the key and the operation.
//! 8. Keys are independent: interleaved keys reconcile separately.
//! 9. A stored record filed under the wrong key aborts the scan at the read.
//! 10. Over a JSONL log, scan I/O stays linear in the file size for any batch size.

use async_trait::async_trait;
use regmap_log::{JsonlLog, LeafWriter, LogError, LogLeaf, LogSource, MemoryLog};
use regmap_runtime::{Mapper, MapperError, MapperOptions, StoreOp};
use regmap_schemas::{Entry, Item, LeafPayload, Record};
use regmap_store::{
    BackendError, FileMap, MapBackend, MapLeaf, MapLeafInclusion, MemoryMap, RecordStore,
    StoreError, StoreIndex,
};
use serde_json::{json, Value};
use std::sync::Arc;

const LOG_ID: i64 = 3;
const MAP_ID: i64 = 4;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn leaf(key: &str, ts: &str, item: Value) -> Vec<u8> {
    LeafPayload::new(Entry::new(key, ts).unwrap(), Item::try_from(item).unwrap())
        .encode()
        .unwrap()
}

fn example_log() -> Vec<Vec<u8>> {
    vec![
        leaf("k1", "2020-01-01T00:00:00Z", json!({"v": 1})),
        leaf("k1", "2020-01-01T00:00:00Z", json!({"v": 2})),
        leaf("k1", "2019-01-01T00:00:00Z", json!({"v": 99})),
        leaf("k1", "2021-01-01T00:00:00Z", json!({"v": 3})),
    ]
}

fn mapper(log: Arc<dyn LogSource>, map: Arc<dyn MapBackend>, batch_size: u64) -> Mapper {
    Mapper::new(
        log,
        RecordStore::new(map, MAP_ID),
        MapperOptions {
            log_id: LOG_ID,
            batch_size,
        },
    )
}

fn values(r: &Record) -> Vec<Value> {
    r.items()
        .iter()
        .map(|i| i.get("v").cloned().unwrap_or(Value::Null))
        .collect()
}

/// Log source that reports two leaves but hands them back swapped.
struct SwappedLog;

#[async_trait]
impl LogSource for SwappedLog {
    fn source_name(&self) -> &'static str {
        "swapped"
    }

    async fn tree_size(&self, _log_id: i64) -> Result<u64, LogError> {
        Ok(2)
    }

    async fn get_leaves_by_range(
        &self,
        _log_id: i64,
        _start: u64,
        _count: u64,
    ) -> Result<Vec<LogLeaf>, LogError> {
        Ok(vec![
            LogLeaf::new(1, leaf("a", "2020-01-01T00:00:00Z", json!({"v": 1}))),
            LogLeaf::new(0, leaf("b", "2020-01-01T00:00:00Z", json!({"v": 2}))),
        ])
    }
}

/// Log source that claims leaves exist but returns none.
struct HollowLog;

#[async_trait]
impl LogSource for HollowLog {
    fn source_name(&self) -> &'static str {
        "hollow"
    }

    async fn tree_size(&self, _log_id: i64) -> Result<u64, LogError> {
        Ok(5)
    }

    async fn get_leaves_by_range(
        &self,
        _log_id: i64,
        _start: u64,
        _count: u64,
    ) -> Result<Vec<LogLeaf>, LogError> {
        Ok(Vec::new())
    }
}

/// Map that reads fine (always empty) but refuses writes.
struct ReadOnlyMap;

#[async_trait]
impl MapBackend for ReadOnlyMap {
    fn backend_name(&self) -> &'static str {
        "read-only"
    }

    async fn get_leaves(
        &self,
        _map_id: i64,
        indices: &[StoreIndex],
    ) -> Result<Vec<MapLeafInclusion>, BackendError> {
        Ok(indices
            .iter()
            .map(|index| MapLeafInclusion {
                index: *index,
                leaf_value: None,
            })
            .collect())
    }

    async fn set_leaves(&self, _map_id: i64, _leaves: Vec<MapLeaf>) -> Result<(), BackendError> {
        Err(BackendError::Transport("read-only".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn example_log_settles_on_newest_entry() {
    let map = Arc::new(MemoryMap::new());
    let m = mapper(
        Arc::new(MemoryLog::with_leaves(LOG_ID, example_log())),
        map.clone(),
        256,
    );

    let report = m.run().await.unwrap();
    assert_eq!(report.log_id, LOG_ID);
    assert_eq!(report.leaves, 4);
    assert_eq!(
        (report.created, report.merged, report.stale, report.replaced),
        (1, 1, 1, 1)
    );

    let rec = m.store().get("k1").await.unwrap().unwrap();
    assert_eq!(rec.entry().timestamp().as_str(), "2021-01-01T00:00:00Z");
    assert_eq!(values(&rec), vec![json!(3)]);
}

#[tokio::test]
async fn stale_leaf_never_writes() {
    let map = Arc::new(MemoryMap::new());
    let m = mapper(
        Arc::new(MemoryLog::with_leaves(
            LOG_ID,
            vec![
                leaf("k", "2020-01-01T00:00:00Z", json!({"v": 1})),
                leaf("k", "2010-01-01T00:00:00Z", json!({"v": 2})),
            ],
        )),
        map.clone(),
        10,
    );

    let report = m.run().await.unwrap();
    assert_eq!(report.stale, 1);
    assert_eq!(map.get_calls(), 2, "every leaf reads the store once");
    assert_eq!(map.set_calls(), 1, "only the first leaf writes");
}

#[tokio::test]
async fn undecodable_leaf_aborts_with_its_index() {
    let map = Arc::new(MemoryMap::new());
    let m = mapper(
        Arc::new(MemoryLog::with_leaves(
            LOG_ID,
            vec![
                leaf("a", "2020-01-01T00:00:00Z", json!({"v": 1})),
                br#"{"Entry":{"key":"b","entry-timestamp":"yesterday"},"Item":{}}"#.to_vec(),
                leaf("c", "2020-01-01T00:00:00Z", json!({"v": 3})),
            ],
        )),
        map.clone(),
        256,
    );

    let err = m.run().await.unwrap_err();
    assert!(
        matches!(err, MapperError::Decode { leaf_index: 1, .. }),
        "got {err:?}"
    );
    assert_eq!(err.leaf_index(), Some(1));
    assert!(err.to_string().contains("leaf 1"));

    assert!(m.store().get("a").await.unwrap().is_some());
    assert!(m.store().get("c").await.unwrap().is_none());
}

#[tokio::test]
async fn rescan_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let map: Arc<dyn MapBackend> = Arc::new(FileMap::new(dir.path()));
    let mut log = example_log();
    log.push(leaf("k2", "2020-06-01T00:00:00Z", json!({"v": "x"})));
    log.push(leaf("k2", "2020-06-01T00:00:00Z", json!({"v": "y"})));
    let m = mapper(Arc::new(MemoryLog::with_leaves(LOG_ID, log)), map, 2);

    m.run().await.unwrap();
    let k1 = m.store().get("k1").await.unwrap();
    let k2 = m.store().get("k2").await.unwrap();

    let second = m.run().await.unwrap();
    assert_eq!(m.store().get("k1").await.unwrap(), k1);
    assert_eq!(m.store().get("k2").await.unwrap(), k2);
    assert_eq!(second.created, 0);
    assert_eq!(second.replaced, 0);
    assert_eq!(second.merged, 0, "replay must not append anything");
}

#[tokio::test]
async fn reordered_delivery_is_a_log_error() {
    let m = mapper(Arc::new(SwappedLog), Arc::new(MemoryMap::new()), 10);
    let err = m.run().await.unwrap_err();
    assert!(
        matches!(&err, MapperError::Log(LogError::Protocol(msg)) if msg.contains("expected leaf 0")),
        "got {err:?}"
    );
}

#[tokio::test]
async fn hollow_log_is_a_log_error() {
    let m = mapper(Arc::new(HollowLog), Arc::new(MemoryMap::new()), 10);
    assert!(matches!(
        m.run().await.unwrap_err(),
        MapperError::Log(LogError::Protocol(_))
    ));
}

#[tokio::test]
async fn batch_size_does_not_change_the_result() {
    let mut log = example_log();
    for i in 0..7 {
        log.push(leaf(
            &format!("key-{}", i % 3),
            "2020-01-01T00:00:00Z",
            json!({ "i": i }),
        ));
    }

    let mut finals = Vec::new();
    for batch in [1, 3, 1000] {
        let map = Arc::new(MemoryMap::new());
        let m = mapper(
            Arc::new(MemoryLog::with_leaves(LOG_ID, log.clone())),
            map,
            batch,
        );
        let report = m.run().await.unwrap();
        assert_eq!(report.leaves, 11);

        let mut snapshot = Vec::new();
        for key in ["k1", "key-0", "key-1", "key-2"] {
            snapshot.push(m.store().get(key).await.unwrap());
        }
        finals.push(snapshot);
    }
    assert_eq!(finals[0], finals[1]);
    assert_eq!(finals[1], finals[2]);
}

#[tokio::test]
async fn store_write_failure_names_key_and_op() {
    let m = mapper(
        Arc::new(MemoryLog::with_leaves(
            LOG_ID,
            vec![leaf("GB", "2016-04-05T13:23:05Z", json!({"name": "UK"}))],
        )),
        Arc::new(ReadOnlyMap),
        10,
    );

    match m.run().await.unwrap_err() {
        MapperError::Store { key, op, source } => {
            assert_eq!(key, "GB");
            assert_eq!(op, StoreOp::Set);
            assert!(matches!(source, StoreError::Backend(_)));
        }
        other => panic!("expected Store error, got {other:?}"),
    }
}

#[tokio::test]
async fn interleaved_keys_reconcile_independently() {
    let map = Arc::new(MemoryMap::new());
    let m = mapper(
        Arc::new(MemoryLog::with_leaves(
            LOG_ID,
            vec![
                leaf("a", "2020-01-01T00:00:00Z", json!({"v": 1})),
                leaf("b", "2022-01-01T00:00:00Z", json!({"v": 1})),
                leaf("a", "2021-01-01T00:00:00Z", json!({"v": 2})),
                leaf("b", "2020-01-01T00:00:00Z", json!({"v": 2})),
                leaf("a", "2021-01-01T00:00:00Z", json!({"v": 2})),
            ],
        )),
        map,
        2,
    );

    let report = m.run().await.unwrap();
    assert_eq!(report.duplicates, 1);

    let a = m.store().get("a").await.unwrap().unwrap();
    let b = m.store().get("b").await.unwrap().unwrap();
    assert_eq!(values(&a), vec![json!(2)]);
    assert_eq!(values(&b), vec![json!(1)]);
    assert_eq!(b.entry().timestamp().as_str(), "2022-01-01T00:00:00Z");
}

#[tokio::test]
async fn empty_log_is_an_empty_scan() {
    let map = Arc::new(MemoryMap::new());
    let m = mapper(Arc::new(MemoryLog::new()), map.clone(), 8);
    let report = m.run().await.unwrap();
    assert_eq!(report.leaves, 0);
    assert_eq!(map.get_calls(), 0);
}

#[tokio::test]
async fn jsonl_scan_reads_linear_bytes_for_any_batch_size() {
    let dir = tempfile::tempdir().unwrap();
    let mut w = LeafWriter::open(dir.path(), LOG_ID).unwrap();
    for i in 0..300 {
        w.append_raw(&leaf(
            &format!("k{}", i % 7),
            "2020-01-01T00:00:00Z",
            json!({ "i": i }),
        ))
        .unwrap();
    }
    let file_len = std::fs::metadata(w.path()).unwrap().len();

    for batch in [1, 300] {
        let log = Arc::new(JsonlLog::new(dir.path()));
        let m = mapper(log.clone(), Arc::new(MemoryMap::new()), batch);
        assert_eq!(m.run().await.unwrap().leaves, 300);
        assert!(
            log.bytes_read() <= 2 * file_len,
            "batch {batch}: read {} bytes of a {file_len}-byte log",
            log.bytes_read()
        );
    }
}

#[tokio::test]
async fn foreign_stored_record_aborts_at_read() {
    let map = Arc::new(MemoryMap::new());
    let foreign = Record::new(
        Entry::new("other", "2020-01-01T00:00:00Z").unwrap(),
        Item::try_from(json!({"v": 1})).unwrap(),
    );
    map.insert_raw(MAP_ID, StoreIndex::for_key("k"), foreign.to_json_bytes().unwrap())
        .await;
    let m = mapper(
        Arc::new(MemoryLog::with_leaves(
            LOG_ID,
            vec![leaf("k", "2020-01-01T00:00:00Z", json!({"v": 2}))],
        )),
        map.clone(),
        10,
    );

    match m.run().await.unwrap_err() {
        MapperError::Store { key, op, source } => {
            assert_eq!(key, "k");
            assert_eq!(op, StoreOp::Get);
            assert!(matches!(source, StoreError::KeyMismatch { .. }));
        }
        other => panic!("expected Store error, got {other:?}"),
    }
    assert_eq!(map.set_calls(), 0);
}
