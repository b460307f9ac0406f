//! regmap-store
//!
//! Content-addressed Record storage over an external key-value map.
//!
//! - `StoreIndex`: SHA-256 of the key, the only address the map ever sees
//! - `MapBackend`: the map service boundary (batch get/set of index -> bytes)
//! - `RecordStore`: one Record per key; every call is one backend round trip,
//!   nothing is cached between calls
//!
//! Two backends live here (`MemoryMap`, `FileMap`); the Postgres one lives in
//! `regmap-db`.

mod backend;
mod file_map;
mod index;
mod memory;
mod store;

pub use backend::{BackendError, MapBackend, MapLeaf, MapLeafInclusion};
pub use file_map::FileMap;
pub use index::StoreIndex;
pub use memory::MemoryMap;
pub use store::{EmptyLeafPolicy, RecordStore, StoreError};
