//! regmap-runtime
//!
//! The mapper: reads log leaves in order and folds each one into the record
//! store through the reconciliation engine.
//!
//! One scan is strictly sequential. Leaf `n + 1` is not read from the store
//! until the write for leaf `n` has completed, so a later leaf always sees the
//! effect of an earlier one for the same key.

mod error;
mod mapper;
mod wiring;

pub use error::{MapperError, StoreOp};
pub use mapper::{Mapper, MapperOptions, ScanReport};
pub use wiring::build_mapper;
