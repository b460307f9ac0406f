//! regmap-log
//!
//! Boundary to the append-only log that regmap projects from.
//!
//! The log itself is an external collaborator; this crate only defines how
//! leaves are read from it (`LogSource`) and ships two simple sources:
//! `MemoryLog` for tests and `JsonlLog` for logs kept as JSON Lines files
//! (one leaf payload per line). `LeafWriter` appends to such a file.

mod jsonl;
mod memory;
mod source;

pub use jsonl::{JsonlLog, LeafWriter};
pub use memory::MemoryLog;
pub use source::{LogError, LogLeaf, LogSource};
