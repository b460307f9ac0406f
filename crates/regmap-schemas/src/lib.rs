//! regmap-schemas
//!
//! Data model shared by every regmap crate:
//! - `Entry`: metadata about one observation of a key (key + entry-timestamp + passthrough fields)
//! - `Item`: opaque payload observed under an Entry
//! - `Record`: materialized per-key state (one Entry + deduplicated Items)
//! - `LeafPayload`: the `{"Entry": .., "Item": ..}` body of one log leaf
//!
//! Validation happens once, at decode time. Everything past the decoder works
//! with typed values.

mod entry;
mod error;
mod item;
mod leaf;
mod record;

pub use entry::{Entry, EntryTimestamp, FIELD_ENTRY_TIMESTAMP, FIELD_KEY};
pub use error::DecodeError;
pub use item::{structurally_equal, Item};
pub use leaf::{LeafPayload, FIELD_ENTRY, FIELD_ITEM};
pub use record::Record;
