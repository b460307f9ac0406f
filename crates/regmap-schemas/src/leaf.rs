use serde::Serialize;
use serde_json::Value;

use crate::{DecodeError, Entry, Item};

pub const FIELD_ENTRY: &str = "Entry";
pub const FIELD_ITEM: &str = "Item";

/// Body of one log leaf: `{"Entry": {...}, "Item": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeafPayload {
    #[serde(rename = "Entry")]
    pub entry: Entry,
    #[serde(rename = "Item")]
    pub item: Item,
}

impl LeafPayload {
    pub fn new(entry: Entry, item: Item) -> Self {
        Self { entry, item }
    }

    /// Decode raw leaf bytes. Unknown top-level fields are ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let v: Value = serde_json::from_slice(bytes)?;
        let Value::Object(mut top) = v else {
            return Err(DecodeError::NotAnObject);
        };

        let entry = match top.remove(FIELD_ENTRY) {
            Some(Value::Object(m)) => Entry::from_map(m)?,
            Some(_) => {
                return Err(DecodeError::WrongType {
                    field: FIELD_ENTRY,
                    expected: "an object",
                })
            }
            None => return Err(DecodeError::MissingField { field: FIELD_ENTRY }),
        };

        let item = match top.remove(FIELD_ITEM) {
            Some(v @ Value::Object(_)) => Item::try_from(v)?,
            Some(_) => {
                return Err(DecodeError::WrongType {
                    field: FIELD_ITEM,
                    expected: "an object",
                })
            }
            None => return Err(DecodeError::MissingField { field: FIELD_ITEM }),
        };

        Ok(Self { entry, item })
    }

    /// Compact JSON, suitable for one line of a JSONL log.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn into_parts(self) -> (Entry, Item) {
        (self.entry, self.item)
    }
}
