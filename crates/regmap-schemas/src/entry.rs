use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt;

use crate::DecodeError;

pub const FIELD_KEY: &str = "key";
pub const FIELD_ENTRY_TIMESTAMP: &str = "entry-timestamp";

// ---------------------------------------------------------------------------
// Timestamp
// ---------------------------------------------------------------------------

/// RFC 3339 entry timestamp.
///
/// The original text is kept so a stored Entry serializes back byte-for-byte;
/// ordering uses the parsed UTC instant, so offsets are honoured
/// (`01:00:00+01:00` and `00:00:00Z` are the same instant).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryTimestamp {
    raw: String,
    instant: DateTime<Utc>,
}

impl EntryTimestamp {
    pub fn parse(raw: impl Into<String>) -> Result<Self, DecodeError> {
        let raw = raw.into();
        let instant = DateTime::parse_from_rfc3339(&raw)
            .map_err(|e| DecodeError::BadTimestamp {
                value: raw.clone(),
                reason: e.to_string(),
            })?
            .with_timezone(&Utc);
        Ok(Self { raw, instant })
    }

    /// The timestamp exactly as it appeared on the wire.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Three-way comparison of the instants (not the text).
    pub fn cmp_instant(&self, other: &EntryTimestamp) -> Ordering {
        self.instant.cmp(&other.instant)
    }
}

impl fmt::Display for EntryTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for EntryTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// Metadata describing one observation of a key at a point in time.
///
/// `key` and `entry-timestamp` are validated when the Entry is built; every
/// other field is carried opaquely in `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct Entry {
    key: String,
    #[serde(rename = "entry-timestamp")]
    entry_timestamp: EntryTimestamp,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl Entry {
    pub fn new(key: impl Into<String>, entry_timestamp: &str) -> Result<Self, DecodeError> {
        Ok(Self {
            key: key.into(),
            entry_timestamp: EntryTimestamp::parse(entry_timestamp)?,
            extra: Map::new(),
        })
    }

    /// Build an Entry from a decoded JSON object, pulling out and validating
    /// the two required fields.
    pub fn from_map(mut map: Map<String, Value>) -> Result<Self, DecodeError> {
        let key = match map.remove(FIELD_KEY) {
            Some(Value::String(s)) => s,
            Some(_) => {
                return Err(DecodeError::WrongType {
                    field: FIELD_KEY,
                    expected: "a string",
                })
            }
            None => return Err(DecodeError::MissingField { field: FIELD_KEY }),
        };

        let entry_timestamp = match map.remove(FIELD_ENTRY_TIMESTAMP) {
            Some(Value::String(s)) => EntryTimestamp::parse(s)?,
            Some(_) => {
                return Err(DecodeError::WrongType {
                    field: FIELD_ENTRY_TIMESTAMP,
                    expected: "an RFC 3339 string",
                })
            }
            None => {
                return Err(DecodeError::MissingField {
                    field: FIELD_ENTRY_TIMESTAMP,
                })
            }
        };

        Ok(Self {
            key,
            entry_timestamp,
            extra: map,
        })
    }

    /// Add (or replace) a passthrough field. Setting `key` or
    /// `entry-timestamp` through here re-validates them.
    pub fn with_field(self, name: &str, value: Value) -> Result<Self, DecodeError> {
        let mut map = self.into_map();
        map.insert(name.to_string(), value);
        Self::from_map(map)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn timestamp(&self) -> &EntryTimestamp {
        &self.entry_timestamp
    }

    /// Passthrough fields (never interpreted).
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    pub fn into_map(self) -> Map<String, Value> {
        let mut map = self.extra;
        map.insert(FIELD_KEY.to_string(), Value::String(self.key));
        map.insert(
            FIELD_ENTRY_TIMESTAMP.to_string(),
            Value::String(self.entry_timestamp.raw),
        );
        map
    }
}

impl TryFrom<Map<String, Value>> for Entry {
    type Error = DecodeError;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        Entry::from_map(map)
    }
}
