use serde::{Deserialize, Serialize};

use crate::{Entry, Item};

/// Materialized state for one key: the most recently accepted Entry and the
/// Items observed under it, in first-seen order, without structural duplicates.
///
/// Wire shape: `{"Entry": {...}, "Items": [{...}, ...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RecordWire")]
pub struct Record {
    #[serde(rename = "Entry")]
    entry: Entry,
    #[serde(rename = "Items")]
    items: Vec<Item>,
}

impl Record {
    /// A fresh record holding exactly one item.
    pub fn new(entry: Entry, item: Item) -> Self {
        Self {
            entry,
            items: vec![item],
        }
    }

    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    pub fn key(&self) -> &str {
        self.entry.key()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn contains(&self, item: &Item) -> bool {
        self.items.iter().any(|i| i == item)
    }

    /// Append `item` unless a structurally-equal item is already present.
    /// Returns `true` when the item was appended.
    pub fn add(&mut self, item: Item) -> bool {
        if self.contains(&item) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn into_parts(self) -> (Entry, Vec<Item>) {
        (self.entry, self.items)
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Decode-side shape. `Items: null` (or missing) reads as no items, and
/// duplicates written by an older writer collapse onto their first occurrence.
#[derive(Deserialize)]
struct RecordWire {
    #[serde(rename = "Entry")]
    entry: Entry,
    #[serde(rename = "Items", default)]
    items: Option<Vec<Item>>,
}

impl From<RecordWire> for Record {
    fn from(w: RecordWire) -> Self {
        let mut record = Record {
            entry: w.entry,
            items: Vec::new(),
        };
        for item in w.items.unwrap_or_default() {
            record.add(item);
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(ts: &str) -> Entry {
        Entry::new("k1", ts).unwrap()
    }

    fn item(v: serde_json::Value) -> Item {
        Item::try_from(v).unwrap()
    }

    #[test]
    fn add_keeps_first_occurrence_and_order() {
        let mut r = Record::new(entry("2020-01-01T00:00:00Z"), item(json!({"v": 1})));
        assert!(r.add(item(json!({"v": 2}))));
        assert!(!r.add(item(json!({"v": 1}))));
        assert!(r.add(item(json!({"v": 3}))));

        let vs: Vec<_> = r.items().iter().map(|i| i.get("v").cloned()).collect();
        assert_eq!(vs, vec![Some(json!(1)), Some(json!(2)), Some(json!(3))]);
    }

    #[test]
    fn wire_shape_matches_exchange_format() {
        let r = Record::new(entry("2020-01-01T00:00:00Z"), item(json!({"v": 1})));
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(
            v,
            json!({
                "Entry": {"key": "k1", "entry-timestamp": "2020-01-01T00:00:00Z"},
                "Items": [{"v": 1}],
            })
        );
    }

    #[test]
    fn bytes_round_trip() {
        let mut r = Record::new(
            entry("2020-01-01T00:00:00Z")
                .with_field("entry-number", json!(12))
                .unwrap(),
            item(json!({"name": "x"})),
        );
        r.add(item(json!({"name": "y", "tags": ["a", "b"]})));

        let back = Record::from_json_bytes(&r.to_json_bytes().unwrap()).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn null_items_decode_as_empty() {
        let raw = br#"{"Entry":{"key":"k1","entry-timestamp":"2020-01-01T00:00:00Z"},"Items":null}"#;
        let r = Record::from_json_bytes(raw).unwrap();
        assert!(r.items().is_empty());
    }

    #[test]
    fn stored_duplicates_collapse_on_decode() {
        let raw = br#"{"Entry":{"key":"k1","entry-timestamp":"2020-01-01T00:00:00Z"},"Items":[{"v":1},{"v":1.0},{"v":2}]}"#;
        let r = Record::from_json_bytes(raw).unwrap();
        assert_eq!(r.items().len(), 2);
    }

    #[test]
    fn stored_entry_is_validated() {
        let raw = br#"{"Entry":{"key":"k1","entry-timestamp":"not a time"},"Items":[]}"#;
        assert!(Record::from_json_bytes(raw).is_err());
    }
}
