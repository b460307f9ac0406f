use std::cmp::Ordering;

use regmap_schemas::{Entry, Item, Record};

use crate::Outcome;

/// Reconcile one observation against the key's current record.
///
/// `current` must be the record stored for `entry.key()` (or `None`); the
/// engine does not check that the keys match.
pub fn reconcile(current: Option<Record>, entry: Entry, item: Item) -> Outcome {
    let Some(mut record) = current else {
        return Outcome::Created(Record::new(entry, item));
    };

    match entry
        .timestamp()
        .cmp_instant(record.entry().timestamp())
    {
        Ordering::Less => Outcome::Stale {
            stored: record.entry().timestamp().clone(),
            observed: entry.timestamp().clone(),
        },
        Ordering::Greater => Outcome::Replaced {
            discarded: record.items().len(),
            record: Record::new(entry, item),
        },
        Ordering::Equal => {
            // The stored Entry wins on ties; the observed one is dropped.
            let appended = record.add(item);
            Outcome::Merged { record, appended }
        }
    }
}
