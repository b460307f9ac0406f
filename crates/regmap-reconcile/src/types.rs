use regmap_schemas::{EntryTimestamp, Record};
use serde::Serialize;
use std::fmt;

/// What the engine decided for one observation.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// No record existed; a new one holds the observed entry and item.
    Created(Record),

    /// A strictly newer entry superseded the stored one.
    /// `discarded` is the number of items dropped with the old entry.
    Replaced { record: Record, discarded: usize },

    /// Same entry timestamp; `appended` is false when the item was already present.
    /// The record is persisted either way.
    Merged { record: Record, appended: bool },

    /// Observation is older than the stored entry. Nothing to write.
    Stale {
        stored: EntryTimestamp,
        observed: EntryTimestamp,
    },
}

impl Outcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Created(_) => OutcomeKind::Created,
            Outcome::Replaced { .. } => OutcomeKind::Replaced,
            Outcome::Merged { appended: true, .. } => OutcomeKind::Merged,
            Outcome::Merged {
                appended: false, ..
            } => OutcomeKind::Duplicate,
            Outcome::Stale { .. } => OutcomeKind::Stale,
        }
    }

    /// The record the caller must write back, or `None` for a stale no-op.
    pub fn record_to_write(&self) -> Option<&Record> {
        match self {
            Outcome::Created(record)
            | Outcome::Replaced { record, .. }
            | Outcome::Merged { record, .. } => Some(record),
            Outcome::Stale { .. } => None,
        }
    }

    pub fn into_record(self) -> Option<Record> {
        match self {
            Outcome::Created(record)
            | Outcome::Replaced { record, .. }
            | Outcome::Merged { record, .. } => Some(record),
            Outcome::Stale { .. } => None,
        }
    }

    pub fn is_write(&self) -> bool {
        self.record_to_write().is_some()
    }
}

/// Flat classification of an [`Outcome`], used for counters and log lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Created,
    Replaced,
    Merged,
    /// Merge whose item was already present (record rewritten unchanged).
    Duplicate,
    Stale,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Created => "create",
            OutcomeKind::Replaced => "replace",
            OutcomeKind::Merged => "add",
            OutcomeKind::Duplicate => "duplicate",
            OutcomeKind::Stale => "skip",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
