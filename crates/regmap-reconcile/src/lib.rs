//! regmap-reconcile
//!
//! Reconciliation Engine: decides the next state of a key's Record given a
//! newly observed (Entry, Item) and whatever is currently stored.
//!
//! Policy (timestamps act as a coarse logical clock):
//! - No stored record => create
//! - Observed timestamp older than stored => stale, nothing is written
//! - Observed timestamp newer than stored => replace, earlier items dropped
//! - Same timestamp => merge, item appended unless already present
//!
//! Deterministic, pure logic. No IO. The caller persists the outcome.

mod engine;
mod types;

pub use engine::reconcile;
pub use types::*;
