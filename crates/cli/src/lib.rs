//! `geosync-cli` — The sync workflow.
//!
//! Thin orchestration over the engine crates: per configured unit, extract →
//! validate/filter (spatial sources) → reconcile → commit. A unit failure is
//! logged and isolated; the run moves on to the next unit.

pub mod error;
pub mod sync;

pub use error::SyncError;
pub use sync::{run, RunSummary, UnitOutcome};
