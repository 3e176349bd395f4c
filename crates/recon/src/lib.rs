//! `geosync-recon` — Incremental reconciliation (upsert) engine.
//!
//! Pure engine crate: receives the persisted frame and a freshly extracted
//! batch, returns a commit plan. No IO dependencies; storage backends apply
//! the plan.

pub mod engine;
pub mod error;
pub mod merge;
pub mod model;

pub use engine::reconcile;
pub use error::ReconError;
pub use merge::{merge, split_columns};
pub use model::{ColumnPartition, MergeOutcome, ReconPlan};
