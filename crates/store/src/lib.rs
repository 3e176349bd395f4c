//! `geosync-store` — Persistent record stores.
//!
//! A [`RecordStore`] loads committed state and applies reconciliation plans
//! atomically: the insert set and the masked update set of one plan land in
//! a single all-or-nothing step, so a crash can never leave a batch half
//! applied. Two backends, selected by configuration: SQLite for row stores
//! and a whole-file GeoJSON store for spatial exports.

pub mod backend;
pub mod error;
pub mod geojson;
pub mod sqlite;

pub use backend::StoreBackend;
pub use error::StoreError;
pub use geojson::GeoJsonStore;
pub use sqlite::SqliteStore;

use geosync_core::Frame;
use geosync_recon::ReconPlan;

/// Synchronous call boundary between the reconciliation core and durable
/// state. `load_all` returns an empty frame when nothing has been committed
/// yet; `commit` is atomic — success applies the whole plan, failure
/// applies none of it.
pub trait RecordStore {
    fn load_all(&self, key: &str) -> Result<Frame, StoreError>;
    fn commit(&mut self, plan: &ReconPlan) -> Result<(), StoreError>;
}
