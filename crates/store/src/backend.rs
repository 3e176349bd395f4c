use std::path::Path;

use geosync_core::Frame;
use geosync_recon::ReconPlan;

use crate::error::StoreError;
use crate::geojson::GeoJsonStore;
use crate::sqlite::SqliteStore;
use crate::RecordStore;

/// Storage backend selected at construction time from configuration.
/// Strategy dispatch over a closed set of variants; adding a backend means
/// adding a variant here.
pub enum StoreBackend {
    Sqlite(SqliteStore),
    GeoJson(GeoJsonStore),
}

impl StoreBackend {
    pub fn sqlite(path: &Path, table: &str) -> Result<Self, StoreError> {
        Ok(StoreBackend::Sqlite(SqliteStore::open(path, table)?))
    }

    pub fn geojson(path: &Path) -> Self {
        StoreBackend::GeoJson(GeoJsonStore::new(path))
    }
}

impl RecordStore for StoreBackend {
    fn load_all(&self, key: &str) -> Result<Frame, StoreError> {
        match self {
            StoreBackend::Sqlite(store) => store.load_all(key),
            StoreBackend::GeoJson(store) => store.load_all(key),
        }
    }

    fn commit(&mut self, plan: &ReconPlan) -> Result<(), StoreError> {
        match self {
            StoreBackend::Sqlite(store) => store.commit(plan),
            StoreBackend::GeoJson(store) => store.commit(plan),
        }
    }
}
