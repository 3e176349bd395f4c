use std::fmt;

use geosync_config::ConfigError;
use geosync_geo::GeoError;
use geosync_io::ExtractError;
use geosync_recon::ReconError;
use geosync_store::StoreError;

/// Unit-level failure: any stage of one unit's pipeline. The workflow
/// records it and continues with the next unit.
#[derive(Debug)]
pub enum SyncError {
    Config(ConfigError),
    Extract(ExtractError),
    Geo(GeoError),
    Recon(ReconError),
    Store(StoreError),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "{e}"),
            Self::Extract(e) => write!(f, "{e}"),
            Self::Geo(e) => write!(f, "{e}"),
            Self::Recon(e) => write!(f, "{e}"),
            Self::Store(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SyncError {}

impl From<ConfigError> for SyncError {
    fn from(e: ConfigError) -> Self {
        SyncError::Config(e)
    }
}

impl From<ExtractError> for SyncError {
    fn from(e: ExtractError) -> Self {
        SyncError::Extract(e)
    }
}

impl From<GeoError> for SyncError {
    fn from(e: GeoError) -> Self {
        SyncError::Geo(e)
    }
}

impl From<ReconError> for SyncError {
    fn from(e: ReconError) -> Self {
        SyncError::Recon(e)
    }
}

impl From<StoreError> for SyncError {
    fn from(e: StoreError) -> Self {
        SyncError::Store(e)
    }
}
