//! `geosync-config` — Immutable, validated run configuration.
//!
//! One TOML file describes the store backend, the polygon filter, the file
//! sources with their extraction options, the remote APIs and the archive
//! scrapers. Components receive the parsed structure by reference; there is
//! no ambient global configuration.

pub mod error;
pub mod settings;

pub use error::ConfigError;
pub use settings::{
    ApiConfig, Config, CoordinateColumns, DateConfig, ExtractorKind, LogConfig,
    PolygonFilterConfig, ScraperConfig, SourceConfig, StoreBackendKind, StoreConfig,
};
