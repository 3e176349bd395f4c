//! `geosync-geo` — Planar geometry for the sync pipeline.
//!
//! Coordinate-convention validation, point-in-polygon filtering and strict
//! polygon lookup. All geometry lives in one fixed planar reference system;
//! nothing here reprojects.

pub mod error;
pub mod filter;
pub mod geometry;
pub mod source;
pub mod validator;

pub use error::GeoError;
pub use filter::PolygonFilter;
pub use geometry::{Crs, GeometryFactory, Polygon, S_JTSK};
pub use source::{GeoJsonPolygonSource, PolygonSource};
pub use validator::GeoValidator;

/// Canonical coordinate column names after extraction renaming.
pub const X_COLUMN: &str = "x";
pub const Y_COLUMN: &str = "y";
