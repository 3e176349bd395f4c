use log::debug;

use geosync_core::Frame;

use crate::geometry::Polygon;

/// Point-in-region filtering against one reference polygon.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolygonFilter;

impl PolygonFilter {
    pub fn new() -> Self {
        PolygonFilter
    }

    /// Rows whose point lies within or on the boundary of the polygon.
    /// Rows without geometry are excluded first, mirroring validation.
    pub fn filter(&self, frame: &Frame, polygon: &Polygon) -> Frame {
        let with_geometry = frame.filter(|r| r.has_geometry());
        let kept = with_geometry.filter(|r| matches!(r.geometry, Some(p) if polygon.contains(p)));
        debug!(
            "polygon filter kept {} of {} entries",
            kept.len(),
            frame.len()
        );
        kept
    }
}
