use geosync_core::{Frame, Record};

use crate::geometry::GeometryFactory;
use crate::{X_COLUMN, Y_COLUMN};

/// Classifies point records under the project's coordinate convention.
///
/// In the S-JTSK area of interest a correctly-ordered coordinate pair always
/// has x (easting) greater than y (northing). A point failing that check has
/// its axes swapped somewhere upstream; the caller swaps once, re-validates,
/// and drops whatever still fails.
#[derive(Debug, Clone, Copy)]
pub struct GeoValidator {
    factory: GeometryFactory,
}

impl GeoValidator {
    pub fn new(factory: GeometryFactory) -> Self {
        GeoValidator { factory }
    }

    /// Split into (valid, invalid) by the x > y convention. Rows without
    /// geometry are excluded from both sides entirely.
    pub fn validate(&self, frame: &Frame) -> (Frame, Frame) {
        let with_geometry = frame.filter(|r| r.has_geometry());
        with_geometry.partition(|r| matches!(r.geometry, Some(g) if g.x > g.y))
    }

    /// A copy of the frame with x/y field values exchanged and geometry
    /// regenerated from the swapped coordinates. Input is untouched.
    pub fn swap(&self, frame: &Frame) -> Frame {
        let mut out = Frame::with_columns(frame.columns().iter().cloned());
        for row in frame.rows() {
            out.push(self.swap_record(row));
        }
        out
    }

    fn swap_record(&self, record: &Record) -> Record {
        let mut swapped = record.clone();
        let x = swapped.remove(X_COLUMN);
        let y = swapped.remove(Y_COLUMN);
        swapped.set(X_COLUMN, y);
        swapped.set(Y_COLUMN, x);

        swapped.geometry = match (
            swapped.get(X_COLUMN).as_f64(),
            swapped.get(Y_COLUMN).as_f64(),
        ) {
            (Some(x), Some(y)) => Some(self.factory.from_xy(x, y)),
            _ => None,
        };
        swapped
    }

    /// Attach geometry built from the x/y columns. Rows whose coordinates
    /// are absent or non-numeric keep `geometry: None`.
    pub fn add_geometry(&self, frame: &Frame) -> Frame {
        let mut out = Frame::with_columns(frame.columns().iter().cloned());
        for row in frame.rows() {
            let mut row = row.clone();
            row.geometry = match (row.get(X_COLUMN).as_f64(), row.get(Y_COLUMN).as_f64()) {
                (Some(x), Some(y)) => Some(self.factory.from_xy(x, y)),
                _ => None,
            };
            out.push(row);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::S_JTSK;
    use geosync_core::Value as V;

    fn validator() -> GeoValidator {
        GeoValidator::new(GeometryFactory::new(S_JTSK))
    }

    fn point_row(id: i64, x: f64, y: f64) -> Record {
        Record::new()
            .with("id", id)
            .with(X_COLUMN, x)
            .with(Y_COLUMN, y)
            .with_geometry(x, y)
    }

    #[test]
    fn splits_on_easting_convention() {
        let mut f = Frame::new();
        f.push(point_row(1, 50.0, 10.0));
        f.push(point_row(2, 10.0, 50.0));
        let (valid, invalid) = validator().validate(&f);
        assert_eq!(valid.len(), 1);
        assert_eq!(invalid.len(), 1);
        assert_eq!(valid.row(0).get("id"), &V::Int(1));
        assert_eq!(invalid.row(0).get("id"), &V::Int(2));
    }

    #[test]
    fn absent_geometry_excluded_from_both_sides() {
        let mut f = Frame::new();
        f.push(point_row(1, 50.0, 10.0));
        f.push(Record::new().with("id", 2i64));
        let (valid, invalid) = validator().validate(&f);
        assert_eq!(valid.len() + invalid.len(), 1);
    }

    #[test]
    fn swap_corrects_and_is_pure() {
        let mut f = Frame::new();
        f.push(point_row(1, 10.0, 50.0));

        let v = validator();
        let swapped = v.swap(&f);
        let g = swapped.row(0).geometry.unwrap();
        assert_eq!(g.x, 50.0);
        assert_eq!(g.y, 10.0);
        assert_eq!(swapped.row(0).get(X_COLUMN), &V::from(50.0));
        assert_eq!(swapped.row(0).get(Y_COLUMN), &V::from(10.0));

        // input untouched
        assert_eq!(f.row(0).geometry.unwrap().x, 10.0);

        let (valid, invalid) = v.validate(&swapped);
        assert_eq!(valid.len(), 1);
        assert!(invalid.is_empty());
    }

    #[test]
    fn add_geometry_skips_non_numeric_coordinates() {
        let mut f = Frame::new();
        f.push(
            Record::new()
                .with("id", 1i64)
                .with(X_COLUMN, 50.0)
                .with(Y_COLUMN, 10.0),
        );
        f.push(Record::new().with("id", 2i64).with(X_COLUMN, "bad"));
        let out = validator().add_geometry(&f);
        assert!(out.row(0).has_geometry());
        assert!(!out.row(1).has_geometry());
    }
}
