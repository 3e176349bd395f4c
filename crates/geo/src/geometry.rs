use serde::{Deserialize, Serialize};

use geosync_core::PointXY;

/// Numeric reference-system code (EPSG style). Purely a tag: geometry,
/// polygons and validation all assume coordinates already share one CRS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crs(pub u32);

/// S-JTSK / Krovak East North, the projected system the area-of-interest
/// convention (easting > northing) is defined against.
pub const S_JTSK: Crs = Crs(5514);

/// Constructs point geometry from raw coordinates in a fixed CRS.
#[derive(Debug, Clone, Copy)]
pub struct GeometryFactory {
    crs: Crs,
}

impl GeometryFactory {
    pub fn new(crs: Crs) -> Self {
        GeometryFactory { crs }
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn from_xy(&self, x: f64, y: f64) -> PointXY {
        PointXY::new(x, y)
    }
}

/// A single closed planar region: exterior ring plus optional holes.
/// Rings need not repeat their first vertex; closure is implied.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    exterior: Vec<PointXY>,
    holes: Vec<Vec<PointXY>>,
    crs: Crs,
}

/// Where a point sits relative to one ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RingSide {
    Inside,
    Outside,
    Boundary,
}

impl Polygon {
    pub fn new(exterior: Vec<PointXY>, holes: Vec<Vec<PointXY>>, crs: Crs) -> Self {
        Polygon {
            exterior,
            holes,
            crs,
        }
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn exterior(&self) -> &[PointXY] {
        &self.exterior
    }

    /// Closed-region containment: points on the boundary (exterior or hole
    /// rings) count as contained.
    pub fn contains(&self, p: PointXY) -> bool {
        match ring_side(&self.exterior, p) {
            RingSide::Outside => false,
            RingSide::Boundary => true,
            RingSide::Inside => {
                for hole in &self.holes {
                    match ring_side(hole, p) {
                        RingSide::Inside => return false,
                        RingSide::Boundary => return true,
                        RingSide::Outside => {}
                    }
                }
                true
            }
        }
    }
}

/// Even-odd ray cast with an explicit boundary test per edge.
fn ring_side(ring: &[PointXY], p: PointXY) -> RingSide {
    if ring.len() < 3 {
        return RingSide::Outside;
    }

    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let a = ring[j];
        let b = ring[i];

        if on_segment(p, a, b) {
            return RingSide::Boundary;
        }

        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }

    if inside {
        RingSide::Inside
    } else {
        RingSide::Outside
    }
}

fn on_segment(p: PointXY, a: PointXY, b: PointXY) -> bool {
    const EPS: f64 = 1e-9;

    let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    if cross.abs() > EPS * (1.0 + (b.x - a.x).abs() + (b.y - a.y).abs()) {
        return false;
    }

    p.x >= a.x.min(b.x) - EPS
        && p.x <= a.x.max(b.x) + EPS
        && p.y >= a.y.min(b.y) - EPS
        && p.y <= a.y.max(b.y) + EPS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Polygon {
        Polygon::new(
            vec![
                PointXY::new(0.0, 0.0),
                PointXY::new(10.0, 0.0),
                PointXY::new(10.0, 10.0),
                PointXY::new(0.0, 10.0),
            ],
            vec![],
            S_JTSK,
        )
    }

    #[test]
    fn interior_point_contained() {
        assert!(unit_square().contains(PointXY::new(5.0, 5.0)));
    }

    #[test]
    fn exterior_point_rejected() {
        assert!(!unit_square().contains(PointXY::new(15.0, 5.0)));
        assert!(!unit_square().contains(PointXY::new(-1.0, 5.0)));
    }

    #[test]
    fn boundary_counts_as_contained() {
        let sq = unit_square();
        assert!(sq.contains(PointXY::new(0.0, 5.0)));
        assert!(sq.contains(PointXY::new(10.0, 10.0)));
        assert!(sq.contains(PointXY::new(5.0, 0.0)));
    }

    #[test]
    fn hole_excludes_interior_but_not_its_boundary() {
        let donut = Polygon::new(
            vec![
                PointXY::new(0.0, 0.0),
                PointXY::new(10.0, 0.0),
                PointXY::new(10.0, 10.0),
                PointXY::new(0.0, 10.0),
            ],
            vec![vec![
                PointXY::new(4.0, 4.0),
                PointXY::new(6.0, 4.0),
                PointXY::new(6.0, 6.0),
                PointXY::new(4.0, 6.0),
            ]],
            S_JTSK,
        );
        assert!(!donut.contains(PointXY::new(5.0, 5.0)));
        assert!(donut.contains(PointXY::new(4.0, 5.0)));
        assert!(donut.contains(PointXY::new(2.0, 2.0)));
    }

    #[test]
    fn concave_ring() {
        // L-shape: notch cut from the top right
        let l = Polygon::new(
            vec![
                PointXY::new(0.0, 0.0),
                PointXY::new(10.0, 0.0),
                PointXY::new(10.0, 5.0),
                PointXY::new(5.0, 5.0),
                PointXY::new(5.0, 10.0),
                PointXY::new(0.0, 10.0),
            ],
            vec![],
            S_JTSK,
        );
        assert!(l.contains(PointXY::new(2.0, 8.0)));
        assert!(!l.contains(PointXY::new(8.0, 8.0)));
        assert!(l.contains(PointXY::new(8.0, 2.0)));
    }

    #[test]
    fn degenerate_ring_contains_nothing() {
        let line = Polygon::new(
            vec![PointXY::new(0.0, 0.0), PointXY::new(10.0, 10.0)],
            vec![],
            S_JTSK,
        );
        assert!(!line.contains(PointXY::new(5.0, 5.0)));
    }
}
