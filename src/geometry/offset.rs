//! Inflate and erode
//!
//! Both build the band swept by a disc of the offset radius along every
//! contour, then union or subtract it with the same boolean backend.

use super::arc::circle_polygon;
use super::boolean::{boolean, BooleanOp};
use super::types::{Outline, Point, PolygonSet};
use crate::config::GeometryOptions;

/// Rectangle of half-width `radius` around segment `ab`
fn edge_rectangle(a: Point, b: Point, radius: i64) -> Option<Outline> {
    let (ax, ay) = a.to_f64();
    let (bx, by) = b.to_f64();
    let len = (bx - ax).hypot(by - ay);
    if len == 0.0 {
        return None;
    }
    let r = radius as f64;
    let nx = -(by - ay) / len * r;
    let ny = (bx - ax) / len * r;
    let outline = Outline::from_points([
        Point::from_f64(ax - nx, ay - ny),
        Point::from_f64(bx - nx, by - ny),
        Point::from_f64(bx + nx, by + ny),
        Point::from_f64(ax + nx, ay + ny),
    ]);
    (outline.signed_area2() != 0).then_some(outline)
}

/// Region within `radius` of any boundary of `set`
pub fn boundary_band(set: &PolygonSet, radius: i64, max_error: i64) -> PolygonSet {
    let mut band = PolygonSet::new();
    if radius <= 0 {
        return band;
    }
    for poly in &set.polygons {
        for contour in poly.contours() {
            let flat = contour.approximated(max_error);
            for (a, b) in flat.edges() {
                if let Some(rect) = edge_rectangle(a, b, radius) {
                    band.add_outline(rect);
                }
            }
            for p in flat.points() {
                band.add_outline(circle_polygon(p, radius, max_error));
            }
        }
    }
    band
}

/// Grow every outline outward (and shrink holes) by `distance`.
/// A negative distance erodes.
pub fn inflate(set: &PolygonSet, distance: i64, options: &GeometryOptions) -> PolygonSet {
    if distance < 0 {
        return erode(set, -distance, options);
    }
    if distance == 0 {
        return set.simplify();
    }
    let band = boundary_band(set, distance, options.max_error);
    log::debug!("inflate by {}: band of {} pieces", distance, band.outline_count());
    boolean(set, &band, BooleanOp::Union, options)
}

/// Shrink every outline inward (and grow holes) by `distance`.
/// A negative distance inflates.
pub fn erode(set: &PolygonSet, distance: i64, options: &GeometryOptions) -> PolygonSet {
    if distance < 0 {
        return inflate(set, -distance, options);
    }
    if distance == 0 {
        return set.simplify();
    }
    let band = boundary_band(set, distance, options.max_error);
    log::debug!("erode by {}: band of {} pieces", distance, band.outline_count());
    boolean(set, &band, BooleanOp::Subtract, options)
}

impl PolygonSet {
    pub fn inflate(&self, distance: i64, max_error: i64) -> PolygonSet {
        let options = GeometryOptions { max_error, ..GeometryOptions::default() };
        inflate(self, distance, &options)
    }

    pub fn erode(&self, distance: i64, max_error: i64) -> PolygonSet {
        let options = GeometryOptions { max_error, ..GeometryOptions::default() };
        erode(self, distance, &options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MM: i64 = 1_000_000;

    fn square(size: i64) -> PolygonSet {
        PolygonSet::from_outline(Outline::rectangle(Point::new(0, 0), Point::new(size, size)))
    }

    #[test]
    fn test_inflate_square_bbox_is_exact() {
        let grown = square(10 * MM).inflate(MM, 5_000);
        assert_eq!(grown.outline_count(), 1);
        assert_eq!(grown.hole_count(), 0);
        let bb = grown.bbox().unwrap();
        assert_eq!(bb.min, Point::new(-MM, -MM));
        assert_eq!(bb.max, Point::new(11 * MM, 11 * MM));
        // rounded corners: less than the full 12x12 square, more than the cross
        let area = grown.area() / (MM as f64 * MM as f64);
        assert!(area < 144.0 && area > 140.0, "area {}", area);
    }

    #[test]
    fn test_erode_square() {
        let shrunk = square(10 * MM).erode(MM, 5_000);
        assert_eq!(shrunk, PolygonSet::from_outline(Outline::rectangle(
            Point::new(MM, MM),
            Point::new(9 * MM, 9 * MM)
        )));
    }

    #[test]
    fn test_erode_past_half_width_vanishes() {
        assert!(square(2 * MM).erode(2 * MM, 5_000).is_empty());
    }

    #[test]
    fn test_negative_distance_swaps() {
        let a = square(10 * MM);
        assert_eq!(a.inflate(-MM, 5_000), a.erode(MM, 5_000));
    }

    #[test]
    fn test_inflate_fills_narrow_hole() {
        let ring = square(10 * MM).subtract(&PolygonSet::from_outline(Outline::rectangle(
            Point::new(4 * MM, 4 * MM),
            Point::new(6 * MM, 6 * MM),
        )));
        assert_eq!(ring.hole_count(), 1);
        assert_eq!(ring.inflate(2 * MM, 5_000).hole_count(), 0);
    }
}
