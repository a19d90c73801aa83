//! Core polygon types
//!
//! Coordinates are integer internal units. An [`Outline`] is a closed chain
//! of vertices; a vertex may carry an [`ArcTag`] meaning the edge to the
//! next vertex is a circular arc. A [`Polygon`] is an outline plus holes and
//! a [`PolygonSet`] is an ordered list of polygons with value semantics.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

use super::predicates::{locate_point2, Containment};

/// A 2D integer point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    pub fn cross(self, other: Point) -> i128 {
        self.x as i128 * other.y as i128 - self.y as i128 * other.x as i128
    }

    pub fn dot(self, other: Point) -> i128 {
        self.x as i128 * other.x as i128 + self.y as i128 * other.y as i128
    }

    pub fn dist_sq(self, other: Point) -> i128 {
        let d = other - self;
        d.dot(d)
    }

    /// Same point with both coordinates doubled
    pub fn doubled(self) -> Point {
        Point::new(self.x * 2, self.y * 2)
    }

    pub fn to_f64(self) -> (f64, f64) {
        (self.x as f64, self.y as f64)
    }

    pub fn from_f64(x: f64, y: f64) -> Self {
        Point::new(x.round() as i64, y.round() as i64)
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Marks the edge leaving a vertex as a circular arc through `mid`.
/// `center` and `radius` are derived from start/mid/end when the tag is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArcTag {
    pub mid: Point,
    pub center: Point,
    pub radius: i64,
}

impl ArcTag {
    /// Arc through three points; `None` when they are collinear
    pub fn through(start: Point, mid: Point, end: Point) -> Option<Self> {
        let (ax, ay) = start.to_f64();
        let (bx, by) = mid.to_f64();
        let (cx, cy) = end.to_f64();
        let d = 2.0 * (ax * (by - cy) + bx * (cy - ay) + cx * (ay - by));
        if d == 0.0 || (mid - start).cross(end - start) == 0 {
            return None;
        }
        let a2 = ax * ax + ay * ay;
        let b2 = bx * bx + by * by;
        let c2 = cx * cx + cy * cy;
        let ux = (a2 * (by - cy) + b2 * (cy - ay) + c2 * (ay - by)) / d;
        let uy = (a2 * (cx - bx) + b2 * (ax - cx) + c2 * (bx - ax)) / d;
        let radius = ((ax - ux).powi(2) + (ay - uy).powi(2)).sqrt();
        Some(Self {
            mid,
            center: Point::from_f64(ux, uy),
            radius: radius.round() as i64,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vertex {
    pub pos: Point,
    pub arc: Option<ArcTag>,
}

impl Vertex {
    pub fn new(pos: Point) -> Self {
        Self { pos, arc: None }
    }
}

impl From<Point> for Vertex {
    fn from(pos: Point) -> Self {
        Vertex::new(pos)
    }
}

/// Axis aligned bounding box (inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

impl BoundingBox {
    pub fn from_points<I: IntoIterator<Item = Point>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bb = BoundingBox { min: first, max: first };
        for p in iter {
            bb.include(p);
        }
        Some(bb)
    }

    pub fn include(&mut self, p: Point) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    pub fn merge(&mut self, other: &BoundingBox) {
        self.include(other.min);
        self.include(other.max);
    }

    pub fn width(&self) -> i64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> i64 {
        self.max.y - self.min.y
    }
}

/// A closed polygonal boundary
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Outline {
    pub vertices: Vec<Vertex>,
    pub closed: bool,
}

impl Outline {
    pub fn new() -> Self {
        Self { vertices: Vec::new(), closed: true }
    }

    pub fn from_points<I: IntoIterator<Item = Point>>(points: I) -> Self {
        Self {
            vertices: points.into_iter().map(Vertex::new).collect(),
            closed: true,
        }
    }

    /// Axis aligned rectangle, counter-clockwise
    pub fn rectangle(min: Point, max: Point) -> Self {
        Self::from_points([
            min,
            Point::new(max.x, min.y),
            max,
            Point::new(min.x, max.y),
        ])
    }

    pub fn push(&mut self, p: Point) {
        self.vertices.push(Vertex::new(p));
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn point(&self, i: usize) -> Point {
        self.vertices[i].pos
    }

    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.vertices.iter().map(|v| v.pos)
    }

    pub fn has_arcs(&self) -> bool {
        self.vertices.iter().any(|v| v.arc.is_some())
    }

    /// Straight edges `(start, end)`, including the closing edge
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i].pos, self.vertices[(i + 1) % n].pos))
    }

    /// Twice the signed area over the straight edges (positive = CCW)
    pub fn signed_area2(&self) -> i128 {
        self.edges().map(|(a, b)| a.cross(b)).sum()
    }

    pub fn area(&self) -> f64 {
        (self.signed_area2() as f64 / 2.0).abs()
    }

    pub fn is_ccw(&self) -> bool {
        self.signed_area2() > 0
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.points())
    }

    /// Reverse the winding. Arc tags move with their edges.
    pub fn reverse(&mut self) {
        let n = self.vertices.len();
        if n < 2 {
            return;
        }
        let old_arcs: Vec<Option<ArcTag>> = self.vertices.iter().map(|v| v.arc).collect();
        self.vertices.reverse();
        for k in 0..n {
            self.vertices[k].arc = old_arcs[(2 * n - 2 - k) % n];
        }
    }

    pub fn reversed(&self) -> Outline {
        let mut out = self.clone();
        out.reverse();
        out
    }

    /// Return a copy wound counter-clockwise (`ccw == true`) or clockwise
    pub fn with_orientation(&self, ccw: bool) -> Outline {
        let area = self.signed_area2();
        if area != 0 && (area > 0) != ccw {
            self.reversed()
        } else {
            self.clone()
        }
    }

    /// Drop consecutive duplicate points (including the closing pair)
    pub fn dedup(&mut self) {
        self.vertices.dedup_by(|b, a| a.pos == b.pos);
        while self.vertices.len() > 1 && self.vertices.first().map(|v| v.pos) == self.vertices.last().map(|v| v.pos) {
            self.vertices.pop();
        }
    }

    /// Remove vertices lying on the straight line through their neighbours.
    /// Vertices that start or end an arc are kept.
    pub fn remove_collinear(&mut self) {
        self.dedup();
        let mut changed = true;
        while changed && self.vertices.len() >= 3 {
            changed = false;
            let n = self.vertices.len();
            for i in 0..n {
                let prev = self.vertices[(i + n - 1) % n];
                let cur = self.vertices[i];
                let next = self.vertices[(i + 1) % n];
                if prev.arc.is_some() || cur.arc.is_some() {
                    continue;
                }
                if (cur.pos - prev.pos).cross(next.pos - cur.pos) == 0 {
                    self.vertices.remove(i);
                    changed = true;
                    break;
                }
            }
        }
    }

    /// Rotate so that the lexicographically smallest vertex comes first
    pub fn rotate_to_min(&mut self) {
        if let Some(start) = (0..self.vertices.len()).min_by_key(|&i| self.vertices[i].pos) {
            self.vertices.rotate_left(start);
        }
    }

    /// Exact classification of a point against this outline
    pub fn locate(&self, p: Point) -> Containment {
        let pts: Vec<Point> = self.points().collect();
        locate_point2(&pts, p.doubled())
    }

    /// Inside or on the boundary
    pub fn contains(&self, p: Point) -> bool {
        self.locate(p) != Containment::Outside
    }

    /// Closest point on the straight edges. Measurement only.
    pub fn nearest_point(&self, p: Point) -> Option<(Point, f64)> {
        let (px, py) = p.to_f64();
        let mut best: Option<(Point, f64)> = None;
        for (a, b) in self.edges() {
            let (ax, ay) = a.to_f64();
            let (bx, by) = b.to_f64();
            let (dx, dy) = (bx - ax, by - ay);
            let len2 = dx * dx + dy * dy;
            let t = if len2 == 0.0 {
                0.0
            } else {
                (((px - ax) * dx + (py - ay) * dy) / len2).clamp(0.0, 1.0)
            };
            let (cx, cy) = (ax + t * dx, ay + t * dy);
            let dist = ((px - cx).powi(2) + (py - cy).powi(2)).sqrt();
            if best.map_or(true, |(_, d)| dist < d) {
                best = Some((Point::from_f64(cx, cy), dist));
            }
        }
        best
    }
}

/// An outline with zero or more holes
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Polygon {
    pub outline: Outline,
    pub holes: Vec<Outline>,
}

impl Polygon {
    pub fn new(outline: Outline) -> Self {
        Self { outline, holes: Vec::new() }
    }

    pub fn with_holes(outline: Outline, holes: Vec<Outline>) -> Self {
        Self { outline, holes }
    }

    pub fn contours(&self) -> impl Iterator<Item = &Outline> {
        std::iter::once(&self.outline).chain(self.holes.iter())
    }

    /// Outline CCW, holes CW
    pub fn oriented(&self) -> Polygon {
        Polygon {
            outline: self.outline.with_orientation(true),
            holes: self.holes.iter().map(|h| h.with_orientation(false)).collect(),
        }
    }

    /// Filled area: outline minus holes
    pub fn area(&self) -> f64 {
        self.outline.area() - self.holes.iter().map(Outline::area).sum::<f64>()
    }

    pub fn contains(&self, p: Point) -> bool {
        self.outline.contains(p) && self.holes.iter().all(|h| h.locate(p) != Containment::Inside)
    }

    pub fn vertex_count(&self) -> usize {
        self.contours().map(Outline::len).sum()
    }
}

/// Ordered collection of polygons
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PolygonSet {
    pub polygons: Vec<Polygon>,
}

impl PolygonSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_polygons(polygons: Vec<Polygon>) -> Self {
        Self { polygons }
    }

    pub fn from_outline(outline: Outline) -> Self {
        Self { polygons: vec![Polygon::new(outline)] }
    }

    /// Append an outline, returning its index
    pub fn add_outline(&mut self, outline: Outline) -> usize {
        self.polygons.push(Polygon::new(outline));
        self.polygons.len() - 1
    }

    /// Attach a hole to polygon `index`; `None` if there is no such polygon
    pub fn add_hole(&mut self, index: usize, hole: Outline) -> Option<usize> {
        let poly = self.polygons.get_mut(index)?;
        poly.holes.push(hole);
        Some(poly.holes.len() - 1)
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn outline_count(&self) -> usize {
        self.polygons.len()
    }

    pub fn hole_count(&self) -> usize {
        self.polygons.iter().map(|p| p.holes.len()).sum()
    }

    pub fn vertex_count(&self) -> usize {
        self.polygons.iter().map(Polygon::vertex_count).sum()
    }

    pub fn has_holes(&self) -> bool {
        self.polygons.iter().any(|p| !p.holes.is_empty())
    }

    pub fn area(&self) -> f64 {
        self.polygons.iter().map(Polygon::area).sum()
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.polygons.iter().flat_map(|p| p.outline.points()))
    }

    pub fn contains(&self, p: Point) -> bool {
        self.polygons.iter().any(|poly| poly.contains(p))
    }

    /// Closest boundary point of any contour. Measurement only.
    pub fn nearest_point(&self, p: Point) -> Option<(Point, f64)> {
        self.polygons
            .iter()
            .flat_map(Polygon::contours)
            .filter_map(|c| c.nearest_point(p))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Canonical comparable form: outlines CCW, holes CW, collinear points
    /// removed, every contour starting at its smallest vertex, holes and
    /// polygons sorted. Does not merge overlapping polygons.
    pub fn normalized(&self) -> PolygonSet {
        let mut polygons: Vec<Polygon> = self
            .polygons
            .iter()
            .filter_map(|poly| {
                let mut outline = poly.outline.with_orientation(true);
                outline.remove_collinear();
                if outline.len() < 3 || outline.signed_area2() == 0 {
                    return None;
                }
                outline.rotate_to_min();
                let mut holes: Vec<Outline> = poly
                    .holes
                    .iter()
                    .filter_map(|h| {
                        let mut h = h.with_orientation(false);
                        h.remove_collinear();
                        if h.len() < 3 || h.signed_area2() == 0 {
                            return None;
                        }
                        h.rotate_to_min();
                        Some(h)
                    })
                    .collect();
                holes.sort_by_key(|h| h.point(0));
                Some(Polygon { outline, holes })
            })
            .collect();
        polygons.sort_by_key(|p| p.outline.point(0));
        PolygonSet { polygons }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: i64, y0: i64, size: i64) -> Outline {
        Outline::rectangle(Point::new(x0, y0), Point::new(x0 + size, y0 + size))
    }

    #[test]
    fn test_signed_area_and_orientation() {
        let sq = square(0, 0, 10);
        assert_eq!(sq.signed_area2(), 200);
        assert!(sq.is_ccw());
        assert!(!sq.reversed().is_ccw());
        assert_eq!(sq.area(), 100.0);
    }

    #[test]
    fn test_reverse_moves_arc_tags() {
        let mut o = square(0, 0, 10);
        let tag = ArcTag { mid: Point::new(5, -2), center: Point::new(5, 20), radius: 22 };
        o.vertices[0].arc = Some(tag); // edge (0,0) -> (10,0)
        o.reverse();
        // reversed order: (0,10) (10,10) (10,0) (0,0); edge (10,0) -> (0,0) is index 2
        assert_eq!(o.point(2), Point::new(10, 0));
        assert_eq!(o.vertices[2].arc, Some(tag));
        assert_eq!(o.vertices.iter().filter(|v| v.arc.is_some()).count(), 1);
    }

    #[test]
    fn test_remove_collinear() {
        let mut o = Outline::from_points([
            Point::new(0, 0),
            Point::new(5, 0),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(0, 10),
            Point::new(0, 10),
        ]);
        o.remove_collinear();
        assert_eq!(o.len(), 4);
    }

    #[test]
    fn test_polygon_area_and_contains() {
        let poly = Polygon::with_holes(square(0, 0, 100), vec![square(25, 25, 50).reversed()]);
        assert_eq!(poly.area(), 7500.0);
        assert!(poly.contains(Point::new(10, 10)));
        assert!(!poly.contains(Point::new(50, 50)));
        assert!(poly.contains(Point::new(25, 50))); // on the hole boundary
    }

    #[test]
    fn test_arc_through_three_points() {
        let tag = ArcTag::through(Point::new(-10, 0), Point::new(0, 10), Point::new(10, 0)).unwrap();
        assert_eq!(tag.center, Point::new(0, 0));
        assert_eq!(tag.radius, 10);
        assert!(ArcTag::through(Point::new(0, 0), Point::new(1, 1), Point::new(2, 2)).is_none());
    }

    #[test]
    fn test_normalized_is_canonical() {
        let a = PolygonSet::from_outline(square(0, 0, 10));
        let mut rotated = square(0, 0, 10).reversed();
        rotated.vertices.rotate_left(2);
        let b = PolygonSet::from_outline(rotated);
        assert_eq!(a.normalized(), b.normalized());
    }

    #[test]
    fn test_nearest_point() {
        let o = square(0, 0, 10);
        let (p, d) = o.nearest_point(Point::new(5, -3)).unwrap();
        assert_eq!(p, Point::new(5, 0));
        assert!((d - 3.0).abs() < 1e-9);
    }
}
