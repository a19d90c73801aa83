//! Boolean operations on polygon sets
//!
//! Pipeline:
//! 1. flatten arcs and orient contours (outlines CCW, holes CW)
//! 2. split every edge at all crossing and touching points
//! 3. merge coincident edges, summing a signed multiplicity per operand
//! 4. classify each edge by the exact winding numbers on both of its sides
//! 5. keep edges whose membership differs across sides and trace loops
//!
//! Topology decisions use integer arithmetic only. Crossing points are
//! rounded to the nearest IU.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::predicates::{line_intersection, orient, segments_cross_properly, segments_intersect, strictly_inside_segment};
use super::spatial::SegmentIndex;
use super::topology::{assemble, trace_loops, DirectedEdge};
use super::types::{Point, PolygonSet};
use crate::config::GeometryOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BooleanOp {
    Union,
    Subtract,
    Intersect,
    Xor,
}

impl BooleanOp {
    fn keeps(self, in_a: bool, in_b: bool) -> bool {
        match self {
            BooleanOp::Union => in_a || in_b,
            BooleanOp::Subtract => in_a && !in_b,
            BooleanOp::Intersect => in_a && in_b,
            BooleanOp::Xor => in_a != in_b,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SourceEdge {
    a: Point,
    b: Point,
    operand: usize,
}

/// Signed multiplicity per operand
type Weights = [i32; 2];

fn collect_edges(set: &PolygonSet, operand: usize, max_error: i64, out: &mut Vec<SourceEdge>) {
    for poly in &set.polygons {
        for (k, contour) in poly.contours().enumerate() {
            let flat = contour.approximated(max_error).with_orientation(k == 0);
            out.extend(
                flat.edges()
                    .filter(|(a, b)| a != b)
                    .map(|(a, b)| SourceEdge { a, b, operand }),
            );
        }
    }
}

/// Crossing point of two segments, computed from a canonical ordering of
/// the pair so both segments receive the same rounded point.
fn crossing_point(a: Point, b: Point, c: Point, d: Point) -> Option<Point> {
    let s1 = if a <= b { (a, b) } else { (b, a) };
    let s2 = if c <= d { (c, d) } else { (d, c) };
    let (s1, s2) = if s1 <= s2 { (s1, s2) } else { (s2, s1) };
    line_intersection(s1.0, s1.1, s2.0, s2.1)
}

/// Points where `ab` must be cut because of `cd`
fn collect_cuts(a: Point, b: Point, c: Point, d: Point, out: &mut Vec<Point>) {
    if segments_cross_properly(a, b, c, d) {
        if let Some(p) = crossing_point(a, b, c, d) {
            out.push(p);
        }
        return;
    }
    for p in [c, d] {
        if strictly_inside_segment(a, b, p) {
            out.push(p);
        }
    }
}

/// Split edges until no edge crosses or touches the interior of another
fn split_edges(mut edges: Vec<SourceEdge>, max_passes: usize) -> Vec<SourceEdge> {
    for pass in 0..max_passes.max(1) {
        let index = SegmentIndex::new(edges.iter().map(|e| (e.a, e.b)));
        let cuts: Vec<Vec<Point>> = edges
            .par_iter()
            .enumerate()
            .map(|(i, e)| {
                let mut pts = Vec::new();
                for other in index.query(e.a, e.b) {
                    if other.index != i {
                        collect_cuts(e.a, e.b, other.a, other.b, &mut pts);
                    }
                }
                pts
            })
            .collect();

        let mut changed = false;
        let mut next = Vec::with_capacity(edges.len());
        for (e, mut pts) in edges.into_iter().zip(cuts) {
            let dir = e.b - e.a;
            let len2 = dir.dot(dir);
            pts.retain(|&p| {
                let t = (p - e.a).dot(dir);
                p != e.a && p != e.b && t > 0 && t < len2
            });
            if pts.is_empty() {
                next.push(e);
                continue;
            }
            changed = true;
            pts.sort_by_key(|&p| (p - e.a).dot(dir));
            pts.dedup();
            let mut from = e.a;
            for p in pts.into_iter().chain(std::iter::once(e.b)) {
                if p != from {
                    next.push(SourceEdge { a: from, b: p, operand: e.operand });
                    from = p;
                }
            }
        }
        edges = next;
        if !changed {
            log::trace!("edge splitting settled after {} passes", pass + 1);
            break;
        }
    }
    edges
}

/// Merge coincident edges keyed by their lexicographically ordered
/// endpoints. Edges whose multiplicities cancel completely are dropped.
fn merge_edges(edges: &[SourceEdge]) -> Vec<((Point, Point), Weights)> {
    let mut merged: BTreeMap<(Point, Point), Weights> = BTreeMap::new();
    for e in edges {
        let (key, sign) = if e.a < e.b { ((e.a, e.b), 1) } else { ((e.b, e.a), -1) };
        merged.entry(key).or_default()[e.operand] += sign;
    }
    merged.into_iter().filter(|(_, w)| *w != [0, 0]).collect()
}

struct Classifier<'a> {
    edges: &'a [((Point, Point), Weights)],
    /// Same edges in doubled coordinates
    index: SegmentIndex,
    min2: Point,
}

impl<'a> Classifier<'a> {
    fn new(edges: &'a [((Point, Point), Weights)]) -> Self {
        let index = SegmentIndex::new(edges.iter().map(|((p, q), _)| (p.doubled(), q.doubled())));
        let min2 = edges
            .iter()
            .fold(Point::new(i64::MAX, i64::MAX), |m, ((p, q), _)| {
                Point::new(m.x.min(p.x).min(q.x), m.y.min(p.y).min(q.y))
            })
            .doubled();
        Self { edges, index, min2 }
    }

    /// Winding numbers just below doubled point `m2`, casting a ray straight
    /// down. Edges count over the half-open x span `[a.x, b.x)`.
    fn winding_below(&self, skip: usize, m2: Point) -> Weights {
        let mut acc = [0, 0];
        for s in self.index.query(Point::new(m2.x, self.min2.y - 1), m2) {
            if s.index == skip || s.a.x == s.b.x {
                continue;
            }
            if s.a.x <= m2.x && m2.x < s.b.x && orient(s.a, s.b, m2) > 0 {
                let w = self.edges[s.index].1;
                acc[0] += w[0];
                acc[1] += w[1];
            }
        }
        acc
    }

    /// Winding numbers just left of doubled point `m2`, casting a ray to the
    /// left. Edges count over the half-open y span `[low.y, high.y)`.
    fn winding_left(&self, skip: usize, m2: Point) -> Weights {
        let mut acc = [0, 0];
        for s in self.index.query(Point::new(self.min2.x - 1, m2.y), m2) {
            if s.index == skip || s.a.y == s.b.y {
                continue;
            }
            let (low, high, sign) = if s.a.y < s.b.y { (s.a, s.b, -1) } else { (s.b, s.a, 1) };
            if low.y <= m2.y && m2.y < high.y && orient(low, high, m2) < 0 {
                let w = self.edges[s.index].1;
                acc[0] += sign * w[0];
                acc[1] += sign * w[1];
            }
        }
        acc
    }

    /// Result edge for entry `k`, oriented with the kept region on its left
    fn classify(&self, k: usize, op: BooleanOp) -> Option<(Point, Point)> {
        let ((p, q), w) = self.edges[k];
        let m2 = p + q;
        let inside = |wn: Weights| op.keeps(wn[0] != 0, wn[1] != 0);

        if p.x != q.x {
            let below = self.winding_below(k, m2);
            let above = [below[0] + w[0], below[1] + w[1]];
            match (inside(above), inside(below)) {
                (true, false) => Some((p, q)),
                (false, true) => Some((q, p)),
                _ => None,
            }
        } else {
            let left = self.winding_left(k, m2);
            let right = [left[0] - w[0], left[1] - w[1]];
            match (inside(left), inside(right)) {
                (true, false) => Some((p, q)),
                (false, true) => Some((q, p)),
                _ => None,
            }
        }
    }
}

/// Apply `op` to `a` and `b`. Never fails: degenerate input simply
/// contributes nothing to the result.
pub fn boolean(a: &PolygonSet, b: &PolygonSet, op: BooleanOp, options: &GeometryOptions) -> PolygonSet {
    let mut edges = Vec::new();
    collect_edges(a, 0, options.max_error, &mut edges);
    collect_edges(b, 1, options.max_error, &mut edges);
    let input_edges = edges.len();

    let edges = split_edges(edges, options.max_split_passes);
    let merged = merge_edges(&edges);
    if merged.is_empty() {
        return PolygonSet::new();
    }

    let classifier = Classifier::new(&merged);
    let kept: Vec<DirectedEdge> = (0..merged.len())
        .into_par_iter()
        .filter_map(|k| classifier.classify(k, op))
        .map(|(from, to)| DirectedEdge::straight(from, to))
        .collect();

    let result = assemble(trace_loops(&kept));
    log::debug!(
        "{:?}: {} input edges, {} after split, {} unique, {} kept -> {} polygons",
        op,
        input_edges,
        edges.len(),
        merged.len(),
        kept.len(),
        result.outline_count()
    );
    result
}

impl PolygonSet {
    pub fn union(&self, other: &PolygonSet) -> PolygonSet {
        boolean(self, other, BooleanOp::Union, &GeometryOptions::default())
    }

    pub fn subtract(&self, other: &PolygonSet) -> PolygonSet {
        boolean(self, other, BooleanOp::Subtract, &GeometryOptions::default())
    }

    pub fn intersect(&self, other: &PolygonSet) -> PolygonSet {
        boolean(self, other, BooleanOp::Intersect, &GeometryOptions::default())
    }

    pub fn xor(&self, other: &PolygonSet) -> PolygonSet {
        boolean(self, other, BooleanOp::Xor, &GeometryOptions::default())
    }

    /// Resolve self-overlaps and self-intersections into a clean set
    pub fn simplify(&self) -> PolygonSet {
        boolean(self, &PolygonSet::new(), BooleanOp::Union, &GeometryOptions::default())
    }

    /// Any contour of a polygon crosses or touches itself or another contour
    /// of the same polygon
    pub fn is_self_intersecting(&self) -> bool {
        self.polygons.iter().any(|poly| {
            let mut segments: Vec<(usize, usize, usize, Point, Point)> = Vec::new();
            for (c, contour) in poly.contours().enumerate() {
                let mut flat = contour.approximated(GeometryOptions::default().max_error);
                flat.dedup();
                let n = flat.len();
                segments.extend(flat.edges().enumerate().map(|(i, (a, b))| (c, i, n, a, b)));
            }
            let index = SegmentIndex::new(segments.iter().map(|s| (s.3, s.4)));
            segments.iter().enumerate().any(|(i, &(ci, ei, n, a, b))| {
                index.query(a, b).any(|hit| {
                    if hit.index <= i {
                        return false;
                    }
                    let (cj, ej, _, c, d) = segments[hit.index];
                    if ci == cj && n > 1 {
                        if ej == ei + 1 {
                            // b == c is shared; overlap when d folds back along ab
                            return orient(a, b, d) == 0 && (d - b).dot(a - b) > 0;
                        }
                        if ei == 0 && ej == n - 1 {
                            // d == a is shared
                            return orient(c, d, b) == 0 && (c - a).dot(b - a) > 0;
                        }
                    }
                    segments_intersect(a, b, c, d)
                })
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::types::{Outline, Polygon};

    fn rect(x0: i64, y0: i64, x1: i64, y1: i64) -> PolygonSet {
        PolygonSet::from_outline(Outline::rectangle(Point::new(x0, y0), Point::new(x1, y1)))
    }

    #[test]
    fn test_union_overlapping_squares() {
        let u = rect(0, 0, 10, 10).union(&rect(5, 5, 15, 15));
        assert_eq!(u.outline_count(), 1);
        assert_eq!(u.area(), 175.0);
        assert_eq!(u.polygons[0].outline.len(), 8);
    }

    #[test]
    fn test_subtract_creates_hole() {
        let d = rect(0, 0, 100, 100).subtract(&rect(25, 25, 75, 75));
        assert_eq!(d.outline_count(), 1);
        assert_eq!(d.hole_count(), 1);
        assert_eq!(d.area(), 7500.0);
        assert!(!d.polygons[0].holes[0].is_ccw());
    }

    #[test]
    fn test_intersect_and_xor() {
        let a = rect(0, 0, 10, 10);
        let b = rect(5, 0, 15, 10);
        assert_eq!(a.intersect(&b), rect(5, 0, 10, 10).normalized());
        let x = a.xor(&b);
        assert_eq!(x.outline_count(), 2);
        assert_eq!(x.area(), 100.0);
    }

    #[test]
    fn test_identities() {
        let a = rect(0, 0, 10, 10).union(&rect(20, 0, 30, 10));
        assert_eq!(a.union(&PolygonSet::new()), a.normalized());
        assert!(a.subtract(&a).is_empty());
        assert_eq!(a.intersect(&a), a.normalized());
    }

    #[test]
    fn test_coincident_edges_merge() {
        let u = rect(0, 0, 10, 10).union(&rect(10, 0, 20, 10));
        assert_eq!(u, rect(0, 0, 20, 10).normalized());
    }

    #[test]
    fn test_zero_area_outline_vanishes() {
        let flat = PolygonSet::from_outline(Outline::from_points([
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(20, 0),
        ]));
        assert!(flat.simplify().is_empty());
        assert_eq!(rect(0, 0, 5, 5).union(&flat), rect(0, 0, 5, 5).normalized());
    }

    #[test]
    fn test_simplify_bowtie() {
        let bowtie = PolygonSet::from_outline(Outline::from_points([
            Point::new(0, 0),
            Point::new(10, 10),
            Point::new(10, 0),
            Point::new(0, 10),
        ]));
        assert!(bowtie.is_self_intersecting());
        let s = bowtie.simplify();
        assert_eq!(s.outline_count(), 2);
        assert_eq!(s.area(), 50.0);
        assert!(!s.is_self_intersecting());
    }

    #[test]
    fn test_self_intersection_detection() {
        assert!(!rect(0, 0, 10, 10).is_self_intersecting());
        let mut poly = Polygon::new(Outline::rectangle(Point::new(0, 0), Point::new(10, 10)));
        poly.holes.push(Outline::rectangle(Point::new(5, 2), Point::new(12, 8)).reversed());
        assert!(PolygonSet::from_polygons(vec![poly]).is_self_intersecting());
    }

    #[test]
    fn test_result_is_deterministic() {
        let a = rect(0, 0, 10, 10);
        let b = rect(3, -4, 7, 14);
        assert_eq!(a.union(&b), b.union(&a));
        assert_eq!(a.subtract(&b), a.subtract(&b));
    }
}
