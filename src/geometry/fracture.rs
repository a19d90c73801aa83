//! Fracture and unfracture
//!
//! Fracturing joins every hole to its outline with a zero-width slit so each
//! polygon becomes a single weakly simple outline. Unfracturing removes such
//! slits again and rebuilds outline plus holes.

use std::collections::HashMap;

use super::predicates::{in_interior_wedge, orient, segments_intersect};
use super::spatial::SegmentIndex;
use super::topology::{assemble, trace_loops, DirectedEdge};
use super::types::{Outline, Point, Polygon, PolygonSet, Vertex};
use crate::error::GeometryError;

/// The slit `h -> r` is blocked by segment `ab`
fn slit_blocked(h: Point, r: Point, a: Point, b: Point) -> bool {
    let shared = [h, r].iter().find(|&&p| p == a || p == b).copied();
    match shared {
        Some(end) => {
            // only a collinear overlap along the slit counts at a shared endpoint
            let other = if a == end { b } else { a };
            let toward = if end == h { r } else { h };
            if other == toward {
                return true;
            }
            orient(h, r, other) == 0 && (other - end).dot(toward - end) > 0
        }
        None => segments_intersect(h, r, a, b),
    }
}

fn neighbours(ring: &[Vertex], i: usize) -> (Point, Point) {
    let n = ring.len();
    (ring[(i + n - 1) % n].pos, ring[(i + 1) % n].pos)
}

/// Shortest valid slit from a vertex of `hole` to a vertex of `chain`.
/// Ties keep the smallest `(hole vertex, chain vertex)` pair.
fn best_slit(chain: &[Vertex], hole: &[Vertex], index: &SegmentIndex) -> Option<(usize, usize)> {
    let mut best: Option<(i128, usize, usize)> = None;
    for (i, hv) in hole.iter().enumerate() {
        let h = hv.pos;
        let (h_prev, h_next) = neighbours(hole, i);
        for (j, rv) in chain.iter().enumerate() {
            let r = rv.pos;
            if r == h {
                continue;
            }
            let len = h.dist_sq(r);
            if best.map_or(false, |(l, _, _)| len >= l) {
                continue;
            }
            let (r_prev, r_next) = neighbours(chain, j);
            if !in_interior_wedge(r_prev, r, r_next, h - r) || !in_interior_wedge(h_prev, h, h_next, r - h) {
                continue;
            }
            if index.query(h, r).any(|s| slit_blocked(h, r, s.a, s.b)) {
                continue;
            }
            best = Some((len, i, j));
        }
    }
    best.map(|(_, i, j)| (i, j))
}

/// Join hole `hole` into `chain` through chain vertex `j` and hole vertex `i`
fn splice(chain: &mut Vec<Vertex>, hole: &[Vertex], i: usize, j: usize) {
    let n = hole.len();
    let mut inserted = Vec::with_capacity(n + 2);
    // walk the whole hole starting and ending at vertex i
    for k in 0..n {
        inserted.push(hole[(i + k) % n]);
    }
    inserted.push(Vertex::new(hole[i].pos));
    inserted.push(chain[j]);
    chain[j].arc = None;
    chain.splice(j + 1..j + 1, inserted);
}

fn fracture_polygon(index: usize, poly: &Polygon) -> Result<Outline, GeometryError> {
    let mut outline = poly.outline.with_orientation(true);
    outline.dedup();
    if outline.len() < 3 {
        return Err(GeometryError::DegenerateOutline { polygon: index, vertices: outline.len() });
    }
    let mut holes = Vec::with_capacity(poly.holes.len());
    for hole in &poly.holes {
        let mut h = hole.with_orientation(false);
        h.dedup();
        if h.len() < 3 {
            return Err(GeometryError::DegenerateOutline { polygon: index, vertices: h.len() });
        }
        holes.push(h.vertices);
    }

    let mut chain = outline.vertices;
    let mut merged = vec![false; holes.len()];
    let mut pending: Vec<usize> = (0..holes.len()).collect();
    while !pending.is_empty() {
        let mut deferred = Vec::new();
        for &h in &pending {
            let edges: Vec<(Point, Point)> = ring_edges(&chain)
                .chain(
                    (0..holes.len())
                        .filter(|&k| !merged[k])
                        .flat_map(|k| ring_edges(&holes[k])),
                )
                .collect();
            let seg_index = SegmentIndex::new(edges);
            match best_slit(&chain, &holes[h], &seg_index) {
                Some((i, j)) => {
                    log::trace!("polygon {}: hole {} joined at hole vertex {} / outline vertex {}", index, h, i, j);
                    splice(&mut chain, &holes[h], i, j);
                    merged[h] = true;
                }
                None => deferred.push(h),
            }
        }
        if deferred.len() == pending.len() {
            return Err(GeometryError::Unfracturable { polygon: index, hole: deferred[0] });
        }
        pending = deferred;
    }
    Ok(Outline { vertices: chain, closed: true })
}

fn ring_edges(ring: &[Vertex]) -> impl Iterator<Item = (Point, Point)> + '_ {
    let n = ring.len();
    (0..n).map(move |i| (ring[i].pos, ring[(i + 1) % n].pos))
}

/// Replace every polygon by one hole-free outline joined through slits.
/// Polygons without holes pass through oriented counter-clockwise.
pub fn fracture(set: &PolygonSet) -> Result<PolygonSet, GeometryError> {
    let mut out = PolygonSet::new();
    for (index, poly) in set.polygons.iter().enumerate() {
        out.add_outline(fracture_polygon(index, poly)?);
    }
    log::debug!(
        "fractured {} polygons ({} holes) into {} vertices",
        set.outline_count(),
        set.hole_count(),
        out.vertex_count()
    );
    Ok(out)
}

/// Undo [`fracture`]: drop pairs of opposite duplicate straight edges and
/// rebuild outlines with holes from the remaining loops.
pub fn unfracture(set: &PolygonSet) -> PolygonSet {
    let mut edges: Vec<DirectedEdge> = Vec::new();
    for poly in &set.polygons {
        for contour in poly.contours() {
            let mut c = contour.clone();
            c.dedup();
            let n = c.len();
            edges.extend((0..n).map(|i| DirectedEdge { from: c.vertices[i], to: c.vertices[(i + 1) % n].pos }));
        }
    }

    let mut open: HashMap<(Point, Point), Vec<usize>> = HashMap::new();
    let mut removed = vec![false; edges.len()];
    for (k, e) in edges.iter().enumerate() {
        if e.from.arc.is_some() {
            continue;
        }
        let reverse = (e.to, e.from.pos);
        match open.get_mut(&reverse).and_then(|v| v.pop()) {
            Some(m) => {
                removed[m] = true;
                removed[k] = true;
            }
            None => open.entry((e.from.pos, e.to)).or_default().push(k),
        }
    }

    let kept: Vec<DirectedEdge> = edges
        .iter()
        .zip(&removed)
        .filter(|(_, &r)| !r)
        .map(|(e, _)| *e)
        .collect();
    log::debug!("unfracture: removed {} bridge edges", removed.iter().filter(|&&r| r).count());
    assemble(trace_loops(&kept))
}

impl PolygonSet {
    pub fn fracture(&self) -> Result<PolygonSet, GeometryError> {
        fracture(self)
    }

    pub fn unfracture(&self) -> PolygonSet {
        unfracture(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::types::ArcTag;

    fn square_with_hole() -> PolygonSet {
        let outline = Outline::rectangle(Point::new(0, 0), Point::new(100, 100));
        let hole = Outline::from_points([
            Point::new(25, 25),
            Point::new(25, 75),
            Point::new(75, 75),
            Point::new(75, 25),
        ]);
        PolygonSet::from_polygons(vec![Polygon::with_holes(outline, vec![hole])])
    }

    #[test]
    fn test_fracture_removes_holes_and_keeps_area() {
        let set = square_with_hole();
        let fractured = set.fracture().unwrap();
        assert_eq!(fractured.outline_count(), 1);
        assert_eq!(fractured.hole_count(), 0);
        assert_eq!(fractured.polygons[0].outline.len(), 10);
        assert_eq!(fractured.area(), set.area());
    }

    #[test]
    fn test_tie_break_picks_first_pair() {
        // all four hole corners are equally close to an outline corner
        let fractured = square_with_hole().fracture().unwrap();
        let outline = &fractured.polygons[0].outline;
        assert_eq!(outline.point(0), Point::new(0, 0));
        assert_eq!(outline.point(1), Point::new(25, 25));
        assert_eq!(outline.point(5), Point::new(25, 25));
        assert_eq!(outline.point(6), Point::new(0, 0));
        assert_eq!(square_with_hole().fracture().unwrap(), fractured);
    }

    #[test]
    fn test_round_trip() {
        let set = square_with_hole();
        let back = set.fracture().unwrap().unfracture();
        assert_eq!(back, set.normalized());
    }

    #[test]
    fn test_two_holes_round_trip() {
        let outline = Outline::rectangle(Point::new(0, 0), Point::new(300, 100));
        let h1 = Outline::rectangle(Point::new(20, 20), Point::new(80, 80)).reversed();
        let h2 = Outline::rectangle(Point::new(120, 30), Point::new(180, 70)).reversed();
        let set = PolygonSet::from_polygons(vec![Polygon::with_holes(outline, vec![h1, h2])]);
        let fractured = set.fracture().unwrap();
        assert_eq!(fractured.hole_count(), 0);
        assert_eq!(fractured.area(), set.area());
        assert_eq!(fractured.unfracture(), set.normalized());
    }

    #[test]
    fn test_hole_outside_outline_is_unfracturable() {
        let outline = Outline::rectangle(Point::new(0, 0), Point::new(10, 10));
        let stray = Outline::rectangle(Point::new(20, 20), Point::new(30, 30)).reversed();
        let set = PolygonSet::from_polygons(vec![Polygon::with_holes(outline, vec![stray])]);
        assert_eq!(set.fracture(), Err(GeometryError::Unfracturable { polygon: 0, hole: 0 }));
    }

    #[test]
    fn test_degenerate_outline_errors() {
        let set = PolygonSet::from_outline(Outline::from_points([Point::new(0, 0), Point::new(1, 1)]));
        assert!(matches!(set.fracture(), Err(GeometryError::DegenerateOutline { .. })));
    }

    #[test]
    fn test_arc_tags_survive() {
        let mut set = square_with_hole();
        let start = Point::new(100, 0);
        let end = Point::new(100, 100);
        let tag = ArcTag::through(start, Point::new(120, 50), end).unwrap();
        set.polygons[0].outline.vertices[1].arc = Some(tag);
        let fractured = set.fracture().unwrap();
        let tagged: Vec<&Vertex> = fractured.polygons[0].outline.vertices.iter().filter(|v| v.arc.is_some()).collect();
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].pos, start);
    }
}
