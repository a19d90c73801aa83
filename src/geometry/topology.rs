//! Loop tracing and polygon assembly
//!
//! Shared by the boolean engine and unfracture: both end with a bag of
//! directed edges that have the filled region on their left.

use std::collections::BTreeMap;

use super::predicates::{locate_point2, Containment};
use super::types::{Outline, Point, Polygon, PolygonSet, Vertex};

/// Edge leaving `from` (which may carry an arc tag) and ending at `to`
#[derive(Debug, Clone, Copy)]
pub(crate) struct DirectedEdge {
    pub from: Vertex,
    pub to: Point,
}

impl DirectedEdge {
    pub fn straight(from: Point, to: Point) -> Self {
        Self { from: Vertex::new(from), to }
    }
}

/// Turn class of `d` relative to incoming direction `d_in`: left turns rank
/// highest, then straight on, right turns, and a full reversal last.
fn turn_class(d_in: Point, d: Point) -> u8 {
    let cross = d_in.cross(d);
    if cross > 0 {
        3
    } else if cross < 0 {
        1
    } else if d_in.dot(d) > 0 {
        2
    } else {
        0
    }
}

/// `d1` is a sharper left turn than `d2`
fn is_more_left(d_in: Point, d1: Point, d2: Point) -> bool {
    let c1 = turn_class(d_in, d1);
    let c2 = turn_class(d_in, d2);
    if c1 != c2 {
        return c1 > c2;
    }
    match c1 {
        3 | 1 => d2.cross(d1) > 0,
        _ => false,
    }
}

/// Chain edges into closed loops. At every vertex the left-most unused
/// continuation is taken, so loops that touch at a vertex stay separate.
/// Chains that cannot be closed are dropped with a warning.
pub(crate) fn trace_loops(edges: &[DirectedEdge]) -> Vec<Vec<Vertex>> {
    let mut outgoing: BTreeMap<Point, Vec<usize>> = BTreeMap::new();
    for (i, e) in edges.iter().enumerate() {
        outgoing.entry(e.from.pos).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut loops = Vec::new();

    for start in 0..edges.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let origin = edges[start].from.pos;
        let mut chain = vec![edges[start].from];
        let mut cur = start;
        let mut closed = false;

        loop {
            let at = edges[cur].to;
            if at == origin {
                closed = true;
                break;
            }
            let d_in = at - edges[cur].from.pos;
            let mut best: Option<usize> = None;
            if let Some(candidates) = outgoing.get(&at) {
                for &k in candidates {
                    if used[k] {
                        continue;
                    }
                    let d = edges[k].to - at;
                    best = match best {
                        Some(b) if !is_more_left(d_in, d, edges[b].to - at) => Some(b),
                        _ => Some(k),
                    };
                }
            }
            match best {
                Some(k) => {
                    used[k] = true;
                    chain.push(edges[k].from);
                    cur = k;
                }
                None => break,
            }
        }

        if closed {
            loops.push(chain);
        } else {
            log::warn!("dropping open chain of {} edges starting at {:?}", chain.len(), origin);
        }
    }
    loops
}

/// `hole` lies inside `outline`. Vertices on the outline's boundary are
/// inconclusive; edge midpoints are tried after all vertices.
fn encloses(outline: &[Point], hole: &Outline) -> bool {
    for p in hole.points() {
        match locate_point2(outline, p.doubled()) {
            Containment::Inside => return true,
            Containment::Outside => return false,
            Containment::Boundary => {}
        }
    }
    for (a, b) in hole.edges() {
        match locate_point2(outline, a + b) {
            Containment::Inside => return true,
            Containment::Outside => return false,
            Containment::Boundary => {}
        }
    }
    false
}

/// Turn loops into polygons. Positive-area loops become outlines, negative
/// ones holes of the smallest outline that encloses them. Zero-area loops
/// vanish. The result is normalized.
pub(crate) fn assemble(loops: Vec<Vec<Vertex>>) -> PolygonSet {
    let mut outlines = Vec::new();
    let mut holes = Vec::new();
    for vertices in loops {
        let mut outline = Outline { vertices, closed: true };
        outline.remove_collinear();
        if outline.len() < 3 {
            continue;
        }
        let area = outline.signed_area2();
        if area > 0 {
            outlines.push((area, outline));
        } else if area < 0 {
            holes.push(outline);
        }
    }

    let outline_points: Vec<Vec<Point>> = outlines.iter().map(|(_, o)| o.points().collect()).collect();
    let mut polygons: Vec<Polygon> = outlines.iter().map(|(_, o)| Polygon::new(o.clone())).collect();

    for hole in holes {
        let owner = (0..polygons.len())
            .filter(|&k| encloses(&outline_points[k], &hole))
            .min_by_key(|&k| outlines[k].0);
        match owner {
            Some(k) => polygons[k].holes.push(hole),
            None => log::warn!("dropping hole with {} vertices: no enclosing outline", hole.len()),
        }
    }

    PolygonSet::from_polygons(polygons).normalized()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges_of(points: &[(i64, i64)]) -> Vec<DirectedEdge> {
        let n = points.len();
        (0..n)
            .map(|i| {
                let (x0, y0) = points[i];
                let (x1, y1) = points[(i + 1) % n];
                DirectedEdge::straight(Point::new(x0, y0), Point::new(x1, y1))
            })
            .collect()
    }

    #[test]
    fn test_touching_squares_trace_separately() {
        let mut edges = edges_of(&[(0, 0), (10, 0), (10, 10), (0, 10)]);
        edges.extend(edges_of(&[(10, 10), (20, 10), (20, 20), (10, 20)]));
        let loops = trace_loops(&edges);
        assert_eq!(loops.len(), 2);
        assert!(loops.iter().all(|l| l.len() == 4));
    }

    #[test]
    fn test_assemble_assigns_hole_to_smallest_outline() {
        let outer = edges_of(&[(0, 0), (100, 0), (100, 100), (0, 100)]);
        let island = edges_of(&[(20, 20), (80, 20), (80, 80), (20, 80)]);
        let hole = edges_of(&[(40, 40), (40, 60), (60, 60), (60, 40)]);
        let mut all = outer;
        all.extend(island);
        all.extend(hole);
        let set = assemble(trace_loops(&all));
        assert_eq!(set.outline_count(), 2);
        let owner = set.polygons.iter().find(|p| !p.holes.is_empty()).unwrap();
        assert_eq!(owner.outline.point(0), Point::new(20, 20));
    }

    #[test]
    fn test_left_most_ordering() {
        let d_in = Point::new(1, 0);
        assert!(is_more_left(d_in, Point::new(0, 1), Point::new(1, 0)));
        assert!(is_more_left(d_in, Point::new(-1, 1), Point::new(0, 1)));
        assert!(is_more_left(d_in, Point::new(1, -1), Point::new(0, -1)));
        assert!(is_more_left(d_in, Point::new(0, -1), Point::new(-1, 0)));
    }
}
