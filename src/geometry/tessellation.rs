//! Triangulation of polygons with holes using earcut

use serde::{Deserialize, Serialize};

use super::types::{Point, Polygon, PolygonSet};

/// Triangle list over a shared vertex array
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Triangulation {
    pub vertices: Vec<Point>,
    pub triangles: Vec<[usize; 3]>,
}

impl Triangulation {
    /// Sum of the triangle areas
    pub fn area(&self) -> f64 {
        self.triangles
            .iter()
            .map(|t| {
                let (a, b, c) = (self.vertices[t[0]], self.vertices[t[1]], self.vertices[t[2]]);
                ((b - a).cross(c - a) as f64 / 2.0).abs()
            })
            .sum()
    }
}

/// Triangulate one polygon. Arcs are flattened with `max_error`.
/// Degenerate holes are skipped; an outline earcut cannot handle yields
/// an empty triangle list.
pub fn triangulate(polygon: &Polygon, max_error: i64) -> Triangulation {
    let mut vertices: Vec<Point> = Vec::new();
    let mut hole_indices: Vec<usize> = Vec::new();

    let outline = polygon.outline.approximated(max_error);
    vertices.extend(outline.points());

    for hole in &polygon.holes {
        let hole = hole.approximated(max_error);
        if hole.len() < 3 {
            continue;
        }
        hole_indices.push(vertices.len());
        vertices.extend(hole.points());
    }

    let flat_coords: Vec<f64> = vertices.iter().flat_map(|p| [p.x as f64, p.y as f64]).collect();
    let indices = earcutr::earcut(&flat_coords, &hole_indices, 2).unwrap_or_default();
    let triangles = indices.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();

    Triangulation { vertices, triangles }
}

impl PolygonSet {
    /// One triangulation per polygon
    pub fn triangulate(&self, max_error: i64) -> Vec<Triangulation> {
        self.polygons.iter().map(|p| triangulate(p, max_error)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::types::Outline;

    #[test]
    fn test_triangulate_square_with_hole() {
        let poly = Polygon::with_holes(
            Outline::rectangle(Point::new(0, 0), Point::new(100, 100)),
            vec![Outline::rectangle(Point::new(25, 25), Point::new(75, 75)).reversed()],
        );
        let tri = triangulate(&poly, 5_000);
        assert_eq!(tri.vertices.len(), 8);
        assert_eq!(tri.triangles.len(), 8);
        assert!((tri.area() - poly.area()).abs() < 1e-6);
    }
}
