//! R-tree index over straight segments
//!
//! Used for candidate lookup only; every hit is confirmed with the exact
//! predicates.

use rstar::{RTree, RTreeObject, AABB};

use super::types::Point;

/// A segment plus the caller's index for it
#[derive(Clone, Copy, Debug)]
pub struct IndexedSegment {
    pub a: Point,
    pub b: Point,
    pub index: usize,
}

impl RTreeObject for IndexedSegment {
    type Envelope = AABB<[i64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.a.x, self.a.y], [self.b.x, self.b.y])
    }
}

pub struct SegmentIndex {
    tree: RTree<IndexedSegment>,
}

impl SegmentIndex {
    /// Bulk load segments; each keeps its position in the input as its index
    pub fn new<I: IntoIterator<Item = (Point, Point)>>(segments: I) -> Self {
        let items: Vec<IndexedSegment> = segments
            .into_iter()
            .enumerate()
            .map(|(index, (a, b))| IndexedSegment { a, b, index })
            .collect();
        Self { tree: RTree::bulk_load(items) }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Segments whose bounding box touches the box spanned by `p` and `q`
    pub fn query(&self, p: Point, q: Point) -> impl Iterator<Item = &IndexedSegment> {
        let envelope = AABB::from_corners([p.x, p.y], [q.x, q.y]);
        let hits: Vec<&IndexedSegment> = self.tree.locate_in_envelope_intersecting(&envelope).collect();
        hits.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_finds_touching_boxes() {
        let index = SegmentIndex::new(vec![
            (Point::new(0, 0), Point::new(10, 0)),
            (Point::new(20, 20), Point::new(30, 30)),
            (Point::new(10, 0), Point::new(10, 10)),
        ]);
        assert_eq!(index.len(), 3);
        let mut hits: Vec<usize> = index
            .query(Point::new(10, -5), Point::new(10, 5))
            .map(|s| s.index)
            .collect();
        hits.sort_unstable();
        assert_eq!(hits, vec![0, 2]);
    }
}
