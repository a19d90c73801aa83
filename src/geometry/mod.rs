//! Polygon geometry engine
//!
//! # Submodules
//! - `types` - Points, outlines, polygons and polygon sets
//! - `predicates` - Exact integer orientation and containment tests
//! - `arc` - Arc and circle approximation
//! - `spatial` - R-tree segment index
//! - `boolean` - Union, subtract, intersect, xor
//! - `offset` - Inflate and erode
//! - `fracture` - Hole slitting and its inverse
//! - `tessellation` - Triangulation through earcut

mod arc;
mod boolean;
mod fracture;
mod offset;
mod predicates;
mod spatial;
mod tessellation;
mod topology;
mod types;

pub use types::{ArcTag, BoundingBox, Outline, Point, Polygon, PolygonSet, Vertex};

pub use predicates::{locate_point2, on_segment, orient, segments_intersect, Containment};

pub use arc::{arc_points, circle_polygon, circle_segment_count};

pub use spatial::{IndexedSegment, SegmentIndex};

pub use boolean::{boolean, BooleanOp};

pub use offset::{boundary_band, erode, inflate};

pub use fracture::{fracture, unfracture};

pub use tessellation::{triangulate, Triangulation};
