//! Arc and circle approximation
//!
//! Segment counts follow the usual sagitta bound: a chord of an arc with
//! radius `r` deviates by at most `max_error` when its half angle is no more
//! than `acos(1 - max_error / r)`.

use std::f64::consts::PI;

use super::types::{ArcTag, Outline, Point, Vertex};

/// Smallest number of segments ever used for a full circle
const MIN_CIRCLE_SEGMENTS: usize = 8;

/// Upper bound so tiny errors on huge radii stay tractable
const MAX_CIRCLE_SEGMENTS: usize = 3600;

/// Segments needed for a full circle, rounded up to a multiple of 4
pub fn circle_segment_count(radius: i64, max_error: i64) -> usize {
    let r = radius.max(1) as f64;
    let err = max_error.max(1) as f64;
    let n = if err >= r {
        MIN_CIRCLE_SEGMENTS
    } else {
        let half_angle = (1.0 - err / r).acos();
        (PI / half_angle).ceil() as usize
    };
    let n = n.clamp(MIN_CIRCLE_SEGMENTS, MAX_CIRCLE_SEGMENTS);
    n.div_ceil(4) * 4
}

/// Regular polygon enclosing the disc of `radius` around `center`.
/// Vertices sit at `radius / cos(pi / n)` and start half a step off the
/// x axis, so flat edges touch the true circle at 0, 90, 180 and 270 degrees.
pub fn circle_polygon(center: Point, radius: i64, max_error: i64) -> Outline {
    let n = circle_segment_count(radius, max_error);
    let step = 2.0 * PI / n as f64;
    let r = radius as f64 / (PI / n as f64).cos();
    let (cx, cy) = center.to_f64();
    let mut outline = Outline::new();
    for i in 0..n {
        let a = step / 2.0 + step * i as f64;
        outline.push(Point::from_f64(cx + r * a.cos(), cy + r * a.sin()));
    }
    outline.dedup();
    outline
}

/// Interior points of the arc `start -> end` described by `tag`. The end
/// point is not included.
pub fn arc_points(start: Point, end: Point, tag: &ArcTag, max_error: i64) -> Vec<Point> {
    let (cx, cy) = tag.center.to_f64();
    let (sx, sy) = start.to_f64();
    let (ex, ey) = end.to_f64();
    let radius = ((sx - cx).powi(2) + (sy - cy).powi(2)).sqrt();
    if radius == 0.0 {
        return Vec::new();
    }

    let a0 = (sy - cy).atan2(sx - cx);
    let a1 = (ey - cy).atan2(ex - cx);
    let mut sweep = a1 - a0;
    // the mid point decides the direction of travel
    let ccw = (tag.mid - start).cross(end - tag.mid) > 0;
    if ccw {
        while sweep <= 0.0 {
            sweep += 2.0 * PI;
        }
    } else {
        while sweep >= 0.0 {
            sweep -= 2.0 * PI;
        }
    }

    let full = circle_segment_count(radius.round() as i64, max_error) as f64;
    let segments = ((sweep.abs() / (2.0 * PI)) * full).ceil().max(1.0) as usize;
    let step = sweep / segments as f64;
    (1..segments)
        .map(|i| {
            let a = a0 + step * i as f64;
            Point::from_f64(cx + radius * a.cos(), cy + radius * a.sin())
        })
        .collect()
}

impl Outline {
    /// Copy with every arc edge replaced by straight segments
    pub fn approximated(&self, max_error: i64) -> Outline {
        if !self.has_arcs() {
            return self.clone();
        }
        let n = self.vertices.len();
        let mut out = Outline { vertices: Vec::with_capacity(n * 4), closed: self.closed };
        for i in 0..n {
            let v = self.vertices[i];
            out.vertices.push(Vertex::new(v.pos));
            if let Some(tag) = &v.arc {
                let next = self.vertices[(i + 1) % n].pos;
                out.vertices
                    .extend(arc_points(v.pos, next, tag, max_error).into_iter().map(Vertex::new));
            }
        }
        out.dedup();
        out
    }
}
