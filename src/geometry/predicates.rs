//! Exact integer predicates
//!
//! All products are taken in `i128`, which is wide enough for coordinates in
//! the clamped range even after doubling.

use super::types::Point;

/// Position of a point relative to a closed outline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    Inside,
    Outside,
    Boundary,
}

/// Twice the signed area of triangle `abc`; positive when `c` is left of `a -> b`
pub fn orient(a: Point, b: Point, c: Point) -> i128 {
    (b - a).cross(c - a)
}

/// `p` lies on the closed segment `ab`
pub fn on_segment(a: Point, b: Point, p: Point) -> bool {
    orient(a, b, p) == 0
        && p.x >= a.x.min(b.x)
        && p.x <= a.x.max(b.x)
        && p.y >= a.y.min(b.y)
        && p.y <= a.y.max(b.y)
}

/// `p` lies on segment `ab` and is not one of its endpoints
pub fn strictly_inside_segment(a: Point, b: Point, p: Point) -> bool {
    p != a && p != b && on_segment(a, b, p)
}

/// Closed segments `ab` and `cd` share at least one point
pub fn segments_intersect(a: Point, b: Point, c: Point, d: Point) -> bool {
    let o1 = orient(a, b, c).signum();
    let o2 = orient(a, b, d).signum();
    let o3 = orient(c, d, a).signum();
    let o4 = orient(c, d, b).signum();

    if o1 * o2 < 0 && o3 * o4 < 0 {
        return true;
    }
    (o1 == 0 && on_segment(a, b, c))
        || (o2 == 0 && on_segment(a, b, d))
        || (o3 == 0 && on_segment(c, d, a))
        || (o4 == 0 && on_segment(c, d, b))
}

/// Segments cross at a single point interior to both
pub fn segments_cross_properly(a: Point, b: Point, c: Point, d: Point) -> bool {
    let o1 = orient(a, b, c).signum();
    let o2 = orient(a, b, d).signum();
    let o3 = orient(c, d, a).signum();
    let o4 = orient(c, d, b).signum();
    o1 * o2 < 0 && o3 * o4 < 0
}

/// Integer division rounding half away from zero
pub fn div_round(num: i128, den: i128) -> i128 {
    let (num, den) = if den < 0 { (-num, -den) } else { (num, den) };
    if num >= 0 {
        (num + den / 2) / den
    } else {
        -((-num + den / 2) / den)
    }
}

/// Intersection of the lines through `ab` and `cd`, rounded to the nearest
/// integer point. `None` for parallel lines.
pub fn line_intersection(a: Point, b: Point, c: Point, d: Point) -> Option<Point> {
    let r = b - a;
    let s = d - c;
    let den = r.cross(s);
    if den == 0 {
        return None;
    }
    let num = (c - a).cross(s);
    let x = a.x as i128 + div_round(r.x as i128 * num, den);
    let y = a.y as i128 + div_round(r.y as i128 * num, den);
    Some(Point::new(x as i64, y as i64))
}

/// Locate a point given in doubled coordinates against a closed chain of
/// undoubled vertices, using the non-zero winding rule.
pub fn locate_point2(points: &[Point], p2: Point) -> Containment {
    let n = points.len();
    if n < 3 {
        return Containment::Outside;
    }
    let mut winding = 0i32;
    for i in 0..n {
        let a = points[i].doubled();
        let b = points[(i + 1) % n].doubled();
        if on_segment(a, b, p2) {
            return Containment::Boundary;
        }
        if a.y <= p2.y {
            if b.y > p2.y && orient(a, b, p2) > 0 {
                winding += 1;
            }
        } else if b.y <= p2.y && orient(a, b, p2) < 0 {
            winding -= 1;
        }
    }
    if winding != 0 {
        Containment::Inside
    } else {
        Containment::Outside
    }
}

/// Direction `d` leaves vertex `v` into the region on the left of the chain
/// `prev -> v -> next`. Directions along either incident edge do not count.
pub fn in_interior_wedge(prev: Point, v: Point, next: Point, d: Point) -> bool {
    let e_in = prev - v;
    let e_out = next - v;
    let convex = e_out.cross(e_in) >= 0;
    if convex {
        e_out.cross(d) > 0 && d.cross(e_in) > 0
    } else {
        !(e_in.cross(d) >= 0 && d.cross(e_out) >= 0)
    }
}
