//! Integer geometry primitives shared by hit-testing, gate-finding, and the
//! walk solver.

use walkbox_formats::{BoxCoords, Point};

/// Squared distance between two points, capped at `0xFFFF` whenever either
/// axis delta reaches 256. The cap is a precision guard: callers only ever
/// compare these values, and the cap keeps the squares inside 16 bits.
pub fn distance_from_pt(p: Point, q: Point) -> u32 {
    let dx = (q.x - p.x).unsigned_abs();
    if dx >= 0x100 {
        return 0xFFFF;
    }
    let dy = (q.y - p.y).unsigned_abs();
    if dy >= 0x100 {
        return 0xFFFF;
    }
    dx * dx + dy * dy
}

/// Whether `p3` lies on or below the line through `p1`-`p2`, in the screen's
/// y-down orientation. Two calls with candidate points on opposite sides of
/// a segment differ, which is how crossing tests are phrased.
pub fn compare_slope(p1: Point, p2: Point, p3: Point) -> bool {
    (p2.y - p1.y) as i64 * (p3.x - p1.x) as i64 <= (p3.y - p1.y) as i64 * (p2.x - p1.x) as i64
}

/// Closest point to `pt` on the segment `a`-`b`.
///
/// The projection uses truncating integer math; the boundary clamp
/// afterwards snaps overshoots back to whichever endpoint was exceeded,
/// branching on the segment's dominant axis and direction.
pub fn closest_pt_on_line(a: Point, b: Point, pt: Point) -> Point {
    let mut x2;
    let mut y2;

    if b.x == a.x {
        // Vertical segment.
        x2 = a.x;
        y2 = pt.y;
    } else if b.y == a.y {
        // Horizontal segment.
        x2 = pt.x;
        y2 = a.y;
    } else {
        let lydiff = (b.y - a.y) as i64;
        let lxdiff = (b.x - a.x) as i64;
        let dist = lxdiff * lxdiff + lydiff * lydiff;

        if lxdiff.abs() > lydiff.abs() {
            let pa = a.x as i64 * lydiff / lxdiff;
            let pb = pt.x as i64 * lxdiff / lydiff;
            let c = (pa + pb - a.y as i64 + pt.y as i64) * lydiff * lxdiff / dist;
            x2 = c as i32;
            y2 = (c * lydiff / lxdiff - pa + a.y as i64) as i32;
        } else {
            let pa = a.y as i64 * lxdiff / lydiff;
            let pb = pt.y as i64 * lydiff / lxdiff;
            let c = (pa + pb - a.x as i64 + pt.x as i64) * lydiff * lxdiff / dist;
            y2 = c as i32;
            x2 = (c * lxdiff / lydiff - pa + a.x as i64) as i32;
        }
    }

    let lxdiff = b.x - a.x;
    let lydiff = b.y - a.y;

    if lydiff.abs() < lxdiff.abs() {
        if lxdiff > 0 {
            if x2 < a.x {
                x2 = a.x;
                y2 = a.y;
            } else if x2 > b.x {
                x2 = b.x;
                y2 = b.y;
            }
        } else if x2 > a.x {
            x2 = a.x;
            y2 = a.y;
        } else if x2 < b.x {
            x2 = b.x;
            y2 = b.y;
        }
    } else if lydiff > 0 {
        if y2 < a.y {
            x2 = a.x;
            y2 = a.y;
        } else if y2 > b.y {
            x2 = b.x;
            y2 = b.y;
        }
    } else if y2 > a.y {
        x2 = a.x;
        y2 = a.y;
    } else if y2 < b.y {
        x2 = b.x;
        y2 = b.y;
    }

    Point { x: x2, y: y2 }
}

/// Closest point to `pt` on the box's boundary, with its capped squared
/// distance. Checks all four edges, keeping the best.
pub fn closest_pt_on_box_coords(coords: &BoxCoords, pt: Point) -> (Point, u32) {
    let edges = [
        (coords.ul, coords.ur),
        (coords.ur, coords.lr),
        (coords.lr, coords.ll),
        (coords.ll, coords.ul),
    ];
    let mut best = pt;
    let mut best_dist = 0xFFFFu32;
    for (from, to) in edges {
        let candidate = closest_pt_on_line(from, to, pt);
        let dist = distance_from_pt(pt, candidate);
        if dist < best_dist {
            best_dist = dist;
            best = candidate;
        }
    }
    (best, best_dist)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: i32, y: i32) -> Point {
        Point { x, y }
    }

    #[test]
    fn distance_squares_small_deltas() {
        assert_eq!(distance_from_pt(pt(0, 0), pt(3, 4)), 25);
        assert_eq!(distance_from_pt(pt(10, 10), pt(10, 10)), 0);
    }

    #[test]
    fn distance_caps_large_deltas() {
        assert_eq!(distance_from_pt(pt(0, 0), pt(256, 0)), 0xFFFF);
        assert_eq!(distance_from_pt(pt(0, 0), pt(0, -300)), 0xFFFF);
        // just under the cap still squares normally
        assert_eq!(distance_from_pt(pt(0, 0), pt(255, 0)), 255 * 255);
    }

    #[test]
    fn projection_onto_axis_aligned_segments() {
        // vertical segment x=5
        assert_eq!(closest_pt_on_line(pt(5, 0), pt(5, 10), pt(0, 4)), pt(5, 4));
        // horizontal segment y=7
        assert_eq!(closest_pt_on_line(pt(0, 7), pt(10, 7), pt(3, 0)), pt(3, 7));
    }

    #[test]
    fn projection_clamps_to_endpoints() {
        assert_eq!(closest_pt_on_line(pt(0, 0), pt(10, 0), pt(-5, 3)), pt(0, 0));
        assert_eq!(closest_pt_on_line(pt(0, 0), pt(10, 0), pt(15, 3)), pt(10, 0));
        // reversed direction clamps the same corners
        assert_eq!(closest_pt_on_line(pt(10, 0), pt(0, 0), pt(-5, 3)), pt(0, 0));
        // dominant-y segments clamp on y
        assert_eq!(closest_pt_on_line(pt(0, 0), pt(0, 10), pt(2, -4)), pt(0, 0));
        assert_eq!(closest_pt_on_line(pt(0, 10), pt(0, 0), pt(2, 14)), pt(0, 10));
    }

    #[test]
    fn projection_onto_diagonal_segment() {
        let hit = closest_pt_on_line(pt(0, 0), pt(10, 10), pt(10, 0));
        // exact midpoint, allowing for the truncating arithmetic
        assert!((hit.x - 5).abs() <= 1 && (hit.y - 5).abs() <= 1, "{hit:?}");
    }

    #[test]
    fn slope_comparison_splits_the_plane() {
        let a = pt(0, 0);
        let b = pt(10, 0);
        assert_ne!(
            compare_slope(a, b, pt(5, -5)),
            compare_slope(a, b, pt(5, 5))
        );
    }

    #[test]
    fn closest_point_on_degenerate_box() {
        // box collapsed to the segment (0,0)-(10,0)
        let coords = BoxCoords {
            ul: pt(0, 0),
            ur: pt(10, 0),
            lr: pt(10, 0),
            ll: pt(0, 0),
        };
        let (hit, dist) = closest_pt_on_box_coords(&coords, pt(5, 3));
        assert_eq!(hit, pt(5, 0));
        assert_eq!(dist, 9);
    }
}
