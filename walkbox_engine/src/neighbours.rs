//! Shared-edge neighbour classification.
//!
//! Two boxes are neighbours when they share a colinear vertical or
//! horizontal edge with a nonzero overlapping range. Corner winding order is
//! not guaranteed consistent in scene data, so the edge test is retried
//! across all sixteen rotation combinations of the two corner cycles.

use walkbox_formats::BoxCoords;

use crate::error::SceneError;
use crate::scene::SceneContext;

fn ordered(a: i32, b: i32) -> (i32, i32) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Overlap test along one axis for two edges already known to be colinear.
/// Edges that merely touch at a single endpoint do not count, unless one of
/// the edges is itself degenerate (a point), in which case the touch is the
/// whole shared segment.
fn ranges_overlap(a0: i32, a1: i32, b0: i32, b1: i32) -> bool {
    let (a_lo, a_hi) = ordered(a0, a1);
    let (b_lo, b_hi) = ordered(b0, b1);
    if b_hi < a_lo || b_lo > a_hi {
        return false;
    }
    let touching_only = (b_lo == a_hi || b_hi == a_lo) && a_lo != a_hi && b_lo != b_hi;
    !touching_only
}

pub(crate) fn coords_are_neighbours(first: &BoxCoords, second: &BoxCoords) -> bool {
    let mut a = *first;
    for _ in 0..4 {
        let mut b = *second;
        for _ in 0..4 {
            // Colinear vertical upper edges on both boxes.
            if a.ur.x == a.ul.x
                && b.ul.x == a.ul.x
                && b.ur.x == a.ur.x
                && ranges_overlap(a.ul.y, a.ur.y, b.ul.y, b.ur.y)
            {
                return true;
            }
            // Colinear horizontal upper edges on both boxes.
            if a.ur.y == a.ul.y
                && b.ul.y == a.ul.y
                && b.ur.y == a.ur.y
                && ranges_overlap(a.ul.x, a.ur.x, b.ul.x, b.ur.x)
            {
                return true;
            }
            b.rotate();
        }
        a.rotate();
    }
    false
}

impl SceneContext {
    /// Whether two boxes share a walkable edge. Invisible boxes are never
    /// neighbours of anything, and a box is not its own neighbour.
    pub fn are_neighbours(&self, box1: u8, box2: u8) -> Result<bool, SceneError> {
        if box1 == box2 {
            return Ok(false);
        }
        if self.box_flags(box1)?.invisible() || self.box_flags(box2)?.invisible() {
            return Ok(false);
        }
        let (Some(a), Some(b)) = (self.box_coords(box1)?, self.box_coords(box2)?) else {
            return Ok(false);
        };
        Ok(coords_are_neighbours(&a, &b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use walkbox_formats::{BoxDef, BoxFlags, BoxFormat, Point};

    fn rect(x0: i32, y0: i32, x1: i32, y1: i32) -> BoxDef {
        BoxDef::new(BoxCoords {
            ul: Point::new(x0, y0),
            ur: Point::new(x1, y0),
            lr: Point::new(x1, y1),
            ll: Point::new(x0, y1),
        })
    }

    fn scene(boxes: Vec<BoxDef>) -> SceneContext {
        SceneContext::new(BoxFormat::V3, boxes)
    }

    #[test]
    fn shared_vertical_edge() {
        let ctx = scene(vec![rect(0, 0, 10, 10), rect(10, 0, 20, 10)]);
        assert!(ctx.are_neighbours(0, 1).unwrap());
        assert!(ctx.are_neighbours(1, 0).unwrap());
    }

    #[test]
    fn shared_horizontal_edge() {
        let ctx = scene(vec![rect(0, 0, 10, 10), rect(3, 10, 8, 20)]);
        assert!(ctx.are_neighbours(0, 1).unwrap());
        assert!(ctx.are_neighbours(1, 0).unwrap());
    }

    #[test]
    fn separated_boxes_are_not_neighbours() {
        let ctx = scene(vec![rect(0, 0, 10, 10), rect(20, 0, 30, 10)]);
        assert!(!ctx.are_neighbours(0, 1).unwrap());
    }

    #[test]
    fn corner_touch_does_not_count() {
        let ctx = scene(vec![rect(0, 0, 10, 10), rect(10, 10, 20, 20)]);
        assert!(!ctx.are_neighbours(0, 1).unwrap());
    }

    #[test]
    fn endpoint_touch_along_shared_line_does_not_count() {
        // both sit on x=10, but their y ranges only meet at y=10
        let ctx = scene(vec![rect(0, 0, 10, 10), rect(10, 10, 20, 25)]);
        assert!(!ctx.are_neighbours(0, 1).unwrap());
    }

    #[test]
    fn never_a_neighbour_of_itself() {
        let ctx = scene(vec![rect(0, 0, 10, 10)]);
        assert!(!ctx.are_neighbours(0, 0).unwrap());
    }

    #[test]
    fn invisible_boxes_have_no_neighbours() {
        let mut ctx = scene(vec![rect(0, 0, 10, 10), rect(10, 0, 20, 10)]);
        ctx.set_box_flags(1, BoxFlags(BoxFlags::INVISIBLE)).unwrap();
        assert!(!ctx.are_neighbours(0, 1).unwrap());
        assert!(!ctx.are_neighbours(1, 0).unwrap());
    }

    #[test]
    fn winding_order_does_not_matter() {
        // second box stored with its corner cycle shifted by two
        let shifted = BoxDef::new(BoxCoords {
            ul: Point::new(20, 10),
            ur: Point::new(10, 10),
            lr: Point::new(10, 0),
            ll: Point::new(20, 0),
        });
        let ctx = scene(vec![rect(0, 0, 10, 10), shifted]);
        assert!(ctx.are_neighbours(0, 1).unwrap());
    }

    #[test]
    fn degenerate_box_matches_on_its_own_segment() {
        // a zero-width box sitting exactly on the shared edge
        let sliver = BoxDef::new(BoxCoords {
            ul: Point::new(10, 2),
            ur: Point::new(10, 2),
            lr: Point::new(10, 8),
            ll: Point::new(10, 8),
        });
        let ctx = scene(vec![rect(0, 0, 10, 10), sliver]);
        assert!(ctx.are_neighbours(0, 1).unwrap());
    }

    #[test]
    fn sentinel_box_is_nobodys_neighbour() {
        let ctx = scene(vec![rect(0, 0, 10, 10)]);
        assert!(!ctx.are_neighbours(0, walkbox_formats::NO_BOX).unwrap());
    }
}
