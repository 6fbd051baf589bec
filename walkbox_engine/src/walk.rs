//! Geometric walk solving: waypoints between adjacent boxes.
//!
//! Given the current, next, and final boxes of a route, the solver finds
//! the point on the shared edge an actor should head for. Gate-finding
//! covers the fallback case where two boxes are spatially close without a
//! cleanly aligned shared edge.

use walkbox_formats::{NO_BOX, Point};

use crate::error::SceneError;
use crate::geometry::{closest_pt_on_box_coords, closest_pt_on_line, compare_slope};
use crate::scene::SceneContext;

/// Close points within this much of each other (in pixels) are treated as
/// a parallel pair when choosing a gate.
const GATE_PAIR_TOLERANCE: i32 = 4;

/// The slice of actor movement state the solver consumes: where the actor
/// is now and where it ultimately wants to end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorWalkState {
    pub pos: Point,
    pub dest: Point,
}

/// Outcome of one waypoint computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStep {
    /// Final hop and the actor can already walk straight to its target.
    Arrived,
    /// Head for this point next.
    WalkTo(Point),
    /// No aligned shared edge in any rotation; the caller falls back to
    /// gate crossing.
    Blocked,
}

/// A gate between two boxes: two segments, each running from a point on the
/// first box to its counterpart on the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gates {
    pub a: [Point; 2],
    pub b: [Point; 2],
}

/// Waypoint set produced by the legacy gate-crossing path solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OldWalkPoints {
    pub start: Point,
    /// Crossing point on the near gate segment, when the walk line does not
    /// already clear it.
    pub near_gate: Option<Point>,
    /// Crossing point on the far gate segment.
    pub far_gate: Option<Point>,
    /// Populated when the next box is the final one.
    pub dest: Option<Point>,
}

fn ordered(a: i32, b: i32) -> (i32, i32) {
    if a <= b { (a, b) } else { (b, a) }
}

impl SceneContext {
    /// Compute the next point an actor must walk toward in a straight line
    /// to get from `box1` to `box3` via `box2`.
    ///
    /// Checks every rotation combination of both corner cycles for a
    /// colinear vertical or horizontal shared edge. On the final hop
    /// (`box2 == box3`) the actor's line to its true destination is
    /// projected onto the shared edge so corners get cut naturally.
    pub fn find_path_towards(
        &self,
        actor: &ActorWalkState,
        box1: u8,
        box2: u8,
        box3: u8,
    ) -> Result<WalkStep, SceneError> {
        let (Some(coords1), Some(coords2)) = (self.box_coords(box1)?, self.box_coords(box2)?)
        else {
            return Ok(WalkStep::Blocked);
        };
        let final_hop = box2 == box3;

        let mut a = coords1;
        for _ in 0..4 {
            let mut b = coords2;
            for _ in 0..4 {
                // Shared vertical edge: all four upper corners on one x.
                if a.ul.x == a.ur.x && a.ul.x == b.ul.x && a.ul.x == b.ur.x {
                    let (a_lo, a_hi) = ordered(a.ul.y, a.ur.y);
                    let (b_lo, b_hi) = ordered(b.ul.y, b.ur.y);
                    let touching_only =
                        (a_lo == b_hi || b_lo == a_hi) && a_lo != a_hi && b_lo != b_hi;
                    if !(a_lo > b_hi || b_lo > a_hi || touching_only) {
                        let mut pos = actor.pos.y;
                        if final_hop {
                            let diff_x = actor.dest.x - actor.pos.x;
                            let diff_y = actor.dest.y - actor.pos.y;
                            let box_diff_x = a.ul.x - actor.pos.x;
                            if diff_x != 0 {
                                let num = diff_y * box_diff_x;
                                let mut t = num / diff_x;
                                // A negative projection offset truncated to
                                // zero still has to move a pixel, so the
                                // sign test runs on the numerator, not on
                                // the y delta alone.
                                if t == 0
                                    && (num <= 0 || diff_x <= 0)
                                    && (num >= 0 || diff_x >= 0)
                                {
                                    t = -1;
                                }
                                pos = actor.pos.y + t;
                            }
                        }
                        let q = pos.max(b_lo).min(b_hi).max(a_lo).min(a_hi);
                        if q == pos && final_hop {
                            return Ok(WalkStep::Arrived);
                        }
                        return Ok(WalkStep::WalkTo(Point { x: a.ul.x, y: q }));
                    }
                }

                // Shared horizontal edge: all four upper corners on one y.
                if a.ul.y == a.ur.y && a.ul.y == b.ul.y && a.ul.y == b.ur.y {
                    let (a_lo, a_hi) = ordered(a.ul.x, a.ur.x);
                    let (b_lo, b_hi) = ordered(b.ul.x, b.ur.x);
                    let touching_only =
                        (a_lo == b_hi || b_lo == a_hi) && a_lo != a_hi && b_lo != b_hi;
                    if !(a_lo > b_hi || b_lo > a_hi || touching_only) {
                        let mut pos = actor.pos.x;
                        if final_hop {
                            let diff_x = actor.dest.x - actor.pos.x;
                            let diff_y = actor.dest.y - actor.pos.y;
                            let box_diff_y = a.ul.y - actor.pos.y;
                            if diff_y != 0 {
                                pos += diff_x * box_diff_y / diff_y;
                            }
                        }
                        let q = pos.max(b_lo).min(b_hi).max(a_lo).min(a_hi);
                        if q == pos && final_hop {
                            return Ok(WalkStep::Arrived);
                        }
                        return Ok(WalkStep::WalkTo(Point { x: q, y: a.ul.y }));
                    }
                }

                b.rotate();
            }
            a.rotate();
        }
        Ok(WalkStep::Blocked)
    }

    /// Find the gate between two boxes that lack an aligned shared edge.
    ///
    /// Projects each box's corners onto the other box, keeps the three
    /// closest point pairs of the eight, and picks the best
    /// parallel-enough pair to span the crossing.
    pub fn get_gates(&self, box1: u8, box2: u8) -> Result<Gates, SceneError> {
        let count = self.num_boxes();
        let coords1 = self
            .box_coords(box1)?
            .ok_or(SceneError::IllegalBox { id: box1, count })?;
        let coords2 = self
            .box_coords(box2)?
            .ok_or(SceneError::IllegalBox { id: box2, count })?;

        // Corners 0..4 belong to the first box, 4..8 to the second; each
        // gets its mutual closest point on the opposite box.
        let mut poly = [Point::default(); 8];
        let mut close = [Point::default(); 8];
        let mut dist = [0u32; 8];
        poly[..4].copy_from_slice(&coords1.corners());
        poly[4..].copy_from_slice(&coords2.corners());
        for i in 0..4 {
            let (pt, d) = closest_pt_on_box_coords(&coords2, poly[i]);
            close[i] = pt;
            dist[i] = d;
        }
        for i in 4..8 {
            let (pt, d) = closest_pt_on_box_coords(&coords1, poly[i]);
            close[i] = pt;
            dist[i] = d;
        }

        // The three closest pairs, by capped squared distance, flattened to
        // linear distances for the tolerance comparisons below.
        let mut closest = [0usize; 3];
        let mut min_dist = [0i32; 3];
        let mut on_second = [false; 3];
        for rank in 0..3 {
            let mut best = 0xFFFFu32;
            for i in 0..8 {
                if dist[i] < best {
                    best = dist[i];
                    closest[rank] = i;
                }
            }
            dist[closest[rank]] = 0xFFFF;
            min_dist[rank] = (best as f64).sqrt() as i32;
            on_second[rank] = closest[rank] > 3;
        }

        // Prefer a pair of close points on the same box within the
        // parallel tolerance; fall back through the looser pairings, and
        // finally collapse the gate to the single closest point.
        let (line1, line2) = if on_second[0] == on_second[1]
            && (min_dist[0] - min_dist[1]).abs() < GATE_PAIR_TOLERANCE
        {
            (closest[0], closest[1])
        } else if on_second[0] == on_second[1] && min_dist[0] == min_dist[1] {
            (closest[0], closest[1])
        } else if on_second[0] == on_second[2] && min_dist[0] == min_dist[2] {
            (closest[0], closest[2])
        } else if on_second[1] == on_second[2] && min_dist[1] == min_dist[2] {
            (closest[1], closest[2])
        } else if on_second[0] == on_second[2]
            && (min_dist[0] - min_dist[2]).abs() < GATE_PAIR_TOLERANCE
        {
            (closest[0], closest[2])
        } else if (min_dist[0] - min_dist[2]).abs() < GATE_PAIR_TOLERANCE {
            (closest[1], closest[2])
        } else if (min_dist[0] - min_dist[1]).abs() < GATE_PAIR_TOLERANCE {
            (closest[0], closest[1])
        } else {
            (closest[0], closest[0])
        };

        // Each gate segment runs first-box point to second-box point.
        let orient = |index: usize| -> [Point; 2] {
            if index < 4 {
                [poly[index], close[index]]
            } else {
                [close[index], poly[index]]
            }
        };
        Ok(Gates {
            a: orient(line1),
            b: orient(line2),
        })
    }

    /// Legacy gate-crossing waypoint computation: the route from `box1`
    /// into `box2`, headed ultimately for `box3`.
    ///
    /// When the next box is the final one and the straight walk line
    /// already crosses both gate segments, no intermediate waypoints are
    /// needed at all.
    pub fn find_path_towards_old(
        &self,
        actor: &ActorWalkState,
        box1: u8,
        box2: u8,
        box3: u8,
    ) -> Result<OldWalkPoints, SceneError> {
        let gates = self.get_gates(box1, box2)?;
        let start = actor.pos;
        let mut points = OldWalkPoints {
            start,
            near_gate: None,
            far_gate: None,
            dest: None,
        };

        if box2 == box3 {
            let dest = actor.dest;
            points.dest = Some(dest);
            if compare_slope(start, dest, gates.a[0]) != compare_slope(start, dest, gates.b[0])
                && compare_slope(start, dest, gates.a[1]) != compare_slope(start, dest, gates.b[1])
            {
                return Ok(points);
            }
        }

        let far = closest_pt_on_line(gates.a[1], gates.b[1], start);
        points.far_gate = Some(far);

        if compare_slope(start, far, gates.a[0]) == compare_slope(start, far, gates.b[0]) {
            points.near_gate = Some(closest_pt_on_line(gates.a[0], gates.b[0], start));
        }
        Ok(points)
    }

    /// Convenience wrapper asserting both ids are concrete boxes before
    /// gate-finding; exposed for callers that track boxes as optional ids.
    pub fn gates_between(&self, box1: u8, box2: u8) -> Result<Option<Gates>, SceneError> {
        if box1 == NO_BOX || box2 == NO_BOX {
            return Ok(None);
        }
        self.get_gates(box1, box2).map(Some)
    }
}
