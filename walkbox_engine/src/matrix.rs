//! Routing matrix construction and lookup.
//!
//! Built once per scene activation; never partially updated. For every
//! source box the builder records the first box to step into toward each
//! reachable destination, then run-length encodes the table into the
//! compact byte matrix.

use walkbox_formats::NO_BOX;
use walkbox_formats::matrix::MatrixWriter;

use crate::error::SceneError;
use crate::scene::SceneContext;

/// Cost sentinel meaning "no known path yet". Costs live in a single byte,
/// so this doubles as the designed ceiling on path length: scenes whose
/// real shortest paths approach 250 hops are outside the format's limits,
/// and the saturation behavior is deliberately preserved.
pub const INFINITE_BOX_COST: u8 = 250;

/// Arena-backed doubly linked working set of unvisited box ids. Handles are
/// indices into the arena; the whole arena is dropped when the build for
/// one source box finishes.
struct WorkList {
    nodes: Vec<WorkNode>,
    head: Option<u32>,
    tail: Option<u32>,
}

struct WorkNode {
    box_id: usize,
    next: Option<u32>,
    prev: Option<u32>,
}

impl WorkList {
    fn with_capacity(capacity: usize) -> Self {
        WorkList {
            nodes: Vec::with_capacity(capacity),
            head: None,
            tail: None,
        }
    }

    fn push(&mut self, box_id: usize) -> u32 {
        let handle = self.nodes.len() as u32;
        self.nodes.push(WorkNode {
            box_id,
            next: None,
            prev: self.tail,
        });
        match self.tail {
            Some(tail) => self.nodes[tail as usize].next = Some(handle),
            None => self.head = Some(handle),
        }
        self.tail = Some(handle);
        handle
    }

    fn detach(&mut self, handle: u32) {
        let (prev, next) = {
            let node = &self.nodes[handle as usize];
            (node.prev, node.next)
        };
        match prev {
            Some(prev) => self.nodes[prev as usize].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.nodes[next as usize].prev = prev,
            None => self.tail = prev,
        }
    }

    fn head(&self) -> Option<u32> {
        self.head
    }

    fn next(&self, handle: u32) -> Option<u32> {
        self.nodes[handle as usize].next
    }

    fn box_id(&self, handle: u32) -> usize {
        self.nodes[handle as usize].box_id
    }
}

impl SceneContext {
    /// Build the routing matrix for the loaded box set. Runs a
    /// Dijkstra-style relaxation per source box over the subset of
    /// non-invisible boxes; invisible boxes get the trivial self-loop entry
    /// and are never routed through.
    pub fn build_box_matrix(&mut self) -> Result<(), SceneError> {
        let num = self.num_boxes();

        // n*n single-step cost table: 0 on the diagonal, 1 for neighbours,
        // INFINITE_BOX_COST otherwise.
        let mut cost = vec![INFINITE_BOX_COST; num * num];
        for i in 0..num {
            for j in 0..num {
                cost[i * num + j] = if i == j {
                    0
                } else if self.are_neighbours(i as u8, j as u8)? {
                    1
                } else {
                    INFINITE_BOX_COST
                };
            }
        }

        let mut writer = MatrixWriter::new();
        // hops[i]: the first box to step into from the current source toward
        // destination i; best[i]: the tentative path cost used during
        // relaxation.
        let mut hops: Vec<Option<u8>> = vec![None; num];
        let mut best: Vec<i32> = vec![0; num];

        for source in 0..num {
            hops.iter_mut().for_each(|hop| *hop = None);

            if self.box_flags(source as u8)?.invisible() {
                // Only reachable from itself.
                hops[source] = Some(source as u8);
            } else {
                let mut list = WorkList::with_capacity(num);
                let mut source_handle = None;
                for i in 0..num {
                    if !self.box_flags(i as u8)?.invisible() {
                        let handle = list.push(i);
                        if i == source {
                            source_handle = Some(handle);
                        }
                    }
                }

                best[source] = 0;
                hops[source] = Some(source as u8);
                if let Some(handle) = source_handle {
                    list.detach(handle);
                }

                // Seed the frontier with the single-step costs out of the
                // source; the first hop toward a direct neighbour is that
                // neighbour itself.
                let mut cursor = list.head();
                while let Some(handle) = cursor {
                    let i = list.box_id(handle);
                    let step = cost[source * num + i];
                    best[i] = step as i32;
                    hops[i] = (step != INFINITE_BOX_COST).then_some(i as u8);
                    cursor = list.next(handle);
                }

                while let Some(first) = list.head() {
                    // Extract the cheapest unvisited node.
                    let mut min_handle = first;
                    let mut min_cost = INFINITE_BOX_COST as i32;
                    let mut cursor = Some(first);
                    while let Some(handle) = cursor {
                        let i = list.box_id(handle);
                        if best[i] < min_cost {
                            min_cost = best[i];
                            min_handle = handle;
                        }
                        cursor = list.next(handle);
                    }
                    let via = list.box_id(min_handle);
                    list.detach(min_handle);

                    // Relax everything still unvisited, threading the
                    // source's original first hop through to the
                    // destination.
                    let mut cursor = list.head();
                    while let Some(handle) = cursor {
                        let i = list.box_id(handle);
                        let through = cost[via * num + i] as i32 + best[via];
                        if through < best[i] {
                            best[i] = through;
                            hops[i] = hops[via];
                        }
                        cursor = list.next(handle);
                    }
                }
            }

            writer
                .encode_section(&hops)
                .map_err(|_| SceneError::MatrixOverflow)?;
        }

        let matrix = writer.finish().map_err(|_| SceneError::MatrixOverflow)?;
        self.matrix = Some(matrix);
        Ok(())
    }

    /// Next box to traverse from `from` toward `to`, or `None` when no
    /// path exists. Either sentinel id resolves to `None`; querying before
    /// the matrix is built is an error distinct from unreachability.
    pub fn get_path_to_dest_box(&self, from: u8, to: u8) -> Result<Option<u8>, SceneError> {
        if from == NO_BOX || to == NO_BOX {
            return Ok(None);
        }
        let count = self.num_boxes();
        if from as usize >= count {
            return Err(SceneError::IllegalBox { id: from, count });
        }
        if to as usize >= count {
            return Err(SceneError::IllegalBox { id: to, count });
        }
        if from == to {
            return Ok(Some(to));
        }
        let matrix = self.matrix.as_ref().ok_or(SceneError::MatrixNotBuilt)?;
        Ok(matrix.next_hop(from, to))
    }
}
