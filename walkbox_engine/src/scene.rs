//! Scene-scoped state: the box array, routing matrix, and scale data.
//!
//! A `SceneContext` owns everything the pathfinding core needs for the
//! currently loaded scene and is replaced (or reloaded wholesale) on scene
//! change. Nothing here suspends or performs I/O after loading.

use std::collections::HashMap;

use anyhow::{Context, Result};
use log::debug;

use walkbox_formats::matrix::BoxMatrix;
use walkbox_formats::scale::{MAX_SCALE_SLOTS, ScaleSlot};
use walkbox_formats::{BoxCoords, BoxDef, BoxFlags, BoxFormat, NO_BOX, Point, decode_box_table};

use crate::error::SceneError;
use crate::geometry::{closest_pt_on_box_coords, closest_pt_on_line, compare_slope,
    distance_from_pt};

/// Hit tolerance, in pixels, for boxes collapsed to a segment.
const DEGENERATE_BOX_TOLERANCE: u32 = 4;

/// Classic scene height; legacy per-row scale tables are indexed by a y
/// clamped to this.
const DEFAULT_SCREEN_HEIGHT: i32 = 200;

pub struct SceneContext {
    pub(crate) format: BoxFormat,
    pub(crate) boxes: Vec<BoxDef>,
    pub(crate) matrix: Option<BoxMatrix>,
    pub(crate) scale_slots: [Option<ScaleSlot>; MAX_SCALE_SLOTS],
    pub(crate) scale_tables: HashMap<u16, Vec<u8>>,
    pub(crate) no_scaling: bool,
    pub(crate) screen_height: i32,
}

impl SceneContext {
    pub fn new(format: BoxFormat, boxes: Vec<BoxDef>) -> Self {
        SceneContext {
            format,
            boxes,
            matrix: None,
            scale_slots: [None; MAX_SCALE_SLOTS],
            scale_tables: HashMap::new(),
            no_scaling: false,
            screen_height: DEFAULT_SCREEN_HEIGHT,
        }
    }

    /// Decode a box table straight from scene resource bytes.
    pub fn from_table_bytes(format: BoxFormat, bytes: &[u8]) -> Result<Self> {
        let boxes = decode_box_table(format, bytes).context("loading scene box table")?;
        Ok(SceneContext::new(format, boxes))
    }

    /// Replace the whole box set for a scene change. Drops the routing
    /// matrix and all scale state; the caller rebuilds the matrix once the
    /// new scene is active.
    pub fn load_scene(&mut self, format: BoxFormat, boxes: Vec<BoxDef>) {
        self.format = format;
        self.boxes = boxes;
        self.matrix = None;
        self.scale_slots = [None; MAX_SCALE_SLOTS];
        self.scale_tables.clear();
    }

    pub fn format(&self) -> BoxFormat {
        self.format
    }

    pub fn num_boxes(&self) -> usize {
        self.boxes.len()
    }

    pub fn matrix(&self) -> Option<&BoxMatrix> {
        self.matrix.as_ref()
    }

    pub fn set_no_scaling(&mut self, no_scaling: bool) {
        self.no_scaling = no_scaling;
    }

    pub fn set_screen_height(&mut self, height: i32) {
        self.screen_height = height;
    }

    /// Resolve a box id. `NO_BOX` (255) is the "no box" sentinel and yields
    /// `None`; any other id outside the table is corrupted scene data.
    pub fn box_def(&self, id: u8) -> Result<Option<&BoxDef>, SceneError> {
        if id == NO_BOX {
            return Ok(None);
        }
        self.boxes
            .get(id as usize)
            .map(Some)
            .ok_or(SceneError::IllegalBox {
                id,
                count: self.boxes.len(),
            })
    }

    fn box_def_mut(&mut self, id: u8) -> Result<&mut BoxDef, SceneError> {
        let count = self.boxes.len();
        if id == NO_BOX {
            return Err(SceneError::IllegalBox { id, count });
        }
        self.boxes
            .get_mut(id as usize)
            .ok_or(SceneError::IllegalBox { id, count })
    }

    pub fn box_coords(&self, id: u8) -> Result<Option<BoxCoords>, SceneError> {
        Ok(self.box_def(id)?.map(|def| def.coords))
    }

    /// Flags for a box; the sentinel reads as no flags set.
    pub fn box_flags(&self, id: u8) -> Result<BoxFlags, SceneError> {
        Ok(self.box_def(id)?.map(|def| def.flags).unwrap_or_default())
    }

    /// Scriptable flag write. Writing through the sentinel is a logic bug.
    pub fn set_box_flags(&mut self, id: u8, flags: BoxFlags) -> Result<(), SceneError> {
        debug!("set_box_flags({id}, {:#04x})", flags.0);
        self.box_def_mut(id)?.flags = flags;
        Ok(())
    }

    /// Z-plane mask for a box; the sentinel reads as mask 0.
    pub fn box_mask(&self, id: u8) -> Result<u8, SceneError> {
        Ok(self.box_def(id)?.map(|def| def.mask).unwrap_or(0))
    }

    /// Scriptable scale write. V2 data has no scale field at all.
    pub fn set_box_scale(&mut self, id: u8, scale: u32) -> Result<(), SceneError> {
        if self.format == BoxFormat::V2 {
            return Err(SceneError::UnsupportedByFormat {
                op: "set_box_scale",
                format: self.format,
            });
        }
        self.box_def_mut(id)?.scale = scale;
        Ok(())
    }

    /// Point a box at a scale slot. Only V8 data carries slot references.
    pub fn set_box_scale_slot(&mut self, id: u8, slot: u16) -> Result<(), SceneError> {
        if self.format != BoxFormat::V8 {
            return Err(SceneError::UnsupportedByFormat {
                op: "set_box_scale_slot",
                format: self.format,
            });
        }
        if slot == 0 || slot as usize > MAX_SCALE_SLOTS {
            return Err(SceneError::InvalidScaleSlot(slot));
        }
        self.box_def_mut(id)?.scale_slot = slot;
        Ok(())
    }

    /// Install a scale slot record, 1-based.
    pub fn set_scale_slot(&mut self, slot: u16, record: ScaleSlot) -> Result<(), SceneError> {
        if slot == 0 || slot as usize > MAX_SCALE_SLOTS {
            return Err(SceneError::InvalidScaleSlot(slot));
        }
        self.scale_slots[slot as usize - 1] = Some(record);
        Ok(())
    }

    /// Install a legacy per-row scale table.
    pub fn set_scale_table(&mut self, index: u16, table: Vec<u8>) {
        self.scale_tables.insert(index, table);
    }

    /// Full point-in-box test, including degenerate boxes collapsed to a
    /// segment, which hit within a small tolerance of the segment.
    pub fn check_xy_in_box_bounds(&self, id: u8, x: i32, y: i32) -> Result<bool, SceneError> {
        let Some(coords) = self.box_coords(id)? else {
            return Ok(false);
        };
        let p = Point { x, y };
        let c = coords.corners();

        if c.iter().all(|corner| x < corner.x) || c.iter().all(|corner| x > corner.x) {
            return Ok(false);
        }
        if c.iter().all(|corner| y < corner.y) || c.iter().all(|corner| y > corner.y) {
            return Ok(false);
        }

        let collapsed_horizontally = coords.ul == coords.ur && coords.lr == coords.ll;
        let collapsed_vertically = coords.ul == coords.ll && coords.ur == coords.lr;
        if collapsed_horizontally || collapsed_vertically {
            let hit = closest_pt_on_line(coords.ul, coords.lr, p);
            if distance_from_pt(p, hit) <= DEGENERATE_BOX_TOLERANCE * DEGENERATE_BOX_TOLERANCE {
                return Ok(true);
            }
        }

        if !compare_slope(coords.ul, coords.ur, p) {
            return Ok(false);
        }
        if !compare_slope(coords.ur, coords.lr, p) {
            return Ok(false);
        }
        if !compare_slope(coords.ll, p, coords.lr) {
            return Ok(false);
        }
        if !compare_slope(coords.ul, p, coords.ll) {
            return Ok(false);
        }
        Ok(true)
    }

    /// Coarse bounding pre-filter: can the point be within `threshold`
    /// pixels of the box? Threshold 0 never rejects.
    pub fn in_box_quick_reject(
        &self,
        id: u8,
        x: i32,
        y: i32,
        threshold: i32,
    ) -> Result<bool, SceneError> {
        let Some(coords) = self.box_coords(id)? else {
            return Ok(false);
        };
        if threshold == 0 {
            return Ok(true);
        }
        let c = coords.corners();
        if c.iter().all(|corner| x - threshold > corner.x) {
            return Ok(false);
        }
        if c.iter().all(|corner| x + threshold < corner.x) {
            return Ok(false);
        }
        if c.iter().all(|corner| y - threshold > corner.y) {
            return Ok(false);
        }
        if c.iter().all(|corner| y + threshold < corner.y) {
            return Ok(false);
        }
        Ok(true)
    }

    /// Closest point on a box's boundary with its capped squared distance.
    pub fn closest_pt_on_box(&self, id: u8, pt: Point) -> Result<(Point, u32), SceneError> {
        let coords = self
            .box_coords(id)?
            .ok_or(SceneError::IllegalBox {
                id,
                count: self.boxes.len(),
            })?;
        Ok(closest_pt_on_box_coords(&coords, pt))
    }

    /// Topmost visible box containing the point, scanning ids downward.
    /// A visible player-only box anywhere in the scan aborts the search;
    /// those regions gate the point to scripted actors only.
    pub fn special_box_at(&self, x: i32, y: i32) -> Result<Option<u8>, SceneError> {
        for id in (0..self.num_boxes() as u8).rev() {
            let flags = self.box_flags(id)?;
            if !flags.invisible() && flags.player_only() {
                return Ok(None);
            }
            if self.check_xy_in_box_bounds(id, x, y)? {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }
}
