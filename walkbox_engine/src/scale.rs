//! Position-dependent sprite scale resolution.
//!
//! V8 scenes interpolate between a scale slot's two reference points; V2 and
//! V3 scenes either use a box's constant scale or, when the high bit is set,
//! index a per-row legacy table by the actor's y coordinate.

use walkbox_formats::BoxFormat;
use walkbox_formats::scale::MAX_SCALE_SLOTS;

use crate::error::SceneError;
use crate::scene::SceneContext;

/// High bit on a V2/V3 box scale selects a legacy per-row table.
const LEGACY_TABLE_BIT: u32 = 0x8000;

fn clamp_scale(scale: i32) -> u8 {
    scale.clamp(0, 255) as u8
}

fn clamp_to_range(value: i32, r1: i32, r2: i32) -> i32 {
    let (lo, hi) = if r1 <= r2 { (r1, r2) } else { (r2, r1) };
    value.clamp(lo, hi)
}

fn interpolate(value: i32, v1: i32, scale1: i32, v2: i32, scale2: i32) -> i32 {
    (scale2 - scale1) * (value - v1) / (v2 - v1) + scale1
}

impl SceneContext {
    /// Scale an actor standing at `(x, y)` inside the given box should draw
    /// at. The sentinel box and scenes with scaling disabled resolve to full
    /// scale.
    pub fn scale_at(&self, id: u8, x: i32, y: i32) -> Result<u8, SceneError> {
        if self.no_scaling {
            return Ok(255);
        }
        let Some(def) = self.box_def(id)? else {
            return Ok(255);
        };

        match self.format {
            BoxFormat::V8 if def.scale_slot != 0 => self.scale_from_slot(def.scale_slot, x, y),
            BoxFormat::V8 => Ok(clamp_scale(def.scale as i32)),
            BoxFormat::V2 | BoxFormat::V3 => {
                if def.scale & LEGACY_TABLE_BIT != 0 {
                    let table_id = (def.scale & 0x7FFF) as u16 + 1;
                    let table = self
                        .scale_tables
                        .get(&table_id)
                        .filter(|table| !table.is_empty())
                        .ok_or(SceneError::MissingScaleTable(table_id))?;
                    let row = y.clamp(0, self.screen_height - 1) as usize;
                    Ok(table[row.min(table.len() - 1)])
                } else {
                    Ok(clamp_scale(def.scale as i32))
                }
            }
        }
    }

    /// Interpolated scale from a populated 1-based slot. Positions clamp to
    /// the slot's reference ranges, so the result is monotonic between the
    /// reference points and flat outside them.
    fn scale_from_slot(&self, slot: u16, x: i32, y: i32) -> Result<u8, SceneError> {
        if slot == 0 || slot as usize > MAX_SCALE_SLOTS {
            return Err(SceneError::InvalidScaleSlot(slot));
        }
        let record = self.scale_slots[slot as usize - 1].ok_or(SceneError::InvalidScaleSlot(slot))?;
        if record.is_degenerate() {
            return Err(SceneError::InvalidScaleSlot(slot));
        }

        let scale = if record.y1 == record.y2 {
            let x = clamp_to_range(x, record.x1, record.x2);
            interpolate(x, record.x1, record.scale1, record.x2, record.scale2)
        } else if record.x1 == record.x2 {
            let y = clamp_to_range(y, record.y1, record.y2);
            interpolate(y, record.y1, record.scale1, record.y2, record.scale2)
        } else {
            let x = clamp_to_range(x, record.x1, record.x2);
            let y = clamp_to_range(y, record.y1, record.y2);
            let scale_x = interpolate(x, record.x1, record.scale1, record.x2, record.scale2);
            let scale_y = interpolate(y, record.y1, record.scale1, record.y2, record.scale2);
            (scale_x + scale_y) / 2
        };
        Ok(clamp_scale(scale))
    }

    /// Raw constant scale of a box, with no position resolution. Scenes
    /// with scaling disabled and the sentinel both read as full scale.
    pub fn box_scale(&self, id: u8) -> Result<u32, SceneError> {
        if self.no_scaling {
            return Ok(255);
        }
        Ok(self.box_def(id)?.map(|def| def.scale).unwrap_or(255))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use walkbox_formats::scale::ScaleSlot;
    use walkbox_formats::{BoxCoords, BoxDef, NO_BOX, Point};

    fn rect(x0: i32, y0: i32, x1: i32, y1: i32) -> BoxDef {
        BoxDef::new(BoxCoords {
            ul: Point::new(x0, y0),
            ur: Point::new(x1, y0),
            lr: Point::new(x1, y1),
            ll: Point::new(x0, y1),
        })
    }

    fn v8_scene_with_slot(slot: ScaleSlot) -> SceneContext {
        let mut ctx = SceneContext::new(BoxFormat::V8, vec![rect(0, 0, 100, 200)]);
        ctx.set_scale_slot(1, slot).unwrap();
        ctx.set_box_scale_slot(0, 1).unwrap();
        ctx
    }

    fn y_ramp() -> ScaleSlot {
        ScaleSlot {
            x1: 0,
            y1: 100,
            scale1: 60,
            x2: 0,
            y2: 200,
            scale2: 160,
        }
    }

    #[test]
    fn scaling_disabled_and_sentinel_resolve_to_full() {
        let mut ctx = SceneContext::new(BoxFormat::V3, vec![rect(0, 0, 10, 10)]);
        ctx.set_box_scale(0, 80).unwrap();
        assert_eq!(ctx.scale_at(NO_BOX, 5, 5), Ok(255));
        assert_eq!(ctx.box_scale(NO_BOX), Ok(255));
        ctx.set_no_scaling(true);
        assert_eq!(ctx.scale_at(0, 5, 5), Ok(255));
        assert_eq!(ctx.box_scale(0), Ok(255));
    }

    #[test]
    fn constant_scale_ignores_position() {
        let mut ctx = SceneContext::new(BoxFormat::V3, vec![rect(0, 0, 10, 10)]);
        ctx.set_box_scale(0, 80).unwrap();
        assert_eq!(ctx.scale_at(0, 2, 2), Ok(80));
        assert_eq!(ctx.scale_at(0, 9, 9), Ok(80));
        assert_eq!(ctx.box_scale(0), Ok(80));
        // zero is a legitimate constant, not clipped upward
        ctx.set_box_scale(0, 0).unwrap();
        assert_eq!(ctx.scale_at(0, 2, 2), Ok(0));
        assert_eq!(ctx.box_scale(0), Ok(0));
    }

    #[test]
    fn legacy_table_indexes_by_clamped_y() {
        let mut ctx = SceneContext::new(BoxFormat::V3, vec![rect(0, 0, 100, 200)]);
        ctx.set_box_scale(0, LEGACY_TABLE_BIT | 2).unwrap();
        let table: Vec<u8> = (0..200).map(|row| (row / 2) as u8 + 50).collect();
        ctx.set_scale_table(3, table);
        assert_eq!(ctx.scale_at(0, 10, 0), Ok(50));
        assert_eq!(ctx.scale_at(0, 10, 100), Ok(100));
        assert_eq!(ctx.scale_at(0, 10, -5), Ok(50));
        // beyond the screen clamps to the last row
        assert_eq!(ctx.scale_at(0, 10, 5000), Ok(149));
    }

    #[test]
    fn missing_legacy_table_is_fatal() {
        let mut ctx = SceneContext::new(BoxFormat::V3, vec![rect(0, 0, 10, 10)]);
        ctx.set_box_scale(0, LEGACY_TABLE_BIT | 4).unwrap();
        assert_eq!(ctx.scale_at(0, 5, 5), Err(SceneError::MissingScaleTable(5)));
    }

    #[test]
    fn slot_interpolates_monotonically_along_y() {
        let ctx = v8_scene_with_slot(y_ramp());
        assert_eq!(ctx.scale_at(0, 50, 100), Ok(60));
        assert_eq!(ctx.scale_at(0, 50, 150), Ok(110));
        assert_eq!(ctx.scale_at(0, 50, 200), Ok(160));
        let mut previous = 0;
        for y in 90..=210 {
            let scale = ctx.scale_at(0, 50, y).unwrap();
            assert!(scale >= previous, "scale regressed at y={y}");
            previous = scale;
        }
    }

    #[test]
    fn slot_is_flat_outside_its_reference_range() {
        let ctx = v8_scene_with_slot(y_ramp());
        assert_eq!(ctx.scale_at(0, 50, 0), Ok(60));
        assert_eq!(ctx.scale_at(0, 50, 5000), Ok(160));
    }

    #[test]
    fn slot_varying_on_both_axes_averages() {
        let ctx = v8_scene_with_slot(ScaleSlot {
            x1: 0,
            y1: 0,
            scale1: 100,
            x2: 100,
            y2: 100,
            scale2: 200,
        });
        // x interpolates to 120, y to 180
        assert_eq!(ctx.scale_at(0, 20, 80), Ok(150));
    }

    #[test]
    fn degenerate_and_unpopulated_slots_are_fatal() {
        let mut ctx = SceneContext::new(BoxFormat::V8, vec![rect(0, 0, 10, 10)]);
        ctx.set_box_scale_slot(0, 2).unwrap();
        assert_eq!(ctx.scale_at(0, 5, 5), Err(SceneError::InvalidScaleSlot(2)));
        ctx.set_scale_slot(
            2,
            ScaleSlot {
                x1: 5,
                y1: 5,
                scale1: 10,
                x2: 5,
                y2: 5,
                scale2: 90,
            },
        )
        .unwrap();
        assert_eq!(ctx.scale_at(0, 5, 5), Err(SceneError::InvalidScaleSlot(2)));
    }

    #[test]
    fn v8_slot_zero_uses_the_constant() {
        let mut ctx = SceneContext::new(BoxFormat::V8, vec![rect(0, 0, 10, 10)]);
        ctx.set_box_scale(0, 90).unwrap();
        assert_eq!(ctx.scale_at(0, 5, 5), Ok(90));
        // out-of-range constants clip into the drawable range
        ctx.set_box_scale(0, 4000).unwrap();
        assert_eq!(ctx.scale_at(0, 5, 5), Ok(255));
    }

    #[test]
    fn result_clips_to_drawable_range() {
        let ctx = v8_scene_with_slot(ScaleSlot {
            x1: 0,
            y1: 0,
            scale1: -40,
            x2: 0,
            y2: 100,
            scale2: 400,
        });
        assert_eq!(ctx.scale_at(0, 0, 0), Ok(0));
        assert_eq!(ctx.scale_at(0, 0, 100), Ok(255));
    }
}
