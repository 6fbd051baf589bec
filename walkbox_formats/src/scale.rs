//! Scale-slot records.
//!
//! A scale slot maps an in-box position to a sprite scale by linear
//! interpolation between two reference points. Boxes whose scale is driven
//! by position reference a slot 1-based; slot 0 on a box means "use the
//! constant scale value instead".

use std::io::Cursor;

use anyhow::{Result, ensure};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

/// A scene carries at most this many scale slots.
pub const MAX_SCALE_SLOTS: usize = 20;

/// Linear interpolation descriptor: `(x1, y1)` maps to `scale1`,
/// `(x2, y2)` to `scale2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleSlot {
    pub x1: i32,
    pub y1: i32,
    pub scale1: i32,
    pub x2: i32,
    pub y2: i32,
    pub scale2: i32,
}

impl ScaleSlot {
    pub const RECORD_SIZE: usize = 12;

    /// A slot degenerate on both axes carries no usable gradient; resolving
    /// against one is a fatal scene-data error.
    pub fn is_degenerate(&self) -> bool {
        self.y1 == self.y2 && self.x1 == self.x2
    }
}

/// Decode one 12-byte slot record (six `i16` LE fields).
pub fn decode_scale_slot(bytes: &[u8]) -> Result<ScaleSlot> {
    ensure!(
        bytes.len() >= ScaleSlot::RECORD_SIZE,
        "scale slot record truncated: {} bytes",
        bytes.len()
    );
    let mut cursor = Cursor::new(bytes);
    let mut field = || -> Result<i32> { Ok(cursor.read_i16::<LittleEndian>()? as i32) };
    Ok(ScaleSlot {
        x1: field()?,
        y1: field()?,
        scale1: field()?,
        x2: field()?,
        y2: field()?,
        scale2: field()?,
    })
}

/// Decode a count-prefixed table of slot records.
pub fn decode_scale_slot_table(bytes: &[u8]) -> Result<Vec<ScaleSlot>> {
    ensure!(!bytes.is_empty(), "scale slot table missing count byte");
    let count = bytes[0] as usize;
    ensure!(
        count <= MAX_SCALE_SLOTS,
        "scale slot table declares {count} slots, limit is {MAX_SCALE_SLOTS}"
    );
    let mut slots = Vec::with_capacity(count);
    let mut offset = 1;
    for index in 0..count {
        let end = offset + ScaleSlot::RECORD_SIZE;
        ensure!(
            end <= bytes.len(),
            "scale slot table truncated inside record {index}"
        );
        slots.push(decode_scale_slot(&bytes[offset..end])?);
        offset = end;
    }
    Ok(slots)
}

/// Encode a slot table with its count prefix.
pub fn encode_scale_slot_table(slots: &[ScaleSlot]) -> Result<Vec<u8>> {
    ensure!(
        slots.len() <= MAX_SCALE_SLOTS,
        "{} slots exceed the table limit of {MAX_SCALE_SLOTS}",
        slots.len()
    );
    let mut out = Vec::with_capacity(1 + slots.len() * ScaleSlot::RECORD_SIZE);
    out.push(slots.len() as u8);
    for slot in slots {
        for field in [slot.x1, slot.y1, slot.scale1, slot.x2, slot.y2, slot.scale2] {
            let value =
                i16::try_from(field).map_err(|_| anyhow::anyhow!("slot field {field} out of range"))?;
            out.write_i16::<LittleEndian>(value)?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_table_round_trips() {
        let slots = vec![
            ScaleSlot {
                x1: 0,
                y1: 80,
                scale1: 60,
                x2: 0,
                y2: 190,
                scale2: 255,
            },
            ScaleSlot {
                x1: -20,
                y1: 0,
                scale1: 255,
                x2: 300,
                y2: 0,
                scale2: 90,
            },
        ];
        let raw = encode_scale_slot_table(&slots).unwrap();
        assert_eq!(decode_scale_slot_table(&raw).unwrap(), slots);
    }

    #[test]
    fn degenerate_detection() {
        let slot = ScaleSlot {
            x1: 5,
            y1: 9,
            scale1: 10,
            x2: 5,
            y2: 9,
            scale2: 20,
        };
        assert!(slot.is_degenerate());
    }

    #[test]
    fn oversized_table_is_rejected() {
        let slot = ScaleSlot {
            x1: 0,
            y1: 0,
            scale1: 0,
            x2: 1,
            y2: 1,
            scale2: 255,
        };
        assert!(encode_scale_slot_table(&vec![slot; MAX_SCALE_SLOTS + 1]).is_err());
        let mut raw = vec![(MAX_SCALE_SLOTS + 1) as u8];
        raw.extend(std::iter::repeat(0u8).take((MAX_SCALE_SLOTS + 1) * ScaleSlot::RECORD_SIZE));
        assert!(decode_scale_slot_table(&raw).is_err());
    }

    #[test]
    fn truncated_record_is_rejected() {
        let raw = vec![1u8, 0, 0, 0, 0];
        assert!(decode_scale_slot_table(&raw).is_err());
    }
}
