//! Walkbox record layouts.
//!
//! Scene data stores its walkable boxes in one of three fixed-size binary
//! layouts depending on the title's format generation. Decoding normalizes
//! all of them into the same canonical entity so nothing downstream needs to
//! know which layout a scene shipped with.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use anyhow::{Context, Result, bail, ensure};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

/// Sentinel box id meaning "no box". Lookups against it resolve to a
/// none-style result instead of an error.
pub const NO_BOX: u8 = 255;

/// Which on-disk box layout a scene uses, fixed at scene-load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoxFormat {
    /// 8 packed byte fields; coordinates are stored pre-scaled (x/8, y/2).
    V2,
    /// Little-endian `i16` corner fields with a 16-bit scale word.
    V3,
    /// Little-endian `i32` corner fields with a scale slot and 32-bit scale.
    V8,
}

impl BoxFormat {
    pub fn record_size(self) -> usize {
        match self {
            BoxFormat::V2 => 8,
            BoxFormat::V3 => 20,
            BoxFormat::V8 => 40,
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "v2" => Some(BoxFormat::V2),
            "v3" => Some(BoxFormat::V3),
            "v8" => Some(BoxFormat::V8),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }
}

/// Corner points in canonical order: upper-left, upper-right, lower-right,
/// lower-left. The quadrilateral is convex but not necessarily rectangular,
/// and may be degenerate (collapsed to a segment or a point).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxCoords {
    pub ul: Point,
    pub ur: Point,
    pub lr: Point,
    pub ll: Point,
}

impl BoxCoords {
    pub fn corners(&self) -> [Point; 4] {
        [self.ul, self.ur, self.lr, self.ll]
    }

    /// Cycle the corners one step (ul <- ur <- lr <- ll <- ul). Corner
    /// winding order is not guaranteed consistent in scene data, so edge
    /// tests retry under rotation.
    pub fn rotate(&mut self) {
        let tmp = self.ul;
        self.ul = self.ur;
        self.ur = self.lr;
        self.lr = self.ll;
        self.ll = tmp;
    }
}

/// Box flag bits. Scriptable at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoxFlags(pub u8);

impl BoxFlags {
    pub const X_FLIP: u8 = 0x08;
    pub const Y_FLIP: u8 = 0x10;
    pub const PLAYER_ONLY: u8 = 0x20;
    pub const LOCKED: u8 = 0x40;
    pub const INVISIBLE: u8 = 0x80;

    pub fn invisible(self) -> bool {
        self.0 & Self::INVISIBLE != 0
    }

    pub fn player_only(self) -> bool {
        self.0 & Self::PLAYER_ONLY != 0
    }
}

/// Canonical, format-agnostic walkbox entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxDef {
    pub coords: BoxCoords,
    pub mask: u8,
    pub flags: BoxFlags,
    /// Constant scale value. For V3 data the high bit flags an index into a
    /// legacy per-row scale table.
    pub scale: u32,
    /// 1-based scale slot reference; 0 means unset. Only V8 data carries it.
    pub scale_slot: u16,
}

impl BoxDef {
    pub fn new(coords: BoxCoords) -> Self {
        BoxDef {
            coords,
            mask: 0,
            flags: BoxFlags(0),
            scale: 255,
            scale_slot: 0,
        }
    }
}

/// Decode one box record in the given layout.
pub fn decode_box(format: BoxFormat, bytes: &[u8]) -> Result<BoxDef> {
    ensure!(
        bytes.len() >= format.record_size(),
        "box record truncated: {} bytes, {:?} needs {}",
        bytes.len(),
        format,
        format.record_size()
    );
    let mut cursor = Cursor::new(bytes);
    match format {
        BoxFormat::V2 => decode_v2(&mut cursor),
        BoxFormat::V3 => decode_v3(&mut cursor),
        BoxFormat::V8 => decode_v8(&mut cursor),
    }
}

fn decode_v2(cursor: &mut Cursor<&[u8]>) -> Result<BoxDef> {
    let uy = cursor.read_u8()? as i32 * 2;
    let ly = cursor.read_u8()? as i32 * 2;
    let ulx = cursor.read_u8()? as i32 * 8;
    let urx = cursor.read_u8()? as i32 * 8;
    let llx = cursor.read_u8()? as i32 * 8;
    let lrx = cursor.read_u8()? as i32 * 8;
    let mask = cursor.read_u8()?;
    let flags = cursor.read_u8()?;
    Ok(BoxDef {
        coords: BoxCoords {
            ul: Point::new(ulx, uy),
            ur: Point::new(urx, uy),
            lr: Point::new(lrx, ly),
            ll: Point::new(llx, ly),
        },
        mask,
        flags: BoxFlags(flags),
        scale: 255,
        scale_slot: 0,
    })
}

fn decode_v3(cursor: &mut Cursor<&[u8]>) -> Result<BoxDef> {
    let mut corner = || -> Result<Point> {
        let x = cursor.read_i16::<LittleEndian>()? as i32;
        let y = cursor.read_i16::<LittleEndian>()? as i32;
        Ok(Point::new(x, y))
    };
    let ul = corner()?;
    let ur = corner()?;
    let lr = corner()?;
    let ll = corner()?;
    let mask = cursor.read_u8()?;
    let flags = cursor.read_u8()?;
    let scale = cursor.read_u16::<LittleEndian>()? as u32;
    Ok(BoxDef {
        coords: BoxCoords { ul, ur, lr, ll },
        mask,
        flags: BoxFlags(flags),
        scale,
        scale_slot: 0,
    })
}

fn decode_v8(cursor: &mut Cursor<&[u8]>) -> Result<BoxDef> {
    let mut corner = || -> Result<Point> {
        let x = cursor.read_i32::<LittleEndian>()?;
        let y = cursor.read_i32::<LittleEndian>()?;
        Ok(Point::new(x, y))
    };
    let mut ul = corner()?;
    let mut ur = corner()?;
    let mut lr = corner()?;
    let mut ll = corner()?;
    let mask = cursor.read_u8()?;
    let flags = cursor.read_u8()?;
    let scale_slot = cursor.read_u16::<LittleEndian>()?;
    let scale = cursor.read_u32::<LittleEndian>()?;

    // Some V8 scenes ship boxes with the corner pairs inverted, e.g. the
    // lower boundary above the upper one. Swap whole edge pairs back so the
    // canonical order holds.
    if ul.y > ll.y && ur.y > lr.y {
        std::mem::swap(&mut ul, &mut ll);
        std::mem::swap(&mut ur, &mut lr);
    }
    if ul.x > ur.x && ll.x > lr.x {
        std::mem::swap(&mut ul, &mut ur);
        std::mem::swap(&mut ll, &mut lr);
    }

    Ok(BoxDef {
        coords: BoxCoords { ul, ur, lr, ll },
        mask,
        flags: BoxFlags(flags),
        scale,
        scale_slot,
    })
}

/// Encode one box back into the given layout. Used only at the
/// serialization boundary; the runtime works on [`BoxDef`] alone.
pub fn encode_box(format: BoxFormat, def: &BoxDef) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(format.record_size());
    match format {
        BoxFormat::V2 => encode_v2(&mut out, def)?,
        BoxFormat::V3 => encode_v3(&mut out, def)?,
        BoxFormat::V8 => encode_v8(&mut out, def)?,
    }
    Ok(out)
}

fn encode_v2(out: &mut Vec<u8>, def: &BoxDef) -> Result<()> {
    let c = &def.coords;
    ensure!(
        c.ul.y == c.ur.y && c.ll.y == c.lr.y,
        "V2 boxes must have horizontal upper and lower edges"
    );
    let packed_y = |y: i32| -> Result<u8> {
        ensure!(y % 2 == 0 && (0..512).contains(&y), "y {y} not V2-packable");
        Ok((y / 2) as u8)
    };
    let packed_x = |x: i32| -> Result<u8> {
        ensure!(x % 8 == 0 && (0..2048).contains(&x), "x {x} not V2-packable");
        Ok((x / 8) as u8)
    };
    out.write_u8(packed_y(c.ul.y)?)?;
    out.write_u8(packed_y(c.ll.y)?)?;
    out.write_u8(packed_x(c.ul.x)?)?;
    out.write_u8(packed_x(c.ur.x)?)?;
    out.write_u8(packed_x(c.ll.x)?)?;
    out.write_u8(packed_x(c.lr.x)?)?;
    out.write_u8(def.mask)?;
    out.write_u8(def.flags.0)?;
    Ok(())
}

fn encode_v3(out: &mut Vec<u8>, def: &BoxDef) -> Result<()> {
    for point in def.coords.corners() {
        let x = i16::try_from(point.x).context("V3 x coordinate out of range")?;
        let y = i16::try_from(point.y).context("V3 y coordinate out of range")?;
        out.write_i16::<LittleEndian>(x)?;
        out.write_i16::<LittleEndian>(y)?;
    }
    out.write_u8(def.mask)?;
    out.write_u8(def.flags.0)?;
    let scale = u16::try_from(def.scale).context("V3 scale out of range")?;
    out.write_u16::<LittleEndian>(scale)?;
    Ok(())
}

fn encode_v8(out: &mut Vec<u8>, def: &BoxDef) -> Result<()> {
    for point in def.coords.corners() {
        out.write_i32::<LittleEndian>(point.x)?;
        out.write_i32::<LittleEndian>(point.y)?;
    }
    out.write_u8(def.mask)?;
    out.write_u8(def.flags.0)?;
    out.write_u16::<LittleEndian>(def.scale_slot)?;
    out.write_u32::<LittleEndian>(def.scale)?;
    Ok(())
}

/// Decode a whole box table: a count prefix (`u8` for V2/V3, `u32` LE for
/// V8) followed by that many records.
pub fn decode_box_table(format: BoxFormat, bytes: &[u8]) -> Result<Vec<BoxDef>> {
    let (count, mut offset) = match format {
        BoxFormat::V2 | BoxFormat::V3 => {
            ensure!(!bytes.is_empty(), "box table missing count byte");
            (bytes[0] as usize, 1usize)
        }
        BoxFormat::V8 => {
            ensure!(bytes.len() >= 4, "box table missing count word");
            let count = u32::from_le_bytes(bytes[..4].try_into().unwrap()) as usize;
            (count, 4usize)
        }
    };
    if count >= NO_BOX as usize {
        bail!("box table declares {count} boxes; ids must stay below {NO_BOX}");
    }

    let record_size = format.record_size();
    let mut boxes = Vec::with_capacity(count);
    for index in 0..count {
        let end = offset + record_size;
        ensure!(
            end <= bytes.len(),
            "box table truncated inside record {index}"
        );
        let def = decode_box(format, &bytes[offset..end])
            .with_context(|| format!("decoding box {index}"))?;
        boxes.push(def);
        offset = end;
    }
    Ok(boxes)
}

/// Encode a box table with its count prefix.
pub fn encode_box_table(format: BoxFormat, boxes: &[BoxDef]) -> Result<Vec<u8>> {
    ensure!(
        boxes.len() < NO_BOX as usize,
        "{} boxes exceed the id ceiling of {}",
        boxes.len(),
        NO_BOX
    );
    let mut out = Vec::with_capacity(4 + boxes.len() * format.record_size());
    match format {
        BoxFormat::V2 | BoxFormat::V3 => out.push(boxes.len() as u8),
        BoxFormat::V8 => out.extend_from_slice(&(boxes.len() as u32).to_le_bytes()),
    }
    for (index, def) in boxes.iter().enumerate() {
        let record = encode_box(format, def).with_context(|| format!("encoding box {index}"))?;
        out.extend_from_slice(&record);
    }
    Ok(out)
}

/// Read and decode a box table file.
pub fn load_box_table<P: AsRef<Path>>(format: BoxFormat, path: P) -> Result<Vec<BoxDef>> {
    let path = path.as_ref();
    let bytes =
        fs::read(path).with_context(|| format!("reading box table at {}", path.display()))?;
    decode_box_table(format, &bytes)
        .with_context(|| format!("parsing box table {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn square(x0: i32, y0: i32, size: i32) -> BoxCoords {
        BoxCoords {
            ul: Point::new(x0, y0),
            ur: Point::new(x0 + size, y0),
            lr: Point::new(x0 + size, y0 + size),
            ll: Point::new(x0, y0 + size),
        }
    }

    #[test]
    fn v2_decode_scales_coordinates() {
        // uy=2, ly=6, ulx=1, urx=3, llx=1, lrx=3
        let raw = [2u8, 6, 1, 3, 1, 3, 0x05, 0x80];
        let def = decode_box(BoxFormat::V2, &raw).unwrap();
        assert_eq!(def.coords.ul, Point::new(8, 4));
        assert_eq!(def.coords.ur, Point::new(24, 4));
        assert_eq!(def.coords.ll, Point::new(8, 12));
        assert_eq!(def.coords.lr, Point::new(24, 12));
        assert_eq!(def.mask, 0x05);
        assert!(def.flags.invisible());
    }

    #[test]
    fn v3_round_trip() {
        let mut def = BoxDef::new(square(10, -4, 20));
        def.mask = 3;
        def.flags = BoxFlags(BoxFlags::PLAYER_ONLY);
        def.scale = 0x8002;
        let raw = encode_box(BoxFormat::V3, &def).unwrap();
        assert_eq!(raw.len(), BoxFormat::V3.record_size());
        assert_eq!(decode_box(BoxFormat::V3, &raw).unwrap(), def);
    }

    #[test]
    fn v8_round_trip_with_scale_slot() {
        let mut def = BoxDef::new(square(100, 200, 50));
        def.scale_slot = 4;
        def.scale = 180;
        let raw = encode_box(BoxFormat::V8, &def).unwrap();
        assert_eq!(raw.len(), BoxFormat::V8.record_size());
        assert_eq!(decode_box(BoxFormat::V8, &raw).unwrap(), def);
    }

    #[test]
    fn v8_flipped_corners_are_corrected() {
        let flipped = BoxDef {
            coords: BoxCoords {
                // upper corners below the lower ones
                ul: Point::new(0, 10),
                ur: Point::new(10, 10),
                lr: Point::new(10, 0),
                ll: Point::new(0, 0),
            },
            ..BoxDef::new(square(0, 0, 10))
        };
        let raw = encode_box(BoxFormat::V8, &flipped).unwrap();
        let def = decode_box(BoxFormat::V8, &raw).unwrap();
        assert_eq!(def.coords, square(0, 0, 10));
    }

    #[test]
    fn v2_encode_rejects_unpackable_coordinates() {
        let def = BoxDef::new(BoxCoords {
            ul: Point::new(3, 0),
            ur: Point::new(11, 0),
            lr: Point::new(11, 8),
            ll: Point::new(3, 8),
        });
        assert!(encode_box(BoxFormat::V2, &def).is_err());
    }

    #[test]
    fn table_round_trip_and_truncation() {
        let boxes = vec![
            BoxDef::new(square(0, 0, 10)),
            BoxDef::new(square(10, 0, 10)),
        ];
        let raw = encode_box_table(BoxFormat::V3, &boxes).unwrap();
        assert_eq!(decode_box_table(BoxFormat::V3, &raw).unwrap(), boxes);
        assert!(decode_box_table(BoxFormat::V3, &raw[..raw.len() - 1]).is_err());
    }

    #[test]
    fn loads_table_from_file() {
        let boxes = vec![BoxDef::new(square(0, 0, 16))];
        let raw = encode_box_table(BoxFormat::V8, &boxes).unwrap();
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&raw).unwrap();
        let loaded = load_box_table(BoxFormat::V8, file.path()).unwrap();
        assert_eq!(loaded, boxes);
    }
}
