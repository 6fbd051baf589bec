//! Run-length-encoded box routing matrix.
//!
//! For every source box, in ascending id order, the buffer holds zero or
//! more `(lo, hi, next_hop)` triples followed by a `0xFF` section
//! terminator; one trailing `0xFF` closes the whole buffer. A triple means
//! "from this source, every destination id in `lo..=hi` routes through
//! `next_hop` first". Destinations with no route are simply not encoded.

use anyhow::{Result, bail, ensure};
use serde::{Deserialize, Serialize};

/// Fixed capacity of the encoded matrix. Scene data that needs more runs
/// than this exceeds the designed limits and is rejected outright.
pub const BOX_MATRIX_SIZE: usize = 2000;

/// Terminates each source section and the buffer as a whole.
pub const MATRIX_SENTINEL: u8 = 0xFF;

/// One decoded routing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixRun {
    pub lo: u8,
    pub hi: u8,
    pub next_hop: u8,
}

/// An encoded routing matrix, read-only after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxMatrix {
    data: Vec<u8>,
}

impl BoxMatrix {
    /// Validate and wrap an encoded buffer.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        ensure!(
            data.len() <= BOX_MATRIX_SIZE,
            "box matrix is {} bytes, capacity is {BOX_MATRIX_SIZE}",
            data.len()
        );
        ensure!(!data.is_empty(), "box matrix buffer is empty");
        ensure!(
            data[data.len() - 1] == MATRIX_SENTINEL,
            "box matrix missing trailing terminator"
        );
        // Every section must be whole triples followed by a terminator.
        let end = data.len() - 1;
        let mut pos = 0;
        while pos < end {
            if data[pos] == MATRIX_SENTINEL {
                pos += 1;
                continue;
            }
            ensure!(
                pos + 3 <= end,
                "box matrix section truncated mid-triple at byte {pos}"
            );
            let (lo, hi, hop) = (data[pos], data[pos + 1], data[pos + 2]);
            ensure!(
                lo <= hi && hi != MATRIX_SENTINEL && hop != MATRIX_SENTINEL,
                "malformed routing triple at byte {pos}"
            );
            pos += 3;
        }
        Ok(BoxMatrix { data })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Number of source sections in the buffer.
    pub fn section_count(&self) -> usize {
        self.data[..self.data.len() - 1]
            .iter()
            .filter(|&&b| b == MATRIX_SENTINEL)
            .count()
    }

    fn section_start(&self, from: u8) -> Option<usize> {
        let mut pos = 0;
        for _ in 0..from {
            while *self.data.get(pos)? != MATRIX_SENTINEL {
                pos += 3;
            }
            pos += 1;
        }
        if pos < self.data.len() { Some(pos) } else { None }
    }

    /// The decoded runs for one source box.
    pub fn runs(&self, from: u8) -> Vec<MatrixRun> {
        let mut runs = Vec::new();
        let Some(mut pos) = self.section_start(from) else {
            return runs;
        };
        while pos + 3 <= self.data.len() && self.data[pos] != MATRIX_SENTINEL {
            runs.push(MatrixRun {
                lo: self.data[pos],
                hi: self.data[pos + 1],
                next_hop: self.data[pos + 2],
            });
            pos += 3;
        }
        runs
    }

    /// Next box to traverse from `from` toward `to`, or `None` if `to` is
    /// unreachable. `from == to` short-circuits to `to`. The last run
    /// containing `to` wins, matching how the runs are emitted.
    pub fn next_hop(&self, from: u8, to: u8) -> Option<u8> {
        if from == to {
            return Some(to);
        }
        let mut dest = None;
        let mut pos = self.section_start(from)?;
        while pos + 3 <= self.data.len() && self.data[pos] != MATRIX_SENTINEL {
            let (lo, hi, hop) = (self.data[pos], self.data[pos + 1], self.data[pos + 2]);
            if lo <= to && to <= hi {
                dest = Some(hop);
            }
            pos += 3;
        }
        dest
    }
}

/// Builds the encoded buffer, enforcing the fixed capacity.
#[derive(Debug, Default)]
pub struct MatrixWriter {
    data: Vec<u8>,
}

impl MatrixWriter {
    pub fn new() -> Self {
        MatrixWriter::default()
    }

    fn push(&mut self, byte: u8) -> Result<()> {
        if self.data.len() >= BOX_MATRIX_SIZE {
            bail!("box matrix overflow (capacity {BOX_MATRIX_SIZE} bytes)");
        }
        self.data.push(byte);
        Ok(())
    }

    /// Run-length encode one source box's hop table and terminate the
    /// section. `hops[i]` is the next hop toward destination `i`, `None`
    /// when unreachable.
    pub fn encode_section(&mut self, hops: &[Option<u8>]) -> Result<()> {
        let mut i = 0;
        while i < hops.len() {
            match hops[i] {
                None => i += 1,
                Some(hop) => {
                    let lo = i;
                    while i + 1 < hops.len() && hops[i + 1] == Some(hop) {
                        i += 1;
                    }
                    self.push(lo as u8)?;
                    self.push(i as u8)?;
                    self.push(hop)?;
                    i += 1;
                }
            }
        }
        self.push(MATRIX_SENTINEL)
    }

    /// Close the buffer with the trailing terminator.
    pub fn finish(mut self) -> Result<BoxMatrix> {
        self.push(MATRIX_SENTINEL)?;
        BoxMatrix::from_bytes(self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(rows: &[Vec<Option<u8>>]) -> BoxMatrix {
        let mut writer = MatrixWriter::new();
        for row in rows {
            writer.encode_section(row).unwrap();
        }
        writer.finish().unwrap()
    }

    #[test]
    fn run_compaction_loses_no_information() {
        let rows = vec![
            vec![Some(0), Some(1), Some(1), None, Some(2)],
            vec![Some(0), Some(1), Some(2), Some(2), Some(2)],
            vec![None, None, Some(2), None, Some(4)],
        ];
        let matrix = encode(&rows);
        for (from, row) in rows.iter().enumerate() {
            for (to, hop) in row.iter().enumerate() {
                if from == to {
                    continue;
                }
                assert_eq!(
                    matrix.next_hop(from as u8, to as u8),
                    *hop,
                    "hop mismatch for {from}->{to}"
                );
            }
        }
    }

    #[test]
    fn self_route_short_circuits() {
        let matrix = encode(&[vec![None, None]]);
        assert_eq!(matrix.next_hop(0, 0), Some(0));
        assert_eq!(matrix.next_hop(7, 7), Some(7));
    }

    #[test]
    fn unreachable_destination_is_none() {
        let matrix = encode(&[vec![Some(0), None], vec![None, Some(1)]]);
        assert_eq!(matrix.next_hop(0, 1), None);
        assert_eq!(matrix.next_hop(1, 0), None);
    }

    #[test]
    fn wire_layout_matches_expectation() {
        // One source, hops [0,1,1] -> runs (0,0,0) (1,2,1), section + trailing terminator.
        let matrix = encode(&[vec![Some(0), Some(1), Some(1)]]);
        assert_eq!(
            matrix.as_bytes(),
            &[0, 0, 0, 1, 2, 1, MATRIX_SENTINEL, MATRIX_SENTINEL]
        );
        assert_eq!(matrix.section_count(), 1);
        assert_eq!(
            matrix.runs(0),
            vec![
                MatrixRun {
                    lo: 0,
                    hi: 0,
                    next_hop: 0
                },
                MatrixRun {
                    lo: 1,
                    hi: 2,
                    next_hop: 1
                }
            ]
        );
    }

    #[test]
    fn overflow_is_rejected() {
        let mut writer = MatrixWriter::new();
        let row = vec![
            Some(0),
            None,
            Some(1),
            None,
            Some(2),
            None,
            Some(3),
            None,
            Some(4),
            None,
        ];
        // 5 runs * 3 bytes + terminator = 16 bytes per section.
        let mut overflowed = false;
        for _ in 0..200 {
            if writer.encode_section(&row).is_err() {
                overflowed = true;
                break;
            }
        }
        assert!(overflowed, "writer accepted more than {BOX_MATRIX_SIZE} bytes");
    }

    #[test]
    fn from_bytes_validates_structure() {
        assert!(BoxMatrix::from_bytes(vec![]).is_err());
        assert!(BoxMatrix::from_bytes(vec![0, 1]).is_err());
        // truncated triple before the trailing terminator
        assert!(BoxMatrix::from_bytes(vec![0, 1, MATRIX_SENTINEL]).is_err());
        assert!(BoxMatrix::from_bytes(vec![MATRIX_SENTINEL]).is_ok());
        assert!(
            BoxMatrix::from_bytes(vec![0, 2, 1, MATRIX_SENTINEL, MATRIX_SENTINEL]).is_ok()
        );
    }
}
