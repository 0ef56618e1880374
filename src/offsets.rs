//! The `.offsets` sidecar: `N+1` monotonically increasing bit positions,
//! persisted as successive gaps coded with the configured `OFFSETS` code.
//!
//! Grounded on the teacher's older `bin/build_offsets.rs`, which writes
//! `write_gamma(new_offset - offset)` for each node and a final entry for
//! the tail of the stream — the gap-coding scheme this crate's
//! `.offsets` format follows, rather than the teacher's later
//! Elias-Fano-backed `.ef` format (see `DESIGN.md`).

use crate::bits::{BitReader, BitWrite, ByteSource, Code};
use crate::error::Result;

/// Writes `offsets[0], offsets[1], ..., offsets[N]` as `N+1` gap-coded
/// values: `offsets[0]` itself (always `0`), then each successive
/// difference.
pub fn write_offsets<W: BitWrite>(writer: &mut W, offsets: &[u64], code: Code) -> Result<u64> {
    let mut bits = 0u64;
    let mut previous = 0u64;
    for (i, &offset) in offsets.iter().enumerate() {
        let gap = if i == 0 { offset } else { offset - previous };
        bits += writer.write_code(code, gap)? as u64;
        previous = offset;
    }
    Ok(bits)
}

/// Reads back `n + 1` offsets written by [`write_offsets`].
pub fn read_offsets<S: ByteSource>(reader: &mut BitReader<S>, n: u64, code: Code) -> Result<Vec<u64>> {
    let mut offsets = Vec::with_capacity(n as usize + 1);
    let mut running = 0u64;
    for i in 0..=n {
        let gap = reader.read_code(code)?;
        running = if i == 0 { gap } else { running + gap };
        offsets.push(running);
    }
    Ok(offsets)
}
