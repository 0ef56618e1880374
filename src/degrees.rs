//! The outdegree-only scan: walks a sequential bitstream decoding only
//! the counts needed to determine each node's outdegree and to advance
//! past its full list, without materializing any successor value.
//!
//! Grounded on the teacher's `reader_degrees.rs`; generalized from its
//! fixed code set to this crate's configurable [`CompressionFlags`].

use crate::bits::{BitReader, ByteSource};
use crate::bvgraph::comp_flags::CompressionFlags;
use crate::bvgraph::decoder::skip_list_body;
use crate::error::Result;
use crate::utils::CircularBuffer;

/// Sequentially decodes only the outdegree of each node, in id order,
/// without materializing successor lists. Used for degree-distribution
/// scans and similar statistics where the full graph need not be
/// decoded.
pub struct DegreesIter<S: ByteSource> {
    reader: BitReader<S>,
    flags: CompressionFlags,
    node_id: u64,
    num_nodes: u64,
    /// Outdegrees of the last `window+1` nodes, indexed by `id mod (window+1)`.
    window: CircularBuffer<u64>,
}

impl<S: ByteSource> DegreesIter<S> {
    pub fn new(reader: BitReader<S>, flags: CompressionFlags, num_nodes: u64) -> Self {
        Self {
            reader,
            window: CircularBuffer::new(flags.compression_window + 1),
            flags,
            node_id: 0,
            num_nodes,
        }
    }

    /// The id of the node the next call to [`next_degree`](Self::next_degree) will decode.
    pub fn node_id(&self) -> u64 {
        self.node_id
    }

    /// Current bit position, i.e. the start of the next node's list.
    pub fn position(&self) -> u64 {
        self.reader.position()
    }

    pub fn has_next(&self) -> bool {
        self.node_id < self.num_nodes
    }

    /// Decodes and returns the outdegree of the next node, advancing the
    /// reader past its entire (unmaterialized) successor list.
    pub fn next_degree(&mut self) -> Result<u64> {
        let node_id = self.node_id;
        let degree = skip_list_body(&mut self.reader, node_id, &self.flags, |ref_node| {
            Ok(self.window[ref_node as usize])
        })?;
        self.window[node_id as usize] = degree;
        self.node_id += 1;
        Ok(degree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::{BitWrite, BitWriter, MemoryByteSource, VecByteSink};

    #[test]
    fn degrees_iter_matches_full_decode_scenario_a() {
        // Same wire layout as the decoder's scenario tests: 4 nodes, no
        // references, plain residual lists.
        let flags = CompressionFlags {
            compression_window: 0,
            min_interval_length: 0,
            ..CompressionFlags::default()
        };
        let lists: [&[u64]; 4] = [&[1, 2], &[2, 3], &[3], &[0, 1]];
        let mut w = BitWriter::new(VecByteSink::new());
        for (node_id, list) in lists.iter().enumerate() {
            w.write_code(flags.outdegrees, list.len() as u64).unwrap();
            if list.is_empty() {
                continue;
            }
            w.write_code(
                flags.residuals,
                crate::utils::int2nat(list[0] as i64 - node_id as i64),
            )
            .unwrap();
            for pair in list.windows(2) {
                w.write_code(flags.residuals, pair[1] - pair[0] - 1).unwrap();
            }
        }
        w.flush().unwrap();
        let bytes = w.into_inner().into_inner();

        let reader = BitReader::new(MemoryByteSource::new(bytes.into()));
        let mut degrees = DegreesIter::new(reader, flags, 4);
        let mut observed = Vec::new();
        while degrees.has_next() {
            observed.push(degrees.next_degree().unwrap());
        }
        assert_eq!(observed, vec![2, 2, 1, 2]);
    }
}
