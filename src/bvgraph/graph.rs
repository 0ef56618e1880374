//! The graph container: ties together the property sidecar, the offset
//! table, and the successor-list decoder into the three load modes
//! (`Offline`, `Sequential`, `Random`), plus the sequential node
//! iterator and the static `store_from` encode path.
//!
//! Grounded on the teacher's `webgraph/load.rs` (the three
//! `impl_loads!`-generated constructors) and `webgraph/bvgraph.rs`
//! (`BVGraph`'s `outdegree`/`successors`/node-iterator surface),
//! adapted from the teacher's mmap+Elias-Fano backing to this crate's
//! in-memory/file `ByteSource`s and gap-coded offsets.

use std::sync::Arc;

use crate::bits::{BitReader, BitWriter, ByteSource, FileByteSource, MemoryByteSource, VecByteSink};
use crate::bvgraph::comp_flags::CompressionFlags;
use crate::bvgraph::decoder::{decode_list, decode_outdegree_only};
use crate::bvgraph::encoder::BVComp;
use crate::error::{Error, Result};
use crate::offsets::{read_offsets, write_offsets};
use crate::properties::{EncodeStats, GraphProperties};
use crate::utils::CircularBuffer;

/// How a [`BVGraph`] loads its bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Metadata only; the `.graph` file is reopened for each sequential
    /// traversal rather than materialized in memory.
    Offline,
    /// `.graph` bytes loaded into memory; sequential access only, no
    /// offsets (and therefore no random access).
    Sequential,
    /// `.graph` bytes and the `.offsets` table loaded into memory; full
    /// random access.
    Random,
}

/// Either of the two byte sources a loaded graph may read from,
/// unified so the sequential node iterator and the decoder can share
/// one concrete type regardless of [`LoadMode`].
#[derive(Debug, Clone)]
enum AnySource {
    Memory(MemoryByteSource),
    File(FileByteSource),
}

impl ByteSource for AnySource {
    fn read_byte(&mut self) -> std::io::Result<Option<u8>> {
        match self {
            AnySource::Memory(s) => s.read_byte(),
            AnySource::File(s) => s.read_byte(),
        }
    }

    fn seek_to_byte(&mut self, byte_index: u64) -> std::io::Result<()> {
        match self {
            AnySource::Memory(s) => s.seek_to_byte(byte_index),
            AnySource::File(s) => s.seek_to_byte(byte_index),
        }
    }
}

enum Backing {
    Offline { path: String },
    InMemory { bytes: Arc<[u8]> },
}

/// A loaded, immutable compressed graph: node/arc counts, codec
/// parameters, and, depending on [`LoadMode`], the compressed bytes
/// and/or offset table needed for random access.
pub struct BVGraph {
    num_nodes: u64,
    num_arcs: u64,
    flags: CompressionFlags,
    backing: Backing,
    offsets: Option<Vec<u64>>,
}

impl BVGraph {
    pub fn num_nodes(&self) -> u64 {
        self.num_nodes
    }

    pub fn num_arcs(&self) -> u64 {
        self.num_arcs
    }

    pub fn flags(&self) -> &CompressionFlags {
        &self.flags
    }

    /// Loads `<basename>.properties` and, per `mode`, the `.graph`
    /// and/or `.offsets` files.
    pub fn load(basename: &str, mode: LoadMode) -> Result<Self> {
        log::info!("Loading graph {basename} ({mode:?})");
        let props = GraphProperties::read(basename)?;
        let graph_path = format!("{basename}.graph");

        let (backing, offsets) = match mode {
            LoadMode::Offline => (Backing::Offline { path: graph_path }, None),
            LoadMode::Sequential => {
                let bytes: Arc<[u8]> = std::fs::read(&graph_path)?.into();
                (Backing::InMemory { bytes }, None)
            }
            LoadMode::Random => {
                let bytes: Arc<[u8]> = std::fs::read(&graph_path)?.into();
                let offsets_path = format!("{basename}.offsets");
                let offsets_bytes: Arc<[u8]> = std::fs::read(&offsets_path)?.into();
                let mut reader = BitReader::new(MemoryByteSource::new(offsets_bytes));
                let offsets = read_offsets(&mut reader, props.nodes, props.flags.offsets)?;
                (Backing::InMemory { bytes }, Some(offsets))
            }
        };

        Ok(BVGraph {
            num_nodes: props.nodes,
            num_arcs: props.arcs,
            flags: props.flags,
            backing,
            offsets,
        })
    }

    fn source_at(&self, bit_offset: u64) -> Result<BitReader<AnySource>> {
        let mut reader = match &self.backing {
            Backing::Offline { path } => {
                BitReader::new(AnySource::File(FileByteSource::open(path)?))
            }
            Backing::InMemory { bytes } => {
                BitReader::new(AnySource::Memory(MemoryByteSource::new(bytes.clone())))
            }
        };
        reader.set_position(bit_offset)?;
        Ok(reader)
    }

    /// Decodes the outdegree of node `x` without materializing its
    /// successor list. Requires offsets (`Random` mode).
    pub fn outdegree(&self, x: u64) -> Result<u64> {
        let offsets = self.offsets_or_err()?;
        self.bounds_check(x)?;
        let mut reader = self.source_at(offsets[x as usize])?;
        decode_outdegree_only(&mut reader, self.flags.outdegrees)
    }

    /// Decodes the full successor list of node `x` (random access).
    /// Requires offsets (`Random` mode); recurses at most
    /// `max_ref_count` levels deep to materialize any reference list
    /// not already at hand.
    pub fn successors(&self, x: u64) -> Result<Vec<u64>> {
        let offsets = self.offsets_or_err()?;
        self.bounds_check(x)?;
        let mut reader = self.source_at(offsets[x as usize])?;
        let result = decode_list(&mut reader, x, self.num_nodes, &self.flags, |r| {
            self.successors(r)
        })?;
        Ok(result.successors)
    }

    fn offsets_or_err(&self) -> Result<&[u64]> {
        self.offsets.as_deref().ok_or_else(|| {
            Error::invalid_config("random access requires offsets to be loaded (LoadMode::Random)")
        })
    }

    fn bounds_check(&self, x: u64) -> Result<()> {
        if x >= self.num_nodes {
            return Err(Error::invalid_wire(format!(
                "node {x} is out of range [0, {})",
                self.num_nodes
            )));
        }
        Ok(())
    }

    /// Builds a sequential node iterator starting at node `from`.
    /// `from > 0` is only supported when offsets are loaded (`Random`
    /// mode) and uses them to seek directly; otherwise iteration always
    /// starts at node 0.
    pub fn node_iterator(&self, from: u64) -> Result<NodeIterator> {
        if from > 0 && self.offsets.is_none() {
            return Err(Error::invalid_config(
                "node_iterator(from > 0) requires offsets (LoadMode::Random)",
            ));
        }
        let start_bit = match &self.offsets {
            Some(offsets) if from > 0 => offsets[from as usize],
            _ => 0,
        };
        let reader = self.source_at(start_bit)?;
        let slots = self.flags.compression_window + 1;
        Ok(NodeIterator {
            reader,
            flags: self.flags,
            num_nodes: self.num_nodes,
            node_id: from,
            window: CircularBuffer::new(slots),
            have: CircularBuffer::new(slots),
            offsets: self.offsets.clone(),
        })
    }

    /// Encodes `source` (successor lists in ascending node-id order,
    /// one per node, empty for isolated nodes) to
    /// `<basename>.{graph,offsets,properties}`. Reading the plain-text
    /// adjacency format such lists are typically parsed from is outside
    /// this crate's scope.
    pub fn store_from<I>(
        basename: &str,
        num_nodes: u64,
        graphclass: &str,
        flags: CompressionFlags,
        source: I,
    ) -> Result<()>
    where
        I: IntoIterator<Item = Vec<u64>>,
    {
        flags.validate()?;
        let mut comp = BVComp::new(BitWriter::new(VecByteSink::new()), flags, num_nodes);
        let mut offsets = vec![0u64];
        let mut nodes_seen = 0u64;

        for list in source {
            comp.push(list)?;
            offsets.push(comp.bit_position());
            nodes_seen += 1;
        }
        if nodes_seen != num_nodes {
            log::warn!(
                "The expected number of nodes is {num_nodes} but the source yielded {nodes_seen}"
            );
            return Err(Error::invalid_input(format!(
                "store_from: expected {num_nodes} nodes, source yielded {nodes_seen}"
            )));
        }

        let arcs = comp.arcs;
        let avgref = if num_nodes > 0 {
            comp.nodes_with_reference as f64 / num_nodes as f64
        } else {
            0.0
        };
        let avgdist = if comp.nodes_with_reference > 0 {
            comp.reference_distance_sum as f64 / comp.nodes_with_reference as f64
        } else {
            0.0
        };
        let total_bits = comp.bit_position();
        let bytes = comp.into_writer().into_inner().into_inner();
        std::fs::write(format!("{basename}.graph"), &bytes)?;
        log::info!("Wrote {basename}.graph ({total_bits} bits, {arcs} arcs)");

        let mut offsets_writer = BitWriter::new(VecByteSink::new());
        write_offsets(&mut offsets_writer, &offsets, flags.offsets)?;
        offsets_writer.flush()?;
        let offsets_bytes = offsets_writer.into_inner().into_inner();
        std::fs::write(format!("{basename}.offsets"), &offsets_bytes)?;
        log::info!("Wrote {basename}.offsets ({} entries)", offsets.len());

        let bitspernode = if num_nodes > 0 {
            total_bits as f64 / num_nodes as f64
        } else {
            0.0
        };
        let bitsperlink = if arcs > 0 {
            total_bits as f64 / arcs as f64
        } else {
            0.0
        };

        log::info!("Writing the .properties file");
        let mut props = GraphProperties::new(graphclass, num_nodes, arcs, flags);
        props.stats = Some(EncodeStats {
            avgref,
            avgdist,
            bitsperlink,
            bitspernode,
        });
        props.write(basename)?;
        Ok(())
    }
}

/// Sequential traversal over a loaded graph's successor lists, in
/// ascending node-id order, reusing a cyclic reference window as it
/// advances.
pub struct NodeIterator {
    reader: BitReader<AnySource>,
    flags: CompressionFlags,
    num_nodes: u64,
    node_id: u64,
    window: CircularBuffer<Vec<u64>>,
    have: CircularBuffer<bool>,
    /// Present only when the graph was loaded `Random`; lets the
    /// iterator resolve a reference to a node outside the window (e.g.
    /// right after a nonzero `from`) by a direct positioned decode.
    offsets: Option<Vec<u64>>,
}

impl NodeIterator {
    pub fn has_next(&self) -> bool {
        self.node_id < self.num_nodes
    }

    pub fn index(&self) -> u64 {
        self.node_id
    }

    /// Decodes and returns the next node's id and successor list.
    pub fn next(&mut self) -> Result<(u64, Vec<u64>)> {
        let node_id = self.node_id;
        let flags = self.flags;
        let num_nodes = self.num_nodes;
        let template = self.reader.clone();
        let offsets = self.offsets.clone();
        let window = &self.window;
        let have = &self.have;

        let result = decode_list(&mut self.reader, node_id, num_nodes, &flags, |r| {
            resolve_reference(&template, offsets.as_deref(), window, have, &flags, num_nodes, r)
        })?;

        let slots = self.window.len();
        self.window[node_id as usize % slots] = result.successors.clone();
        self.have[node_id as usize % slots] = true;
        self.node_id += 1;
        Ok((node_id, result.successors))
    }
}

/// Resolves the successor list of node `r`, either from the sequential
/// window (if it has already been visited) or, when offsets are
/// available, by a direct positioned decode of node `r`'s own list.
/// Recurses, at most `max_ref_count` levels deep since that bounds any
/// well-formed reference chain, to resolve any reference of its own the
/// same way.
fn resolve_reference(
    template: &BitReader<AnySource>,
    offsets: Option<&[u64]>,
    window: &CircularBuffer<Vec<u64>>,
    have: &CircularBuffer<bool>,
    flags: &CompressionFlags,
    num_nodes: u64,
    r: u64,
) -> Result<Vec<u64>> {
    let slots = window.len();
    if have[r as usize % slots] {
        return Ok(window[r as usize % slots].clone());
    }
    let offsets = offsets.ok_or_else(|| {
        Error::invalid_wire(format!("reference to node {r} outside the sequential window"))
    })?;
    let mut reader = template.clone();
    reader.set_position(offsets[r as usize])?;
    let result = decode_list(&mut reader, r, num_nodes, flags, |rr| {
        resolve_reference(template, Some(offsets), window, have, flags, num_nodes, rr)
    })?;
    Ok(result.successors)
}
