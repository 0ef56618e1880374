//! The BVGraph format itself: codec configuration, the successor-list
//! decoder and encoder, and the graph container that ties them to the
//! `.graph`/`.offsets`/`.properties` triple on disk.

pub mod comp_flags;
pub mod decoder;
pub mod encoder;
pub mod graph;

pub use comp_flags::CompressionFlags;
pub use decoder::DecodedList;
pub use encoder::BVComp;
pub use graph::{BVGraph, LoadMode, NodeIterator};
