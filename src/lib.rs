//! BVGraph-style compression and random-access reading for large
//! directed graphs, implementing the Boldi–Vigna differential,
//! reference-based successor-list code.
//!
//! The three artifacts produced for a graph named `<base>` are
//! `<base>.graph` (the compressed bitstream), `<base>.offsets` (a
//! gap-coded table of per-node bit offsets) and `<base>.properties`
//! (the codec parameters and a few informational statistics). See
//! [`bvgraph::BVGraph`] for loading and storing these, [`bvgraph::BVComp`]
//! for driving the encoder directly, and [`bits`] for the underlying
//! universal integer codes.
#![deny(unreachable_pub)]
#![deny(unconditional_recursion)]
#![deny(unreachable_patterns)]

pub mod bits;
pub mod bvgraph;
pub mod degrees;
pub mod error;
pub mod iters;
pub mod offsets;
pub mod properties;
mod utils;

pub use bvgraph::{BVComp, BVGraph, CompressionFlags, LoadMode};
pub use error::{Error, Result};

/// Re-exports the pieces most callers need: the graph container, the
/// codec configuration, and the crate's error types.
pub mod prelude {
    pub use crate::bits::Code;
    pub use crate::bvgraph::{BVComp, BVGraph, CompressionFlags, LoadMode};
    pub use crate::error::{Error, Result};
    pub use crate::properties::GraphProperties;
}
