//! Error taxonomy for the codec, decoder, encoder and property sidecar.

use thiserror::Error;

/// Crate-local result alias.
pub type Result<T> = core::result::Result<T, Error>;

/// The kinds of failure this crate can report.
///
/// See the module-level error handling design: low-level `Io`/`Eof`
/// propagate unchanged, codec-level failures carry a textual detail
/// identifying the field being decoded.
#[derive(Error, Debug)]
pub enum Error {
    /// The underlying byte source failed (disk full, truncated file, permission).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// End of bit stream reached before a required code completed.
    #[error("unexpected end of bit stream")]
    Eof,

    /// A decoded code would read beyond the stream, or a value exceeds a
    /// documented bound (e.g. a reference greater than the window size).
    #[error("corrupt stream while decoding {field}: {detail}")]
    CorruptStream {
        field: &'static str,
        detail: String,
    },

    /// A decoded node id is out of `[0, N)`, or a decoded outdegree is
    /// inconsistent with the fields that follow it.
    #[error("invalid wire data: {detail}")]
    InvalidWire { detail: String },

    /// The encoder received an unsorted, duplicated, self-looping, or
    /// out-of-range successor list.
    #[error("invalid input: {detail}")]
    InvalidInput { detail: String },

    /// The property sidecar is missing a required key, names an unknown
    /// flag token, declares `version > 0`, or a parameter is outside its
    /// documented range.
    #[error("invalid configuration: {detail}")]
    InvalidConfig { detail: String },
}

impl Error {
    pub(crate) fn corrupt(field: &'static str, detail: impl Into<String>) -> Self {
        Error::CorruptStream {
            field,
            detail: detail.into(),
        }
    }

    pub(crate) fn invalid_wire(detail: impl Into<String>) -> Self {
        Error::InvalidWire {
            detail: detail.into(),
        }
    }

    pub(crate) fn invalid_input(detail: impl Into<String>) -> Self {
        Error::InvalidInput {
            detail: detail.into(),
        }
    }

    pub(crate) fn invalid_config(detail: impl Into<String>) -> Self {
        Error::InvalidConfig {
            detail: detail.into(),
        }
    }
}
