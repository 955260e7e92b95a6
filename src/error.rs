use std::fmt;
use std::sync::Arc;

use crate::format::SampleKind;

/// Buffer-shape failure reported by the row kernels in [`crate::swizzle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SizeError {
    /// Buffer is empty or its length is not a multiple of the pixel size.
    #[error("buffer length is not a whole number of pixels")]
    NotPixelAligned,
    /// Destination holds fewer pixels than the source.
    #[error("destination is too small for the source pixel count")]
    PixelCountMismatch,
}

/// Message from a failed decode, shared between every call that reports it.
#[derive(Clone, PartialEq, Eq)]
pub struct DecodeError(Arc<str>);

impl DecodeError {
    pub fn new(message: impl fmt::Display) -> Self {
        Self(Arc::from(message.to_string()))
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DecodeError").field(&&*self.0).finish()
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for DecodeError {}

impl From<&str> for DecodeError {
    fn from(message: &str) -> Self {
        Self(Arc::from(message))
    }
}

impl From<String> for DecodeError {
    fn from(message: String) -> Self {
        Self(Arc::from(message))
    }
}

/// Everything that can go wrong while describing, iterating or converting
/// pixel rows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PixelError {
    #[error("pixel format {what} \"{value}\" is already defined")]
    DuplicateFormat { what: &'static str, value: String },

    #[error("the image type \"{0}\" is not recognized")]
    UnknownFormatCode(i32),

    #[error("invalid row layout: {0}")]
    InvalidLayout(String),

    #[error("format {format} stores {expected:?} samples but the buffer holds {actual:?} samples")]
    SampleKindMismatch {
        format: &'static str,
        expected: SampleKind,
        actual: SampleKind,
    },

    #[error("conversion from {from} to {to} is not supported")]
    Unsupported {
        from: &'static str,
        to: &'static str,
    },

    #[error("indexed pixels require a palette")]
    MissingPalette,

    #[error("end of data reached")]
    EndOfData,

    #[error("row buffer holds {actual} samples but {required} are required")]
    BufferTooSmall { required: usize, actual: usize },

    #[error("image decoding failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("the pixel iterator was closed")]
    Cancelled,

    #[error(transparent)]
    Size(#[from] SizeError),
}

pub type Result<T, E = PixelError> = std::result::Result<T, E>;
