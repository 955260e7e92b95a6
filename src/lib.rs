//! # scanrow
//!
//! *One row at a time, in whatever clothes you need.*
//!
//! Pull-based pixel iterators that hand out an image one scanline at a time,
//! plus the format conversions that let any source be read in any of the
//! supported layouts: packed `u32` words (`INT_ARGB`, `INT_RGB`, ...) or
//! interleaved bytes (`3BYTE_BGR`, `4BYTE_RGBA_PRE`, ...), straight or
//! premultiplied alpha, and 8-bit indexed color.
//!
//! ```rust
//! use scanrow::{ArrayPixelIterator, ConvertingIterator, PixelFormat, PixelIterator};
//!
//! let argb = [0xFF00_00FFu32, 0x8000_FF00];
//! let src = ArrayPixelIterator::packed(&argb, 2, 1, PixelFormat::IntArgb)?;
//! let mut pre: ConvertingIterator<_, u8> = PixelFormat::ByteRgbaPre.iter_from(src)?;
//! let mut row = [0u8; 8];
//! pre.next_row(&mut row)?;
//! assert_eq!(row, [0, 0, 255, 255, 0, 128, 0, 128]);
//! # Ok::<(), scanrow::PixelError>(())
//! ```
//!
//! ## Sources and adapters
//!
//! - [`ArrayPixelIterator`] reads a borrowed slice with an offset and scan size.
//! - [`RasterIterator`] reads an in-memory [`Raster`], top down or bottom up.
//! - [`ProducerPixelIterator`] turns a push-style decoder on a worker thread
//!   into a pull iterator.
//! - [`ConvertingIterator`] changes the pixel format of any source.
//! - [`ScalingIterator`] resamples any source while streaming.
//!
//! [`pixels_equal`] compares two sources pixel by pixel, whatever their formats.
//!
//! The byte swizzles in [`swizzle`] are SIMD-accelerated on x86-64 AVX2 with
//! a scalar fallback.
//!
//! ## Feature flags
//!
//! - **`rgb`**: Build [`ArrayPixelIterator`]s straight from [`rgb`] pixel
//!   slices (`Rgb<u8>`, `Rgba<u8>`, `Bgr<u8>`, `Bgra<u8>`).
//! - **`imgref`**: Iterate over [`imgref`] images and collect iterators into
//!   `ImgVec`s. Implies `rgb`.

#![forbid(unsafe_code)]

mod array;
mod convert;
mod converting;
mod error;
mod format;
mod iter;
mod palette;
mod producer;
mod raster;
mod scaling;
pub mod swizzle;

#[cfg(feature = "rgb")]
mod typed;

#[cfg(feature = "imgref")]
pub mod img;

pub use array::ArrayPixelIterator;
pub use convert::{
    convert_row, convert_row_in_place, convert_samples, premultiply, premultiply_argb,
    unpremultiply, unpremultiply_argb,
};
pub use converting::{ConvertingIterator, pixels_equal};
pub use error::{DecodeError, PixelError, Result, SizeError};
pub use format::{
    Alpha, CUSTOM_CODE_START, FormatDescriptor, FormatRegistry, PixelFormat, Sample, SampleKind,
    Samples, SamplesMut,
};
pub use iter::{PixelIterator, collect_rows};
pub use palette::Palette;
pub use producer::{ImageHeader, ProducerBuilder, ProducerPixelIterator, RowSink};
pub use raster::{ColorModel, InterleavedModel, Raster, RasterData, RasterIterator};
pub use scaling::ScalingIterator;
