//! Iterate over [`rgb`] pixel slices without spelling out the byte layout.
//!
//! ```rust
//! use rgb::Rgba;
//! use scanrow::{ArrayPixelIterator, ConvertingIterator, PixelFormat, PixelIterator};
//!
//! let pixels = vec![Rgba::new(255u8, 0, 128, 255); 4];
//! let src = ArrayPixelIterator::from_rgba(&pixels, 2, 2)?;
//! let mut argb: ConvertingIterator<_, u32> = PixelFormat::IntArgb.iter_from(src)?;
//! let mut row = [0u32; 2];
//! argb.next_row(&mut row)?;
//! assert_eq!(row, [0xFFFF_0080; 2]);
//! # Ok::<(), scanrow::PixelError>(())
//! ```

use rgb::{Bgr, Bgra, Rgb, Rgba};

use crate::array::ArrayPixelIterator;
use crate::error::Result;
use crate::format::PixelFormat;

impl<'a> ArrayPixelIterator<'a, u8> {
    /// Tightly packed `Rgba<u8>` rows as `4BYTE_RGBA`.
    pub fn from_rgba(pixels: &'a [Rgba<u8>], width: usize, height: usize) -> Result<Self> {
        Self::packed(bytemuck::cast_slice(pixels), width, height, PixelFormat::ByteRgba)
    }

    /// Tightly packed premultiplied `Rgba<u8>` rows as `4BYTE_RGBA_PRE`.
    pub fn from_rgba_premultiplied(
        pixels: &'a [Rgba<u8>],
        width: usize,
        height: usize,
    ) -> Result<Self> {
        Self::packed(bytemuck::cast_slice(pixels), width, height, PixelFormat::ByteRgbaPre)
    }

    pub fn from_bgra(pixels: &'a [Bgra<u8>], width: usize, height: usize) -> Result<Self> {
        Self::packed(bytemuck::cast_slice(pixels), width, height, PixelFormat::ByteBgra)
    }

    pub fn from_rgb(pixels: &'a [Rgb<u8>], width: usize, height: usize) -> Result<Self> {
        Self::packed(bytemuck::cast_slice(pixels), width, height, PixelFormat::ByteRgb)
    }

    pub fn from_bgr(pixels: &'a [Bgr<u8>], width: usize, height: usize) -> Result<Self> {
        Self::packed(bytemuck::cast_slice(pixels), width, height, PixelFormat::ByteBgr)
    }
}
