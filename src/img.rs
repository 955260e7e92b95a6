//! Stream [`imgref`] images through pixel iterators and collect iterators
//! back into [`ImgVec`]s.
//!
//! ```rust
//! use rgb::{Bgra, Rgba};
//! use imgref::ImgVec;
//! use scanrow::img::{ImgPixelIterator, collect_img};
//!
//! let rgba = ImgVec::new(vec![Rgba::new(255u8, 0, 128, 255); 100], 10, 10);
//! let bgra: ImgVec<Bgra<u8>> = collect_img(ImgPixelIterator::new(rgba.as_ref()))?;
//! assert_eq!(bgra.buf()[0], Bgra { b: 128, g: 0, r: 255, a: 255 });
//! # Ok::<(), scanrow::PixelError>(())
//! ```

use bytemuck::Pod;
use imgref::{ImgRef, ImgVec};
use rgb::{Bgr, Bgra, Rgb, Rgba};

use crate::converting::ConvertingIterator;
use crate::error::Result;
use crate::format::PixelFormat;
use crate::iter::{PixelIterator, RowCursor, check_dest};

mod sealed {
    pub trait Sealed {}
    impl Sealed for rgb::Rgba<u8> {}
    impl Sealed for rgb::Bgra<u8> {}
    impl Sealed for rgb::Rgb<u8> {}
    impl Sealed for rgb::Bgr<u8> {}
}

/// An `rgb` pixel type with a fixed interleaved byte layout.
pub trait ImgPixel: Pod + Default + sealed::Sealed {
    const FORMAT: PixelFormat;
}

impl ImgPixel for Rgba<u8> {
    const FORMAT: PixelFormat = PixelFormat::ByteRgba;
}

impl ImgPixel for Bgra<u8> {
    const FORMAT: PixelFormat = PixelFormat::ByteBgra;
}

impl ImgPixel for Rgb<u8> {
    const FORMAT: PixelFormat = PixelFormat::ByteRgb;
}

impl ImgPixel for Bgr<u8> {
    const FORMAT: PixelFormat = PixelFormat::ByteBgr;
}

/// Byte rows of a (possibly strided) [`ImgRef`], top down.
#[derive(Debug, Clone)]
pub struct ImgPixelIterator<'a, P: ImgPixel> {
    img: ImgRef<'a, P>,
    cursor: RowCursor,
}

impl<'a, P: ImgPixel> ImgPixelIterator<'a, P> {
    pub fn new(img: ImgRef<'a, P>) -> Self {
        Self {
            cursor: RowCursor::new(img.height()),
            img,
        }
    }
}

impl<P: ImgPixel> PixelIterator for ImgPixelIterator<'_, P> {
    type Sample = u8;

    fn width(&self) -> usize {
        self.img.width()
    }

    fn height(&self) -> usize {
        self.img.height()
    }

    fn format(&self) -> PixelFormat {
        P::FORMAT
    }

    fn is_top_down(&self) -> bool {
        true
    }

    fn is_done(&self) -> bool {
        self.cursor.is_done()
    }

    fn skip(&mut self) -> Result<()> {
        self.cursor.advance().map(drop)
    }

    fn next_row(&mut self, dest: &mut [u8]) -> Result<()> {
        let width = self.img.width();
        let len = width * P::FORMAT.sample_count();
        check_dest(dest, len)?;
        let y = self.cursor.advance()?;
        let start = y * self.img.stride();
        let row = &self.img.buf()[start..start + width];
        dest[..len].copy_from_slice(bytemuck::cast_slice(row));
        Ok(())
    }
}

/// Convert every row of `iter` to `P` and gather them into a tightly packed
/// image, placing rows by position for bottom-up sources.
pub fn collect_img<P: ImgPixel, I: PixelIterator>(iter: I) -> Result<ImgVec<P>> {
    let (w, h) = (iter.width(), iter.height());
    let top_down = iter.is_top_down();
    let mut rows: ConvertingIterator<I, u8> = P::FORMAT.iter_from(iter)?;
    let row_len = w * P::FORMAT.sample_count();
    let mut buf = vec![P::default(); w * h];
    let mut scratch = vec![0u8; rows.minimum_row_len()];
    for i in 0..h {
        rows.next_row(&mut scratch)?;
        let y = if top_down { i } else { h - 1 - i };
        let dst: &mut [u8] = bytemuck::cast_slice_mut(&mut buf[y * w..(y + 1) * w]);
        dst.copy_from_slice(&scratch[..row_len]);
    }
    Ok(ImgVec::new(buf, w, h))
}
