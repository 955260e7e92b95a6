//! The row-at-a-time pull contract shared by every source and adapter.

use crate::error::{PixelError, Result};
use crate::format::{PixelFormat, Sample};
use crate::palette::Palette;

/// A finite sequence of equally sized pixel rows.
///
/// Rows are pulled one at a time into a caller-owned buffer, so a consumer
/// can stream an image of any height through a single row of memory. Width,
/// height and format never change once the iterator exists.
///
/// After `height()` calls to [`next_row`](Self::next_row) or
/// [`skip`](Self::skip) the iterator is done and both return
/// [`PixelError::EndOfData`].
pub trait PixelIterator {
    /// `u32` for packed formats, `u8` for interleaved ones.
    type Sample: Sample;

    fn width(&self) -> usize;

    fn height(&self) -> usize;

    /// Layout of the rows this iterator writes.
    fn format(&self) -> PixelFormat;

    /// Samples per pixel in the output rows.
    fn pixel_size(&self) -> usize {
        self.format().sample_count()
    }

    /// Whether the first row returned is the top of the image.
    fn is_top_down(&self) -> bool;

    fn is_done(&self) -> bool;

    /// Smallest buffer [`next_row`](Self::next_row) accepts.
    ///
    /// At least `width() * pixel_size()`; adapters that read a wider source
    /// row into the same buffer report more.
    fn minimum_row_len(&self) -> usize {
        self.width() * self.pixel_size()
    }

    /// Color table for [`PixelFormat::ByteIndexed`] rows.
    fn palette(&self) -> Option<&Palette> {
        None
    }

    /// Advance past one row without producing it.
    fn skip(&mut self) -> Result<()>;

    /// Write the next row into the front of `dest` and advance.
    fn next_row(&mut self, dest: &mut [Self::Sample]) -> Result<()>;

    /// Release any resources held by the iterator. Safe to call more than
    /// once.
    fn close(&mut self) {}
}

impl<I: PixelIterator + ?Sized> PixelIterator for Box<I> {
    type Sample = I::Sample;

    fn width(&self) -> usize {
        (**self).width()
    }
    fn height(&self) -> usize {
        (**self).height()
    }
    fn format(&self) -> PixelFormat {
        (**self).format()
    }
    fn pixel_size(&self) -> usize {
        (**self).pixel_size()
    }
    fn is_top_down(&self) -> bool {
        (**self).is_top_down()
    }
    fn is_done(&self) -> bool {
        (**self).is_done()
    }
    fn minimum_row_len(&self) -> usize {
        (**self).minimum_row_len()
    }
    fn palette(&self) -> Option<&Palette> {
        (**self).palette()
    }
    fn skip(&mut self) -> Result<()> {
        (**self).skip()
    }
    fn next_row(&mut self, dest: &mut [Self::Sample]) -> Result<()> {
        (**self).next_row(dest)
    }
    fn close(&mut self) {
        (**self).close()
    }
}

impl<I: PixelIterator + ?Sized> PixelIterator for &mut I {
    type Sample = I::Sample;

    fn width(&self) -> usize {
        (**self).width()
    }
    fn height(&self) -> usize {
        (**self).height()
    }
    fn format(&self) -> PixelFormat {
        (**self).format()
    }
    fn pixel_size(&self) -> usize {
        (**self).pixel_size()
    }
    fn is_top_down(&self) -> bool {
        (**self).is_top_down()
    }
    fn is_done(&self) -> bool {
        (**self).is_done()
    }
    fn minimum_row_len(&self) -> usize {
        (**self).minimum_row_len()
    }
    fn palette(&self) -> Option<&Palette> {
        (**self).palette()
    }
    fn skip(&mut self) -> Result<()> {
        (**self).skip()
    }
    fn next_row(&mut self, dest: &mut [Self::Sample]) -> Result<()> {
        (**self).next_row(dest)
    }
    fn close(&mut self) {
        (**self).close()
    }
}

/// Row cursor shared by the in-memory sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RowCursor {
    pub y: usize,
    pub height: usize,
}

impl RowCursor {
    pub fn new(height: usize) -> Self {
        Self { y: 0, height }
    }

    pub fn is_done(&self) -> bool {
        self.y >= self.height
    }

    /// Index of the row about to be produced, then advance.
    pub fn advance(&mut self) -> Result<usize> {
        if self.is_done() {
            return Err(PixelError::EndOfData);
        }
        let y = self.y;
        self.y += 1;
        Ok(y)
    }
}

/// Fail with [`PixelError::BufferTooSmall`] unless `dest` holds `required`
/// samples.
pub(crate) fn check_dest<S>(dest: &[S], required: usize) -> Result<()> {
    if dest.len() < required {
        Err(PixelError::BufferTooSmall {
            required,
            actual: dest.len(),
        })
    } else {
        Ok(())
    }
}

/// Pull every remaining row into one tightly packed buffer, in the order the
/// iterator yields them.
pub fn collect_rows<I: PixelIterator + ?Sized>(iter: &mut I) -> Result<Vec<I::Sample>> {
    let row = iter.width() * iter.pixel_size();
    let mut scratch = vec![I::Sample::default(); iter.minimum_row_len()];
    let mut out = Vec::with_capacity(row * iter.height());
    while !iter.is_done() {
        iter.next_row(&mut scratch)?;
        out.extend_from_slice(&scratch[..row]);
    }
    Ok(out)
}
