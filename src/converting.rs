use std::marker::PhantomData;

use crate::convert::{convert_row, convert_row_in_place};
use crate::error::{PixelError, Result};
use crate::format::{PixelFormat, Sample};
use crate::iter::{PixelIterator, check_dest};
use crate::palette::Palette;

/// Presents a source iterator in another pixel format, converting one row at
/// a time as rows are pulled.
///
/// When both formats share a sample type and pixel size, the source writes
/// straight into the caller's buffer and the row is converted in place.
/// Otherwise the source row goes through an internal scratch row.
pub struct ConvertingIterator<I: PixelIterator, D: Sample> {
    source: I,
    format: PixelFormat,
    scratch: Vec<I::Sample>,
    in_place: bool,
    _dest: PhantomData<fn() -> D>,
}

impl<I: PixelIterator, D: Sample> ConvertingIterator<I, D> {
    pub fn new(source: I, format: PixelFormat) -> Result<Self> {
        format.check_sample::<D>()?;
        let from = source.format();
        if format == PixelFormat::ByteIndexed && from != format {
            return Err(PixelError::Unsupported {
                from: from.name(),
                to: format.name(),
            });
        }
        if from == PixelFormat::ByteIndexed && format != from && source.palette().is_none() {
            return Err(PixelError::MissingPalette);
        }
        let in_place = <I::Sample as Sample>::KIND == D::KIND
            && from.sample_count() == format.sample_count();
        let scratch = if in_place {
            Vec::new()
        } else {
            vec![I::Sample::default(); source.minimum_row_len()]
        };
        Ok(Self {
            source,
            format,
            scratch,
            in_place,
            _dest: PhantomData,
        })
    }

    pub fn source(&self) -> &I {
        &self.source
    }

    pub fn into_source(self) -> I {
        self.source
    }

    fn row_len(&self) -> usize {
        self.source.width() * self.format.sample_count()
    }
}

impl<I: PixelIterator, D: Sample> PixelIterator for ConvertingIterator<I, D> {
    type Sample = D;

    fn width(&self) -> usize {
        self.source.width()
    }

    fn height(&self) -> usize {
        self.source.height()
    }

    fn format(&self) -> PixelFormat {
        self.format
    }

    fn is_top_down(&self) -> bool {
        self.source.is_top_down()
    }

    fn is_done(&self) -> bool {
        self.source.is_done()
    }

    fn minimum_row_len(&self) -> usize {
        if self.in_place {
            self.row_len().max(self.source.minimum_row_len())
        } else {
            self.row_len()
        }
    }

    fn palette(&self) -> Option<&Palette> {
        match self.format {
            PixelFormat::ByteIndexed => self.source.palette(),
            _ => None,
        }
    }

    fn skip(&mut self) -> Result<()> {
        self.source.skip()
    }

    fn next_row(&mut self, dest: &mut [D]) -> Result<()> {
        check_dest(dest, self.minimum_row_len())?;
        let width = self.source.width();
        let from = self.source.format();
        if self.in_place {
            let row: &mut [I::Sample] = bytemuck::cast_slice_mut(dest);
            self.source.next_row(row)?;
            convert_row_in_place(from, self.format, row, width, self.source.palette())
        } else {
            self.source.next_row(&mut self.scratch)?;
            convert_row(
                from,
                &self.scratch,
                self.format,
                dest,
                width,
                self.source.palette(),
            )
        }
    }

    fn close(&mut self) {
        self.source.close();
    }
}

impl PixelFormat {
    /// Wrap `source` so its rows come out in this format.
    ///
    /// ```
    /// use scanrow::{ArrayPixelIterator, ConvertingIterator, PixelFormat, PixelIterator};
    ///
    /// let argb = [0xFF10_2030u32, 0xFF40_5060];
    /// let src = ArrayPixelIterator::packed(&argb, 2, 1, PixelFormat::IntArgb)?;
    /// let mut rgb: ConvertingIterator<_, u8> = PixelFormat::ByteRgb.iter_from(src)?;
    /// let mut row = [0u8; 6];
    /// rgb.next_row(&mut row)?;
    /// assert_eq!(row, [0x10, 0x20, 0x30, 0x40, 0x50, 0x60]);
    /// # Ok::<(), scanrow::PixelError>(())
    /// ```
    pub fn iter_from<I: PixelIterator, D: Sample>(
        self,
        source: I,
    ) -> Result<ConvertingIterator<I, D>> {
        ConvertingIterator::new(source, self)
    }
}

/// Whether two iterators hold the same pixels.
///
/// `b` is converted into `a`'s format and the rows are compared in iteration
/// order. Different sizes compare unequal without reading any rows. Both
/// iterators are closed before returning.
///
/// ```
/// use scanrow::{ArrayPixelIterator, PixelFormat, pixels_equal};
///
/// let argb = [0xFF10_2030u32];
/// let bgra = [0x30u8, 0x20, 0x10, 0xFF];
/// let a = ArrayPixelIterator::packed(&argb, 1, 1, PixelFormat::IntArgb)?;
/// let b = ArrayPixelIterator::packed(&bgra, 1, 1, PixelFormat::ByteBgra)?;
/// assert!(pixels_equal(a, b)?);
/// # Ok::<(), scanrow::PixelError>(())
/// ```
pub fn pixels_equal<A: PixelIterator, B: PixelIterator>(mut a: A, mut b: B) -> Result<bool> {
    if a.width() != b.width() || a.height() != b.height() {
        a.close();
        b.close();
        return Ok(false);
    }
    let mut b: ConvertingIterator<B, A::Sample> = match a.format().iter_from(b) {
        Ok(b) => b,
        Err(e) => {
            a.close();
            return Err(e);
        }
    };
    let equal = same_rows(&mut a, &mut b);
    a.close();
    b.close();
    equal
}

fn same_rows<A: PixelIterator, B: PixelIterator<Sample = A::Sample>>(
    a: &mut A,
    b: &mut B,
) -> Result<bool> {
    let len = a.width() * a.pixel_size();
    let mut row_a = vec![A::Sample::default(); a.minimum_row_len()];
    let mut row_b = vec![A::Sample::default(); b.minimum_row_len()];
    while !a.is_done() {
        a.next_row(&mut row_a)?;
        b.next_row(&mut row_b)?;
        if row_a[..len] != row_b[..len] {
            return Ok(false);
        }
    }
    Ok(true)
}
