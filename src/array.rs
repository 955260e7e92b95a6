use crate::error::{PixelError, Result};
use crate::format::{PixelFormat, Sample};
use crate::iter::{PixelIterator, RowCursor, check_dest};
use crate::palette::Palette;

/// Iterates over rows stored in a borrowed slice.
///
/// Row `y` starts at `offset + y * scan_size`. Rows are always returned top
/// down.
#[derive(Debug, Clone)]
pub struct ArrayPixelIterator<'a, S: Sample> {
    data: &'a [S],
    offset: usize,
    scan_size: usize,
    width: usize,
    format: PixelFormat,
    palette: Option<&'a Palette>,
    cursor: RowCursor,
}

impl<'a, S: Sample> ArrayPixelIterator<'a, S> {
    /// `scan_size` is the distance between row starts, in samples.
    pub fn new(
        data: &'a [S],
        offset: usize,
        scan_size: usize,
        width: usize,
        height: usize,
        format: PixelFormat,
    ) -> Result<Self> {
        format.check_sample::<S>()?;
        let row = width
            .checked_mul(format.sample_count())
            .ok_or_else(|| PixelError::InvalidLayout(format!("width {width} overflows a row")))?;
        if scan_size < row {
            return Err(PixelError::InvalidLayout(format!(
                "scan size ({scan_size}) must be at least width * pixel size ({row})"
            )));
        }
        let end = scan_size
            .checked_mul(height)
            .and_then(|n| n.checked_add(offset))
            .ok_or_else(|| PixelError::InvalidLayout(format!("{height} rows overflow")))?;
        if end > data.len() {
            return Err(PixelError::InvalidLayout(format!(
                "offset ({offset}) + scan size ({scan_size}) * height ({height}) = {end} \
                 exceeds the array length ({})",
                data.len()
            )));
        }
        Ok(Self {
            data,
            offset,
            scan_size,
            width,
            format,
            palette: None,
            cursor: RowCursor::new(height),
        })
    }

    /// Tightly packed rows starting at index 0.
    pub fn packed(data: &'a [S], width: usize, height: usize, format: PixelFormat) -> Result<Self> {
        let row = width
            .checked_mul(format.sample_count())
            .ok_or_else(|| PixelError::InvalidLayout(format!("width {width} overflows a row")))?;
        Self::new(data, 0, row, width, height, format)
    }

    /// Attach the color table for [`PixelFormat::ByteIndexed`] data.
    pub fn with_palette(mut self, palette: &'a Palette) -> Self {
        self.palette = Some(palette);
        self
    }

    fn row_len(&self) -> usize {
        self.width * self.format.sample_count()
    }
}

impl<S: Sample> PixelIterator for ArrayPixelIterator<'_, S> {
    type Sample = S;

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.cursor.height
    }

    fn format(&self) -> PixelFormat {
        self.format
    }

    fn is_top_down(&self) -> bool {
        true
    }

    fn is_done(&self) -> bool {
        self.cursor.is_done()
    }

    fn palette(&self) -> Option<&Palette> {
        self.palette
    }

    fn skip(&mut self) -> Result<()> {
        self.cursor.advance().map(drop)
    }

    fn next_row(&mut self, dest: &mut [S]) -> Result<()> {
        let len = self.row_len();
        check_dest(dest, len)?;
        let y = self.cursor.advance()?;
        let start = self.offset + y * self.scan_size;
        dest[..len].copy_from_slice(&self.data[start..start + len]);
        Ok(())
    }
}
