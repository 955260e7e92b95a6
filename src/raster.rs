//! Decoded in-memory images and the iterator over them.
//!
//! A [`Raster`] records the format its producer *declared*. Some producers
//! declare a byte layout but attach a color model that reads the bytes in a
//! different order; the iterator resolves the real layout once, by asking
//! the color model to interpret a synthetic pixel, and never re-checks it.

use std::fmt;
use std::sync::Arc;

use crate::error::{PixelError, Result};
use crate::format::{ByteLayout, Layout, PixelFormat, Sample, SampleKind};
use crate::iter::{PixelIterator, RowCursor, check_dest};
use crate::palette::Palette;

/// Interprets the bytes of one interleaved pixel.
pub trait ColorModel: fmt::Debug + Send + Sync {
    fn red(&self, pixel: &[u8]) -> u8;
    fn green(&self, pixel: &[u8]) -> u8;
    fn blue(&self, pixel: &[u8]) -> u8;
}

/// Color model reading each channel from a fixed byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterleavedModel {
    red: usize,
    green: usize,
    blue: usize,
}

impl InterleavedModel {
    pub const fn new(red: usize, green: usize, blue: usize) -> Self {
        Self { red, green, blue }
    }

    /// The model that reads `format` the way its name says.
    pub fn for_format(format: PixelFormat) -> Option<Self> {
        match format.layout() {
            Layout::Byte(ByteLayout::Interleaved { r, g, b, .. }) => Some(Self::new(r, g, b)),
            _ => None,
        }
    }
}

impl ColorModel for InterleavedModel {
    fn red(&self, pixel: &[u8]) -> u8 {
        pixel.get(self.red).copied().unwrap_or(0)
    }
    fn green(&self, pixel: &[u8]) -> u8 {
        pixel.get(self.green).copied().unwrap_or(0)
    }
    fn blue(&self, pixel: &[u8]) -> u8 {
        pixel.get(self.blue).copied().unwrap_or(0)
    }
}

/// Sample storage of a [`Raster`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RasterData {
    Int(Vec<u32>),
    Byte(Vec<u8>),
}

impl RasterData {
    pub fn kind(&self) -> SampleKind {
        match self {
            RasterData::Int(_) => SampleKind::Int,
            RasterData::Byte(_) => SampleKind::Byte,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RasterData::Int(v) => v.len(),
            RasterData::Byte(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn from_vec<S: Sample>(v: Vec<S>) -> Result<Self> {
        use bytemuck::allocation::try_cast_vec;
        let cast_failed = |(e, _): (bytemuck::PodCastError, Vec<S>)| {
            PixelError::InvalidLayout(format!("cannot store samples: {e:?}"))
        };
        Ok(match S::KIND {
            SampleKind::Int => RasterData::Int(try_cast_vec(v).map_err(cast_failed)?),
            SampleKind::Byte => RasterData::Byte(try_cast_vec(v).map_err(cast_failed)?),
        })
    }

    fn as_samples<S: Sample>(&self) -> Option<&[S]> {
        match self {
            RasterData::Int(v) if S::KIND == SampleKind::Int => bytemuck::try_cast_slice(v).ok(),
            RasterData::Byte(v) if S::KIND == SampleKind::Byte => bytemuck::try_cast_slice(v).ok(),
            _ => None,
        }
    }
}

/// A fully decoded image held in memory.
#[derive(Debug, Clone)]
pub struct Raster {
    data: RasterData,
    width: usize,
    height: usize,
    stride: usize,
    format: PixelFormat,
    model: Option<Arc<dyn ColorModel>>,
    palette: Option<Palette>,
}

impl Raster {
    /// `stride` is the distance between row starts, in samples.
    pub fn new(
        data: RasterData,
        width: usize,
        height: usize,
        stride: usize,
        format: PixelFormat,
    ) -> Result<Self> {
        if data.kind() != format.sample_kind() {
            return Err(PixelError::SampleKindMismatch {
                format: format.name(),
                expected: format.sample_kind(),
                actual: data.kind(),
            });
        }
        let row = width
            .checked_mul(format.sample_count())
            .ok_or_else(|| PixelError::InvalidLayout(format!("width {width} overflows a row")))?;
        if stride < row {
            return Err(PixelError::InvalidLayout(format!(
                "stride ({stride}) is shorter than a row ({row})"
            )));
        }
        let needed = match height {
            0 => 0,
            h => (h - 1)
                .checked_mul(stride)
                .and_then(|n| n.checked_add(row))
                .ok_or_else(|| {
                    PixelError::InvalidLayout(format!("{height} rows of stride {stride} overflow"))
                })?,
        };
        if data.len() < needed {
            return Err(PixelError::InvalidLayout(format!(
                "{height} rows of stride {stride} need {needed} samples, found {}",
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
            format,
            model: InterleavedModel::for_format(format)
                .map(|m| Arc::new(m) as Arc<dyn ColorModel>),
            palette: None,
        })
    }

    /// Replace the color model used to resolve the real byte order.
    pub fn with_color_model(mut self, model: Arc<dyn ColorModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = Some(palette);
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The format this raster was created with.
    pub fn declared_format(&self) -> PixelFormat {
        self.format
    }

    pub fn data(&self) -> &RasterData {
        &self.data
    }

    pub fn into_data(self) -> RasterData {
        self.data
    }

    pub fn palette(&self) -> Option<&Palette> {
        self.palette.as_ref()
    }

    /// The layout the color model actually reads.
    ///
    /// Only the declared `3BYTE_BGR`, `4BYTE_ABGR` and `4BYTE_ABGR_PRE`
    /// layouts are inspected; every other format is taken at its word.
    pub fn real_format(&self) -> PixelFormat {
        let Some(model) = self.model.as_deref() else {
            return self.format;
        };
        let rgb = |px: &[u8]| (model.red(px), model.green(px), model.blue(px));
        match self.format {
            PixelFormat::ByteBgr => match rgb(&[100, 50, 10]) {
                (100, 50, 10) => PixelFormat::ByteRgb,
                _ => PixelFormat::ByteBgr,
            },
            declared @ (PixelFormat::ByteAbgr | PixelFormat::ByteAbgrPre) => {
                let pre = declared == PixelFormat::ByteAbgrPre;
                match rgb(&[128, 100, 50, 10]) {
                    (100, 50, 10) if pre => PixelFormat::ByteArgbPre,
                    (100, 50, 10) => PixelFormat::ByteArgb,
                    (128, 100, 50) if pre => PixelFormat::ByteRgbaPre,
                    (128, 100, 50) => PixelFormat::ByteRgba,
                    _ => declared,
                }
            }
            other => other,
        }
    }

    /// Iterate from the top row down.
    pub fn rows<S: Sample>(&self) -> Result<RasterIterator<'_, S>> {
        RasterIterator::new(self, true)
    }

    /// Iterate from the bottom row up.
    pub fn rows_bottom_up<S: Sample>(&self) -> Result<RasterIterator<'_, S>> {
        RasterIterator::new(self, false)
    }

    /// Pull every remaining row of `iter` into a new tightly packed raster,
    /// placing each row at its image position whichever way the iterator
    /// runs.
    pub fn from_iter<I: PixelIterator + ?Sized>(iter: &mut I) -> Result<Self> {
        let (width, height, format) = (iter.width(), iter.height(), iter.format());
        let row = width * format.sample_count();
        let mut data = vec![I::Sample::default(); row * height];
        let mut scratch = vec![I::Sample::default(); iter.minimum_row_len()];
        for i in 0..height {
            if iter.is_done() {
                return Err(PixelError::EndOfData);
            }
            iter.next_row(&mut scratch)?;
            let y = if iter.is_top_down() { i } else { height - 1 - i };
            data[y * row..(y + 1) * row].copy_from_slice(&scratch[..row]);
        }
        let raster = Raster::new(RasterData::from_vec(data)?, width, height, row, format)?;
        Ok(match iter.palette() {
            Some(palette) => raster.with_palette(palette.clone()),
            None => raster,
        })
    }
}

/// Rows of a [`Raster`], in the raster's real format.
#[derive(Debug, Clone)]
pub struct RasterIterator<'a, S: Sample> {
    raster: &'a Raster,
    data: &'a [S],
    format: PixelFormat,
    top_down: bool,
    cursor: RowCursor,
}

impl<'a, S: Sample> RasterIterator<'a, S> {
    pub fn new(raster: &'a Raster, top_down: bool) -> Result<Self> {
        raster.format.check_sample::<S>()?;
        let data = raster
            .data
            .as_samples::<S>()
            .ok_or(PixelError::SampleKindMismatch {
                format: raster.format.name(),
                expected: raster.data.kind(),
                actual: S::KIND,
            })?;
        let format = raster.real_format();
        if format != raster.format {
            log::debug!(
                "raster declared as {} reads as {}",
                raster.format.name(),
                format.name()
            );
        }
        if format == PixelFormat::ByteIndexed && raster.palette.is_none() {
            return Err(PixelError::MissingPalette);
        }
        Ok(Self {
            raster,
            data,
            format,
            top_down,
            cursor: RowCursor::new(raster.height),
        })
    }
}

impl<S: Sample> PixelIterator for RasterIterator<'_, S> {
    type Sample = S;

    fn width(&self) -> usize {
        self.raster.width
    }

    fn height(&self) -> usize {
        self.raster.height
    }

    fn format(&self) -> PixelFormat {
        self.format
    }

    fn is_top_down(&self) -> bool {
        self.top_down
    }

    fn is_done(&self) -> bool {
        self.cursor.is_done()
    }

    fn palette(&self) -> Option<&Palette> {
        self.raster.palette.as_ref()
    }

    fn skip(&mut self) -> Result<()> {
        self.cursor.advance().map(drop)
    }

    fn next_row(&mut self, dest: &mut [S]) -> Result<()> {
        let len = self.raster.width * self.format.sample_count();
        check_dest(dest, len)?;
        let i = self.cursor.advance()?;
        let y = if self.top_down {
            i
        } else {
            self.raster.height - 1 - i
        };
        let start = y * self.raster.stride;
        dest[..len].copy_from_slice(&self.data[start..start + len]);
        Ok(())
    }
}
